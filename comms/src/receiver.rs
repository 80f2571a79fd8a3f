use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::{Deserialize, LEN_TYPE_SIZE, LenType, MAX_FRAME_LEN};

/// The receiving end handle of the communication.
pub struct OnoReceiver<R: AsyncRead + Unpin> {
    rx: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> OnoReceiver<R> {
    /// Creates a new `OnoReceiver` instance.
    ///
    /// # Arguments
    /// * `rx` - The underlying reader.
    pub(super) fn new(rx: R) -> Self {
        Self {
            rx,
            buf: Vec::new(),
        }
    }

    /// Waits to receive a new message from the inner receiver.
    ///
    /// The whole frame is always consumed before the body is parsed, so a body
    /// that fails to deserialize leaves the stream positioned at the next frame.
    ///
    /// # Returns
    /// A result object that returns `T` on success or `io::Error` on failure:
    /// * `UnexpectedEof` if the stream ended.
    /// * `InvalidInput` if the header announces a frame above `MAX_FRAME_LEN`.
    /// * `InvalidData` if the body could not be parsed.
    pub async fn recv<T: Deserialize>(&mut self) -> io::Result<T> {
        let mut size_buf = [0; LEN_TYPE_SIZE];
        self.rx.read_exact(&mut size_buf).await?;
        let len = LenType::from_be_bytes(size_buf);

        if len > MAX_FRAME_LEN as LenType {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
            ));
        }

        self.buf.resize(len as usize, 0);
        self.rx.read_exact(&mut self.buf).await?;

        T::deserialize(&self.buf)
    }
}
