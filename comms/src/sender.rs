//! The implementation of the sending end of the application layer protocol.

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::Serialize;

/// The sending end handle of the communication.
pub struct OnoSender<W>
where
    W: AsyncWrite + Unpin,
{
    tx: W,
}

impl<W: AsyncWrite + Unpin> OnoSender<W> {
    /// Creates a new `OnoSender` instance.
    ///
    /// # Arguments
    /// * `tx` - The underlying writer.
    pub(super) fn new(tx: W) -> Self {
        Self { tx }
    }

    /// Writes an already encoded frame (see `comms::encode`) and flushes.
    ///
    /// # Arguments
    /// * `frame` - The frame bytes, header included.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.tx.write_all(frame).await?;
        self.tx.flush().await
    }

    /// Encodes and sends `msg` through the inner sender.
    ///
    /// # Arguments
    /// * `msg` - A serializable object.
    ///
    /// # Returns
    /// A result object that returns `io::Error` on failure.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> io::Result<()> {
        let frame = crate::encode(msg)?;
        self.send_frame(&frame).await
    }
}
