mod deserialize;
pub mod msg;
mod receiver;
mod sender;
mod serialize;
pub mod specs;

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};

pub use deserialize::Deserialize;
pub use receiver::OnoReceiver;
pub use sender::OnoSender;
pub use serialize::Serialize;

type LenType = u64;
const LEN_TYPE_SIZE: usize = size_of::<LenType>();

/// The largest frame body a receiver will accept, in bytes.
pub const MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// Creates both `OnoReceiver` and `OnoSender` network channel parts.
///
/// Given a writer and reader creates and returns both ends of the communication.
///
/// # Arguments
/// * `rx` - An async readable.
/// * `tx` - An async writable.
///
/// # Returns
/// A communication stream in the form of an ono receiver and sender.
pub fn channel<R, W>(rx: R, tx: W) -> (OnoReceiver<R>, OnoSender<W>)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    (OnoReceiver::new(rx), OnoSender::new(tx))
}

/// Encodes `msg` into a complete frame: length header followed by the body.
///
/// # Arguments
/// * `msg` - A serializable object.
///
/// # Returns
/// The frame bytes, ready to be handed to `OnoSender::send_frame`.
///
/// # Errors
/// Returns `io::Error` if the body could not be serialized or exceeds `MAX_FRAME_LEN`.
pub fn encode<T: Serialize>(msg: &T) -> io::Result<Vec<u8>> {
    let mut buf = vec![0; LEN_TYPE_SIZE];
    msg.serialize(&mut buf)?;

    let len = buf.len() - LEN_TYPE_SIZE;
    if len > MAX_FRAME_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("frame of {len} bytes exceeds the {MAX_FRAME_LEN} bytes limit"),
        ));
    }

    let header = (len as LenType).to_be_bytes();
    buf[..LEN_TYPE_SIZE].copy_from_slice(&header);
    Ok(buf)
}
