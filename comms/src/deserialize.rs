use std::io;

pub trait Deserialize: Sized {
    /// Parses a frame body. Malformed bodies must fail with `io::ErrorKind::InvalidData`.
    fn deserialize(buf: &[u8]) -> io::Result<Self>;
}
