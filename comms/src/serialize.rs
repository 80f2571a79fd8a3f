use std::io;

pub trait Serialize {
    /// Appends the wire representation of `self` to `buf`.
    fn serialize(&self, buf: &mut Vec<u8>) -> io::Result<()>;
}
