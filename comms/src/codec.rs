use std::io;

/// Encodes a value into a frame body.
pub trait Serialize<'a> {
    /// Writes the owned part of the frame into `buf`.
    ///
    /// # Returns
    /// The trailing bytes that can be written straight from `self`, if any.
    fn serialize(&'a self, buf: &mut Vec<u8>) -> io::Result<Option<&'a [u8]>>;
}

/// Decodes a value borrowing from a received frame body.
pub trait Deserialize<'a>: Sized {
    fn deserialize(buf: &'a [u8]) -> io::Result<Self>;
}
