//! Owned byte buffer used to build commands and pick apart feature reports.
//!
//! All mutators modify the receiver in place.

use std::fmt;

#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteBuffer {
    data: Vec<u8>,
}

impl ByteBuffer {
    pub fn of(bytes: impl Into<Vec<u8>>) -> Self {
        Self { data: bytes.into() }
    }

    /// Zero filled buffer of `len` bytes
    pub fn empty(len: usize) -> Self {
        Self { data: vec![0u8; len] }
    }

    #[inline(always)]
    pub fn get(&self, i: usize) -> u8 {
        self.data[i]
    }

    #[inline(always)]
    pub fn set(&mut self, i: usize, byte: u8) {
        self.data[i] = byte;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Drop the first `n` bytes. Dropping more than the length leaves it empty.
    pub fn slice_front(&mut self, n: usize) {
        self.data.drain(..n.min(self.data.len()));
    }

    /// Keep only `[start, end)`
    pub fn section(&mut self, start: usize, end: usize) {
        self.data.truncate(end);
        self.data.drain(..start);
    }

    /// Position of the first occurrence of `byte`
    pub fn index_of(&self, byte: u8) -> Option<usize> {
        self.data.iter().position(|&b| b == byte)
    }

    /// Cut the buffer at the first NUL, if any
    pub fn trim_nul(&mut self) {
        if let Some(end) = self.index_of(0) {
            self.section(0, end);
        }
    }

    pub fn to_utf8(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn to_owned_bytes(&self) -> Vec<u8> {
        self.data.clone()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for ByteBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl AsRef<[u8]> for ByteBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl fmt::Debug for ByteBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02X?}", self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_and_section() {
        let mut buf = ByteBuffer::of(vec![1, 2, 3, 4, 5, 6]);
        buf.slice_front(2);
        assert_eq!(buf.as_slice(), &[3, 4, 5, 6]);
        assert_eq!(buf.get(0), 3);

        buf.section(1, 3);
        assert_eq!(buf.as_slice(), &[4, 5]);
        assert_eq!(buf.len(), 2);

        buf.slice_front(10);
        assert!(buf.is_empty());
    }

    #[test]
    fn search_and_trim() {
        let mut buf = ByteBuffer::of(*b"1.0.17\0\0junk");
        assert_eq!(buf.index_of(0), Some(6));
        assert_eq!(buf.index_of(b'x'), None);
        buf.trim_nul();
        assert_eq!(buf.to_utf8(), "1.0.17");

        // no terminator leaves the buffer untouched
        let mut buf = ByteBuffer::of(*b"abc");
        buf.trim_nul();
        assert_eq!(buf.to_utf8(), "abc");
    }

    #[test]
    fn set_and_copy() {
        let mut buf = ByteBuffer::empty(4);
        buf.set(1, 0xAA);
        let copy = buf.to_owned_bytes();
        buf.set(1, 0xBB);
        assert_eq!(copy, vec![0, 0xAA, 0, 0]);
        assert_eq!(buf.into_inner(), vec![0, 0xBB, 0, 0]);
    }
}
