//! Byte-stream primitives of the tensor wire format.
//!
//! All multi-byte values are big-endian. Counts, tags and string lengths use
//! the compact integer encoding: values below `0x80` take one byte, larger
//! values take four bytes with the top bit of the first byte set.
//!
//! ```
//! use tenval_sparse::stream::{ByteReader, ByteWriter};
//!
//! let mut w = ByteWriter::new();
//! w.put_compact(5).unwrap();
//! w.put_compact(300).unwrap();
//! w.put_small_string("ab").unwrap();
//! let bytes = w.into_bytes();
//! assert_eq!(bytes, vec![5, 0x80, 0, 1, 44, 2, b'a', b'b']);
//!
//! let mut r = ByteReader::new(&bytes);
//! assert_eq!(r.get_compact().unwrap(), 5);
//! assert_eq!(r.get_compact().unwrap(), 300);
//! assert_eq!(r.get_small_string().unwrap(), "ab");
//! assert!(r.finish().is_ok());
//! ```

use crate::error::{CodecError, CodecResult};

/// Largest value a compact integer can hold.
pub const MAX_COMPACT: usize = 0x7fff_ffff;

/// Growable output buffer
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_compact(&mut self, value: usize) -> CodecResult<()> {
        if value < 0x80 {
            self.buf.push(value as u8);
            Ok(())
        } else if value <= MAX_COMPACT {
            self.buf
                .extend_from_slice(&((value as u32) | 0x8000_0000).to_be_bytes());
            Ok(())
        } else {
            Err(CodecError::CompactOverflow(value))
        }
    }

    pub fn put_small_string(&mut self, value: &str) -> CodecResult<()> {
        self.put_compact(value.len())?;
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an input buffer
#[derive(Debug)]
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, needed: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < needed {
            return Err(CodecError::Truncated {
                needed,
                remaining: self.remaining(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + needed];
        self.pos += needed;
        Ok(bytes)
    }

    fn take_array<const N: usize>(&mut self) -> CodecResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub fn get_compact(&mut self) -> CodecResult<usize> {
        let first = self.take(1)?[0];
        if first & 0x80 == 0 {
            return Ok(first as usize);
        }
        let rest = self.take(3)?;
        let value = u32::from_be_bytes([first & 0x7f, rest[0], rest[1], rest[2]]);
        Ok(value as usize)
    }

    pub fn get_small_string(&mut self) -> CodecResult<String> {
        let len = self.get_compact()?;
        let bytes = self.take(len)?;
        std::str::from_utf8(bytes)
            .map(str::to_string)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    pub fn get_f64(&mut self) -> CodecResult<f64> {
        Ok(f64::from_be_bytes(self.take_array()?))
    }

    pub fn get_f32(&mut self) -> CodecResult<f32> {
        Ok(f32::from_be_bytes(self.take_array()?))
    }

    /// Fail unless the whole buffer was consumed.
    pub fn finish(self) -> CodecResult<()> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compact_boundaries() {
        for (value, expected) in [
            (0usize, vec![0x00]),
            (0x7f, vec![0x7f]),
            (0x80, vec![0x80, 0x00, 0x00, 0x80]),
            (MAX_COMPACT, vec![0xff, 0xff, 0xff, 0xff]),
        ] {
            let mut w = ByteWriter::new();
            w.put_compact(value).unwrap();
            let bytes = w.into_bytes();
            assert_eq!(bytes, expected);
            assert_eq!(ByteReader::new(&bytes).get_compact().unwrap(), value);
        }
    }

    #[test]
    fn test_compact_overflow() {
        let mut w = ByteWriter::new();
        assert_eq!(
            w.put_compact(MAX_COMPACT + 1),
            Err(CodecError::CompactOverflow(MAX_COMPACT + 1))
        );
        assert!(w.is_empty());
    }

    #[test]
    fn test_truncated_reads() {
        assert_eq!(
            ByteReader::new(&[0x80, 0x00]).get_compact(),
            Err(CodecError::Truncated {
                needed: 3,
                remaining: 1
            })
        );
        assert!(ByteReader::new(&[0x40, 0x00]).get_f64().is_err());
        assert!(ByteReader::new(&[3, b'a']).get_small_string().is_err());
    }

    #[test]
    fn test_invalid_utf8() {
        assert_eq!(
            ByteReader::new(&[2, 0xc3, 0x28]).get_small_string(),
            Err(CodecError::InvalidUtf8)
        );
    }

    #[test]
    fn test_numbers_are_big_endian() {
        let mut w = ByteWriter::new();
        w.put_f64(1.0);
        w.put_f32(1.0);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..8], &[0x3f, 0xf0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(&bytes[8..], &[0x3f, 0x80, 0, 0]);

        let mut r = ByteReader::new(&bytes);
        assert_eq!(r.get_f64().unwrap(), 1.0);
        assert_eq!(r.get_f32().unwrap(), 1.0);
        assert!(r.finish().is_ok());
        assert_eq!(
            ByteReader::new(&[1]).finish(),
            Err(CodecError::TrailingBytes(1))
        );
    }
}
