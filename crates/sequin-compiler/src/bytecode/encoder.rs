//! Binary stream writer and reader
//!
//! All multi-byte quantities in the wire format are big-endian.

use thiserror::Error;

/// Errors produced while decoding a binary stream.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// The stream ended before a field was complete
    #[error("unexpected end of stream: needed {needed} byte(s), {available} available")]
    UnexpectedEof {
        /// Bytes the field required
        needed: usize,
        /// Bytes remaining in the stream
        available: usize,
    },

    /// A field held a value the format does not allow
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Append-only big-endian byte stream writer.
#[derive(Debug, Default)]
pub struct BytecodeWriter {
    buffer: Vec<u8>,
}

impl BytecodeWriter {
    /// Create an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a single byte.
    pub fn emit_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    /// Append a big-endian u16.
    pub fn emit_u16(&mut self, value: u16) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Append a big-endian u32.
    pub fn emit_u32(&mut self, value: u32) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Append a big-endian u64.
    pub fn emit_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    /// Append raw bytes unmodified.
    pub fn emit_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Current length of the stream.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Borrow the bytes written so far.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consume the writer and return the stream.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// Cursor-based reader over an encoded stream.
#[derive(Debug)]
pub struct BytecodeReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> BytecodeReader<'a> {
    /// Create a reader over `data`, positioned at the start.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        if self.pos + n > self.data.len() {
            return Err(DecodeError::UnexpectedEof {
                needed: n,
                available: self.data.len() - self.pos,
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    /// Read a signed byte.
    pub fn read_i8(&mut self) -> Result<i8, DecodeError> {
        Ok(self.read_u8()? as i8)
    }

    /// Read a big-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
        Ok(u16::from_be_bytes(self.take(2)?.try_into().unwrap()))
    }

    /// Read a big-endian i16.
    pub fn read_i16(&mut self) -> Result<i16, DecodeError> {
        Ok(self.read_u16()? as i16)
    }

    /// Read a big-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Read a big-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, DecodeError> {
        Ok(self.read_u32()? as i32)
    }

    /// Read a big-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Read a big-endian i64.
    pub fn read_i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.read_u64()? as i64)
    }

    /// Read a big-endian IEEE-754 f32.
    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        Ok(f32::from_be_bytes(self.take(4)?.try_into().unwrap()))
    }

    /// Read a big-endian IEEE-754 f64.
    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        Ok(f64::from_be_bytes(self.take(8)?.try_into().unwrap()))
    }

    /// Read exactly `n` raw bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        self.take(n)
    }

    /// Read every remaining byte.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// True when the cursor has reached the end.
    pub fn is_at_end(&self) -> bool {
        self.pos == self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_read_big_endian() {
        let mut w = BytecodeWriter::new();
        w.emit_u8(0xAB);
        w.emit_u16(0x1234);
        w.emit_u32(0xDEADBEEF);
        assert_eq!(w.as_bytes(), &[0xAB, 0x12, 0x34, 0xDE, 0xAD, 0xBE, 0xEF]);

        let bytes = w.into_bytes();
        let mut r = BytecodeReader::new(&bytes);
        assert_eq!(r.read_u8().unwrap(), 0xAB);
        assert_eq!(r.read_u16().unwrap(), 0x1234);
        assert_eq!(r.read_u32().unwrap(), 0xDEADBEEF);
        assert!(r.is_at_end());
    }

    #[test]
    fn test_read_past_end() {
        let mut r = BytecodeReader::new(&[0x01]);
        assert_eq!(r.read_u8().unwrap(), 1);
        let err = r.read_u32().unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnexpectedEof {
                needed: 4,
                available: 0
            }
        );
    }
}
