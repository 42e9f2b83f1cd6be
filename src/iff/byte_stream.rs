// src/iff/byte_stream.rs

//! Big-endian primitives for chunk payloads.

use crate::utils::error::{CodecError, Result};
use bytemuck::{cast_slice, Pod, Zeroable};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Write};

fn eof_as_format(e: std::io::Error) -> CodecError {
    if e.kind() == ErrorKind::UnexpectedEof {
        CodecError::format("chunk payload ends early")
    } else {
        e.into()
    }
}

/// Reading of big-endian values from a chunk payload.
///
/// Running out of payload is a [`CodecError::Format`] error, not an I/O error.
pub trait ByteReader: Read {
    fn read_u8(&mut self) -> Result<u8> {
        ReadBytesExt::read_u8(self).map_err(eof_as_format)
    }

    fn read_u32(&mut self) -> Result<u32> {
        ReadBytesExt::read_u32::<BigEndian>(self).map_err(eof_as_format)
    }

    fn read_i32(&mut self) -> Result<i32> {
        ReadBytesExt::read_i32::<BigEndian>(self).map_err(eof_as_format)
    }

    fn read_u64(&mut self) -> Result<u64> {
        ReadBytesExt::read_u64::<BigEndian>(self).map_err(eof_as_format)
    }

    fn read_f32(&mut self) -> Result<f32> {
        ReadBytesExt::read_f32::<BigEndian>(self).map_err(eof_as_format)
    }

    fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buffer = vec![0u8; count];
        self.read_exact(&mut buffer).map_err(eof_as_format)?;
        Ok(buffer)
    }

    /// Read a slice of u32 values in big-endian format using bytemuck
    fn read_u32_slice(&mut self, count: usize) -> Result<Vec<u32>> {
        let buffer = self.read_bytes(count * 4)?;
        let be_values: &[BeU32] = cast_slice(&buffer);
        Ok(be_values.iter().map(|&v| v.into()).collect())
    }

    /// Read a slice of f32 values stored as their big-endian bit patterns
    fn read_f32_slice(&mut self, count: usize) -> Result<Vec<f32>> {
        Ok(self
            .read_u32_slice(count)?
            .into_iter()
            .map(f32::from_bits)
            .collect())
    }
}

impl<T: Read + ?Sized> ByteReader for T {}

/// Writing of big-endian values into a chunk payload.
pub trait ByteWriter: Write {
    fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(WriteBytesExt::write_u8(self, value)?)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        Ok(WriteBytesExt::write_u32::<BigEndian>(self, value)?)
    }

    fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(WriteBytesExt::write_i32::<BigEndian>(self, value)?)
    }

    fn write_u64(&mut self, value: u64) -> Result<()> {
        Ok(WriteBytesExt::write_u64::<BigEndian>(self, value)?)
    }

    fn write_f32(&mut self, value: f32) -> Result<()> {
        Ok(WriteBytesExt::write_f32::<BigEndian>(self, value)?)
    }

    /// Write a slice of u32 values in big-endian format using bytemuck
    fn write_u32_slice(&mut self, values: &[u32]) -> Result<()> {
        let be_values: Vec<BeU32> = values.iter().map(|&v| v.into()).collect();
        let bytes: &[u8] = cast_slice(&be_values);
        self.write_all(bytes)?;
        Ok(())
    }

    /// Write a slice of f32 values as their big-endian bit patterns
    fn write_f32_slice(&mut self, values: &[f32]) -> Result<()> {
        let bits: Vec<u32> = values.iter().map(|v| v.to_bits()).collect();
        self.write_u32_slice(&bits)
    }
}

impl<T: Write + ?Sized> ByteWriter for T {}

/// Converts a count or dimension to the u32 used on the wire.
pub fn to_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| CodecError::format(format!("{} {} exceeds u32", what, value)))
}

/// Big-endian u32 that can be safely cast to/from bytes
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BeU32([u8; 4]);

impl From<u32> for BeU32 {
    fn from(value: u32) -> Self {
        BeU32(value.to_be_bytes())
    }
}

impl From<BeU32> for u32 {
    fn from(value: BeU32) -> Self {
        u32::from_be_bytes(value.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_big_endian_layout() {
        let mut out = Vec::new();
        ByteWriter::write_u32(&mut out, 0x0102_0304).unwrap();
        ByteWriter::write_i32(&mut out, -2).unwrap();
        out.write_u32_slice(&[5, 6]).unwrap();
        assert_eq!(
            out,
            [1, 2, 3, 4, 0xFF, 0xFF, 0xFF, 0xFE, 0, 0, 0, 5, 0, 0, 0, 6]
        );
    }

    #[test]
    fn test_read_back() {
        let mut out = Vec::new();
        ByteWriter::write_u64(&mut out, u64::MAX - 1).unwrap();
        out.write_f32_slice(&[1.5, -0.25]).unwrap();
        ByteWriter::write_u8(&mut out, 7).unwrap();

        let mut cursor = Cursor::new(out);
        assert_eq!(ByteReader::read_u64(&mut cursor).unwrap(), u64::MAX - 1);
        assert_eq!(cursor.read_f32_slice(2).unwrap(), vec![1.5, -0.25]);
        assert_eq!(ByteReader::read_u8(&mut cursor).unwrap(), 7);
        assert!(matches!(
            ByteReader::read_u32(&mut cursor),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn test_to_u32() {
        assert_eq!(to_u32(7, "rows").unwrap(), 7);
        assert!(to_u32(u32::MAX as usize + 1, "rows").is_err());
    }
}
