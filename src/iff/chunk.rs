// src/iff/chunk.rs

//! Reading and writing of IFF (Interchange File Format) chunk streams.
//!
//! - `IffReaderExt`: walks chunk headers on any `Read + Seek` source.
//! - `IffWriter`: emits chunks on any `Write + Seek` sink, patching sizes
//!   once a chunk is closed.

use crate::utils::error::{CodecError, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};

/// Represents the header of an IFF chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// The 4-character primary identifier (e.g., "FORM", "BITS").
    pub id: [u8; 4],
    /// The form type of composite chunks (e.g., "BAND" in "FORM:BAND").
    /// All spaces for simple chunks.
    pub secondary_id: [u8; 4],
    /// The size of the chunk's payload in bytes, excluding the form type.
    pub size: u32,
    /// Indicates if the chunk is a composite type like 'FORM' or 'LIST'.
    pub is_composite: bool,
}

impl Chunk {
    /// Returns the full chunk ID as a string, e.g., "FORM:BAND".
    #[inline]
    pub fn full_id(&self) -> String {
        let primary = String::from_utf8_lossy(&self.id);
        if self.is_composite {
            let secondary = String::from_utf8_lossy(&self.secondary_id);
            format!("{}:{}", primary, secondary.trim_end())
        } else {
            primary.trim_end().to_string()
        }
    }

    /// Bytes the payload occupies in the stream, including the pad byte.
    #[inline]
    pub fn padded_size(&self) -> u64 {
        self.size as u64 + (self.size % 2) as u64
    }

    pub fn is_form(&self, form_type: &[u8; 4]) -> bool {
        self.is_composite && &self.id == b"FORM" && &self.secondary_id == form_type
    }
}

/// An extension trait for reading IFF-structured data from a seekable stream.
pub trait IffReaderExt: Read + Seek {
    /// Reads the next chunk header from the stream.
    ///
    /// Returns `Ok(None)` at a clean end of stream. After a successful call
    /// the stream is positioned at the start of the chunk's payload.
    fn next_chunk(&mut self) -> Result<Option<Chunk>> {
        let mut id = [0u8; 4];
        match self.read_exact(&mut id) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(e.into()),
        }

        let size = self.read_u32::<BigEndian>().map_err(|e| truncated(e, &id))?;
        let is_composite = matches!(&id, b"FORM" | b"LIST" | b"PROP" | b"CAT ");

        let (secondary_id, size) = if is_composite {
            let mut sid = [0u8; 4];
            self.read_exact(&mut sid).map_err(|e| truncated(e, &id))?;
            let size = size.checked_sub(4).ok_or_else(|| {
                CodecError::format(format!(
                    "composite chunk of {} bytes cannot hold its form type",
                    size
                ))
            })?;
            (sid, size)
        } else {
            ([b' '; 4], size)
        };

        Ok(Some(Chunk {
            id,
            secondary_id,
            size,
            is_composite,
        }))
    }

    /// Reads the payload of `chunk` and steps over its pad byte.
    ///
    /// A payload shorter than declared is a format error.
    fn get_chunk_data(&mut self, chunk: &Chunk) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        Read::take(&mut *self, chunk.size as u64).read_to_end(&mut data)?;
        if data.len() != chunk.size as usize {
            return Err(CodecError::format(format!(
                "chunk {} declares {} bytes but only {} remain",
                chunk.full_id(),
                chunk.size,
                data.len()
            )));
        }

        if chunk.size % 2 != 0 {
            self.seek(SeekFrom::Current(1))?;
        }

        Ok(data)
    }

    /// Skips the payload of `chunk`, including its pad byte.
    fn skip_chunk(&mut self, chunk: &Chunk) -> Result<()> {
        self.seek(SeekFrom::Current(chunk.padded_size() as i64))?;
        Ok(())
    }
}

fn truncated(e: std::io::Error, id: &[u8; 4]) -> CodecError {
    if e.kind() == ErrorKind::UnexpectedEof {
        CodecError::format(format!(
            "chunk header '{}' is truncated",
            String::from_utf8_lossy(id)
        ))
    } else {
        e.into()
    }
}

// Blanket implementation for any type that is Read + Seek.
impl<T: Read + Seek> IffReaderExt for T {}

/// A writer for creating IFF-structured data on a byte stream.
/// The underlying writer must also implement `Seek` to allow for patching chunk sizes.
pub trait WriteSeek: Write + Seek {}
impl<T: Write + Seek> WriteSeek for T {}

pub struct IffWriter<'a> {
    writer: Box<dyn WriteSeek + 'a>,
    chunk_stack: Vec<u64>,
}

impl<'a> IffWriter<'a> {
    /// Creates a new `IffWriter` that wraps an existing writer.
    #[inline]
    pub fn new(writer: impl Write + Seek + 'a) -> Self {
        IffWriter {
            writer: Box::new(writer),
            chunk_stack: Vec::new(),
        }
    }

    /// Begins a new chunk with the given ID.
    ///
    /// For composite chunks, the ID should be in the format "FORM:BAND".
    /// The writer is now positioned to write the chunk's payload.
    pub fn put_chunk(&mut self, full_id: &str) -> Result<()> {
        let (id, secondary_id) = Self::parse_full_id(full_id)?;

        self.writer.write_all(&id)?;

        // Store the position of the size field to be patched later.
        let size_pos = self.writer.stream_position()?;
        self.chunk_stack.push(size_pos);

        self.writer.write_u32::<BigEndian>(0)?;

        if let Some(sid) = secondary_id {
            self.writer.write_all(&sid)?;
        }

        Ok(())
    }

    /// Finishes the most recently opened chunk.
    ///
    /// Patches the size field and pads the payload to an even length.
    pub fn close_chunk(&mut self) -> Result<()> {
        let size_pos = self
            .chunk_stack
            .pop()
            .ok_or_else(|| CodecError::format("cannot close chunk: no chunk is open"))?;

        let end_pos = self.writer.stream_position()?;
        let payload_size = end_pos - (size_pos + 4);
        let payload_size = u32::try_from(payload_size).map_err(|_| {
            CodecError::format(format!("chunk payload of {} bytes exceeds u32", payload_size))
        })?;

        if payload_size % 2 != 0 {
            self.writer.write_all(&[0])?;
        }

        let final_pos = self.writer.stream_position()?;

        self.writer.seek(SeekFrom::Start(size_pos))?;
        self.writer.write_u32::<BigEndian>(payload_size)?;
        self.writer.seek(SeekFrom::Start(final_pos))?;

        Ok(())
    }

    /// Returns the current nesting level (number of open chunks).
    pub fn nesting_level(&self) -> usize {
        self.chunk_stack.len()
    }

    fn id_bytes(id: &str) -> Result<[u8; 4]> {
        id.as_bytes()
            .try_into()
            .map_err(|_| CodecError::InvalidArgument(format!("chunk ID must be 4 bytes: '{}'", id)))
    }

    /// Helper to parse a user-friendly ID string into IFF bytes.
    fn parse_full_id(full_id: &str) -> Result<([u8; 4], Option<[u8; 4]>)> {
        let parts: Vec<_> = full_id.split(':').collect();
        match parts.as_slice() {
            [primary] => Ok((Self::id_bytes(primary)?, None)),
            [primary, secondary] => {
                if secondary.len() > 4 {
                    return Err(CodecError::InvalidArgument(format!(
                        "form type must be at most 4 bytes: '{}'",
                        full_id
                    )));
                }
                let mut sid_buf = [b' '; 4];
                sid_buf[..secondary.len()].copy_from_slice(secondary.as_bytes());
                Ok((Self::id_bytes(primary)?, Some(sid_buf)))
            }
            _ => Err(CodecError::InvalidArgument(format!(
                "invalid chunk ID format: '{}'",
                full_id
            ))),
        }
    }
}

/// An extension trait to provide helper methods for `IffWriter`.
pub trait IffWriterExt {
    /// Writes a complete simple chunk (header, data, and padding) to the stream.
    fn write_chunk(&mut self, id: &[u8; 4], data: &[u8]) -> Result<()>;
}

impl<'a> IffWriterExt for IffWriter<'a> {
    fn write_chunk(&mut self, id: &[u8; 4], data: &[u8]) -> Result<()> {
        let id_str = std::str::from_utf8(id)
            .map_err(|e| CodecError::InvalidArgument(format!("invalid UTF-8 in chunk ID: {}", e)))?;
        self.put_chunk(id_str)?;
        self.write_all(data)?;
        self.close_chunk()
    }
}

impl<'a> Write for IffWriter<'a> {
    #[inline]
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.writer.write(buf)
    }

    #[inline]
    fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

impl<'a> Seek for IffWriter<'a> {
    #[inline]
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.writer.seek(pos)
    }
}
