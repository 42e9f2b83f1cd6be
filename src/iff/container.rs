// src/iff/container.rs

//! Multi-band container.
//!
//! ```text
//! FORM:DWTC
//!   FORM:BAND            one per channel, in band order
//!     BHDR  u8 version, u8 levels, u32 rows, u32 cols
//!     QSTP  u32 n, n x f32 step (layout order)
//!     LAYT  u32 n, n x (u8 level, u8 kind, u32 rows, u32 cols, u32 count)
//!     HUFF  u32 n, n x (i32 symbol, u8 len, u64 bits)
//!     BITS  u64 bit_len, ceil(bit_len / 8) payload bytes
//! ```
//!
//! All integers are big-endian. Unknown chunks are skipped on read.

use std::io::{Cursor, Read, Seek, Write};

use bitvec::prelude::*;
use log::debug;

use super::byte_stream::{to_u32, ByteReader, ByteWriter};
use super::chunk::{Chunk, IffReaderExt, IffWriter, IffWriterExt};
use crate::encode::dwt::{SubbandId, SubbandKind};
use crate::encode::huffman::{Bitstream, Codeword, HuffmanTable};
use crate::encode::quant::StepTable;
use crate::image::Matrix;
use crate::pipeline::{self, CompressionStats, EncodedChannel, LayoutEntry, SubbandLayout};
use crate::utils::error::{CodecError, Result};

/// Version written to and accepted from `BHDR`.
pub const FORMAT_VERSION: u8 = 1;

const LAYOUT_RECORD: usize = 14;
const HUFF_RECORD: usize = 13;

/// A set of encoded channels and their serialized form.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EncodedImage {
    pub channels: Vec<EncodedChannel>,
}

impl EncodedImage {
    pub fn new(channels: Vec<EncodedChannel>) -> Self {
        EncodedImage { channels }
    }

    /// Summed statistics of all channels.
    pub fn stats(&self) -> CompressionStats {
        let mut total = CompressionStats::default();
        for channel in &self.channels {
            total.accumulate(&channel.stats());
        }
        total
    }

    /// Decodes every channel; see [`pipeline::decode_bands`].
    pub fn decode(&self) -> Result<Vec<Result<Matrix>>> {
        pipeline::decode_bands(&self.channels)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.write_to(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(bytes))
    }

    /// Writes the container at the writer's current position.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<()> {
        let mut iff = IffWriter::new(writer);
        iff.put_chunk("FORM:DWTC")?;
        for channel in &self.channels {
            write_band(&mut iff, channel)?;
        }
        iff.close_chunk()?;
        iff.flush()?;
        debug!("wrote container with {} bands", self.channels.len());
        Ok(())
    }

    /// Reads a container starting at the reader's current position.
    pub fn read_from<R: Read + Seek>(reader: &mut R) -> Result<Self> {
        let form = reader
            .next_chunk()?
            .ok_or_else(|| CodecError::format("stream is empty"))?;
        if !form.is_form(b"DWTC") {
            return Err(CodecError::format(format!(
                "expected FORM:DWTC, found {}",
                form.full_id()
            )));
        }
        let mut body = Cursor::new(reader.get_chunk_data(&form)?);

        let mut channels = Vec::new();
        while let Some(chunk) = body.next_chunk()? {
            if chunk.is_form(b"BAND") {
                let payload = body.get_chunk_data(&chunk)?;
                let channel = read_band(&payload).map_err(|e| match e {
                    CodecError::Format(msg) => {
                        CodecError::format(format!("band {}: {}", channels.len(), msg))
                    }
                    other => other,
                })?;
                channels.push(channel);
            } else {
                debug!("skipping chunk {} in container", chunk.full_id());
                body.skip_chunk(&chunk)?;
            }
        }
        debug!("read container with {} bands", channels.len());
        Ok(EncodedImage { channels })
    }
}

fn write_band(iff: &mut IffWriter<'_>, channel: &EncodedChannel) -> Result<()> {
    let layout = channel.layout.entries();
    let levels = u8::try_from(channel.levels())
        .map_err(|_| CodecError::format(format!("{} levels exceed u8", channel.levels())))?;

    iff.put_chunk("FORM:BAND")?;

    let mut bhdr = Vec::with_capacity(10);
    bhdr.write_u8(FORMAT_VERSION)?;
    bhdr.write_u8(levels)?;
    bhdr.write_u32(to_u32(channel.original_dims.0, "rows")?)?;
    bhdr.write_u32(to_u32(channel.original_dims.1, "cols")?)?;
    iff.write_chunk(b"BHDR", &bhdr)?;

    let steps = channel.steps.steps_for(&channel.layout.ids())?;
    let mut qstp = Vec::with_capacity(4 + 4 * steps.len());
    qstp.write_u32(to_u32(steps.len(), "step count")?)?;
    qstp.write_f32_slice(&steps)?;
    iff.write_chunk(b"QSTP", &qstp)?;

    let mut layt = Vec::with_capacity(4 + LAYOUT_RECORD * layout.len());
    layt.write_u32(to_u32(layout.len(), "layout length")?)?;
    for entry in layout {
        layt.write_u8(entry.id.level)?;
        layt.write_u8(entry.id.kind.to_u8())?;
        layt.write_u32(to_u32(entry.rows, "rows")?)?;
        layt.write_u32(to_u32(entry.cols, "cols")?)?;
        layt.write_u32(to_u32(entry.count, "count")?)?;
    }
    iff.write_chunk(b"LAYT", &layt)?;

    let codes = channel.table.entries();
    let mut huff = Vec::with_capacity(4 + HUFF_RECORD * codes.len());
    huff.write_u32(to_u32(codes.len(), "code table size")?)?;
    for (symbol, code) in codes {
        huff.write_i32(symbol)?;
        huff.write_u8(code.len())?;
        huff.write_u64(code.bits())?;
    }
    iff.write_chunk(b"HUFF", &huff)?;

    let bit_len = channel.bitstream.len();
    let mut packed = channel.bitstream.clone();
    packed.set_uninitialized(false);
    let bytes = packed.into_vec();
    if bytes.len() != bit_len.div_ceil(8) {
        return Err(CodecError::format(format!(
            "{} payload bits packed into {} bytes",
            bit_len,
            bytes.len()
        )));
    }
    let mut bits = Vec::with_capacity(8 + bytes.len());
    bits.write_u64(bit_len as u64)?;
    bits.extend_from_slice(&bytes);
    iff.write_chunk(b"BITS", &bits)?;

    iff.close_chunk()
}

/// Checks that `n` records of `size` bytes fit in what is left of a payload.
fn check_records(cursor: &Cursor<&[u8]>, n: u32, size: usize, what: &str) -> Result<usize> {
    let remaining = cursor.get_ref().len() as u64 - cursor.position();
    let needed = n as u64 * size as u64;
    if needed > remaining {
        return Err(CodecError::format(format!(
            "{} declares {} entries but holds only {} bytes",
            what, n, remaining
        )));
    }
    Ok(n as usize)
}

fn set_once<T>(slot: &mut Option<T>, value: T, chunk: &Chunk) -> Result<()> {
    if slot.replace(value).is_some() {
        return Err(CodecError::format(format!(
            "chunk {} appears twice",
            chunk.full_id()
        )));
    }
    Ok(())
}

fn read_band(payload: &[u8]) -> Result<EncodedChannel> {
    let mut header = None;
    let mut steps = None;
    let mut layout = None;
    let mut table = None;
    let mut bitstream = None;

    let mut cursor = Cursor::new(payload);
    while let Some(chunk) = cursor.next_chunk()? {
        if chunk.is_composite {
            cursor.skip_chunk(&chunk)?;
            continue;
        }
        match &chunk.id {
            b"BHDR" => {
                let data = cursor.get_chunk_data(&chunk)?;
                set_once(&mut header, read_header(&data)?, &chunk)?;
            }
            b"QSTP" => {
                let data = cursor.get_chunk_data(&chunk)?;
                set_once(&mut steps, read_steps(&data)?, &chunk)?;
            }
            b"LAYT" => {
                let data = cursor.get_chunk_data(&chunk)?;
                set_once(&mut layout, read_layout(&data)?, &chunk)?;
            }
            b"HUFF" => {
                let data = cursor.get_chunk_data(&chunk)?;
                set_once(&mut table, read_table(&data)?, &chunk)?;
            }
            b"BITS" => {
                let data = cursor.get_chunk_data(&chunk)?;
                set_once(&mut bitstream, read_bits(&data)?, &chunk)?;
            }
            _ => {
                debug!("skipping chunk {} in band", chunk.full_id());
                cursor.skip_chunk(&chunk)?;
            }
        }
    }

    let missing = |id: &str| CodecError::format(format!("band has no {} chunk", id));
    let (levels, original_dims) = header.ok_or_else(|| missing("BHDR"))?;
    let steps = steps.ok_or_else(|| missing("QSTP"))?;
    let layout = layout.ok_or_else(|| missing("LAYT"))?;
    let table = table.ok_or_else(|| missing("HUFF"))?;
    let bitstream = bitstream.ok_or_else(|| missing("BITS"))?;

    if layout.levels() != levels as usize || layout.entries().len() != 3 * levels as usize + 1 {
        return Err(CodecError::mismatch(format!(
            "header declares {} levels but the layout has {} subbands",
            levels,
            layout.entries().len()
        )));
    }
    if steps.len() != layout.entries().len() {
        return Err(CodecError::mismatch(format!(
            "{} steps for {} subbands",
            steps.len(),
            layout.entries().len()
        )));
    }
    let steps = StepTable::from_entries(layout.ids().into_iter().zip(steps))?;

    Ok(EncodedChannel {
        bitstream,
        table,
        layout,
        original_dims,
        steps,
    })
}

fn read_header(data: &[u8]) -> Result<(u8, (usize, usize))> {
    let mut cursor = Cursor::new(data);
    let version = cursor.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(CodecError::format(format!(
            "unsupported band version {}",
            version
        )));
    }
    let levels = cursor.read_u8()?;
    let rows = cursor.read_u32()? as usize;
    let cols = cursor.read_u32()? as usize;
    Ok((levels, (rows, cols)))
}

fn read_steps(data: &[u8]) -> Result<Vec<f32>> {
    let mut cursor = Cursor::new(data);
    let n = cursor.read_u32()?;
    let n = check_records(&cursor, n, 4, "QSTP")?;
    cursor.read_f32_slice(n)
}

fn read_layout(data: &[u8]) -> Result<SubbandLayout> {
    let mut cursor = Cursor::new(data);
    let n = cursor.read_u32()?;
    let n = check_records(&cursor, n, LAYOUT_RECORD, "LAYT")?;
    let mut entries = Vec::with_capacity(n);
    for _ in 0..n {
        let level = cursor.read_u8()?;
        let kind = cursor.read_u8()?;
        let kind = SubbandKind::from_u8(kind)
            .ok_or_else(|| CodecError::format(format!("unknown subband kind {}", kind)))?;
        let rows = cursor.read_u32()? as usize;
        let cols = cursor.read_u32()? as usize;
        let count = cursor.read_u32()? as usize;
        entries.push(LayoutEntry {
            id: SubbandId::new(level, kind),
            rows,
            cols,
            count,
        });
    }
    Ok(SubbandLayout::new(entries))
}

fn read_table(data: &[u8]) -> Result<HuffmanTable> {
    let mut cursor = Cursor::new(data);
    let n = cursor.read_u32()?;
    let n = check_records(&cursor, n, HUFF_RECORD, "HUFF")?;
    let mut entries = Vec::with_capacity(n);
    for _ in 0..n {
        let symbol = cursor.read_i32()?;
        let len = cursor.read_u8()?;
        let bits = cursor.read_u64()?;
        entries.push((symbol, Codeword::new(bits, len)?));
    }
    HuffmanTable::from_entries(entries)
}

fn read_bits(data: &[u8]) -> Result<Bitstream> {
    let mut cursor = Cursor::new(data);
    let bit_len = cursor.read_u64()?;
    let byte_len = bit_len.div_ceil(8);
    let remaining = (data.len() - 8) as u64;
    if byte_len != remaining {
        return Err(CodecError::format(format!(
            "BITS declares {} bits but carries {} bytes",
            bit_len, remaining
        )));
    }
    let mut bits = BitVec::<u8, Msb0>::from_vec(data[8..].to_vec());
    bits.truncate(bit_len as usize);
    Ok(bits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{encode_channel, CodecParams};

    fn sample_image() -> EncodedImage {
        let a = Matrix::from_fn(10, 12, |r, c| ((r * 13 + c * 7) % 97) as f32);
        let b = Matrix::from_fn(9, 8, |r, c| (r as f32 - c as f32) * 3.0);
        let params = CodecParams::default();
        EncodedImage::new(vec![
            encode_channel(&a, &params).unwrap(),
            encode_channel(&b, &params).unwrap(),
        ])
    }

    #[test]
    fn test_roundtrip_is_exact() {
        let image = sample_image();
        let bytes = image.to_bytes().unwrap();
        assert_eq!(&bytes[0..4], b"FORM");
        assert_eq!(&bytes[8..12], b"DWTC");
        assert_eq!(bytes.len() % 2, 0);
        let back = EncodedImage::from_bytes(&bytes).unwrap();
        assert_eq!(back, image);
    }

    #[test]
    fn test_band_header_bytes() {
        let image = sample_image();
        let bytes = image.to_bytes().unwrap();
        assert_eq!(&bytes[12..16], b"FORM");
        assert_eq!(&bytes[20..24], b"BAND");
        assert_eq!(&bytes[24..28], b"BHDR");
        assert_eq!(&bytes[28..32], &10u32.to_be_bytes());
        assert_eq!(bytes[32], FORMAT_VERSION);
        assert_eq!(bytes[33], 2);
        assert_eq!(&bytes[34..38], &10u32.to_be_bytes());
        assert_eq!(&bytes[38..42], &12u32.to_be_bytes());
    }

    #[test]
    fn test_every_truncation_fails_cleanly() {
        let bytes = sample_image().to_bytes().unwrap();
        for len in 0..bytes.len() {
            assert!(
                EncodedImage::from_bytes(&bytes[..len]).is_err(),
                "prefix of {} bytes parsed",
                len
            );
        }
    }

    #[test]
    fn test_rejects_wrong_form() {
        let mut bytes = sample_image().to_bytes().unwrap();
        bytes[8..12].copy_from_slice(b"DJVU");
        assert!(matches!(
            EncodedImage::from_bytes(&bytes),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn test_rejects_bad_version() {
        let mut bytes = sample_image().to_bytes().unwrap();
        bytes[32] = 9;
        assert!(matches!(
            EncodedImage::from_bytes(&bytes),
            Err(CodecError::Format(_))
        ));
    }

    #[test]
    fn test_unknown_chunks_are_skipped() {
        let image = sample_image();
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut iff = IffWriter::new(&mut cursor);
            iff.put_chunk("FORM:DWTC").unwrap();
            iff.write_chunk(b"NOTE", b"hello").unwrap();
            write_band(&mut iff, &image.channels[0]).unwrap();
            iff.close_chunk().unwrap();
        }
        let back = EncodedImage::from_bytes(&cursor.into_inner()).unwrap();
        assert_eq!(back.channels.len(), 1);
        assert_eq!(back.channels[0], image.channels[0]);
    }

    #[test]
    fn test_empty_container() {
        let bytes = EncodedImage::default().to_bytes().unwrap();
        assert_eq!(bytes.len(), 12);
        assert!(EncodedImage::from_bytes(&bytes).unwrap().channels.is_empty());
    }

    #[test]
    fn test_stats_accumulate() {
        let image = sample_image();
        let stats = image.stats();
        assert_eq!(stats.pixel_count, 120 + 72);
        assert_eq!(
            stats.compressed_bits,
            image.channels.iter().map(|c| c.bitstream.len() as u64).sum::<u64>()
        );
    }
}
