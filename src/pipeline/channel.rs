// src/pipeline/channel.rs

//! Encoding and decoding of a single channel.
//!
//! Encode: pad → decompose → quantize → flatten/concatenate → Huffman.
//! Decode: Huffman → split → dequantize → reconstruct → crop.
//!
//! Subbands are concatenated in canonical order: coarsest `LL` first, then
//! the detail levels from coarsest to finest, each as `LH`, `HL`, `HH`.

use log::debug;

use super::params::CodecParams;
use crate::encode::dwt::{DetailLevel, Pyramid, SubbandId};
use crate::encode::huffman::{self, Bitstream, HuffmanTable};
use crate::encode::quant::{self, QuantizedBand, StepTable};
use crate::image::Matrix;
use crate::utils::error::{CodecError, Result};

/// Shape record for one subband in the concatenated symbol stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutEntry {
    pub id: SubbandId,
    pub rows: usize,
    pub cols: usize,
    pub count: usize,
}

/// The ordered list of subbands making up a channel's symbol stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SubbandLayout {
    entries: Vec<LayoutEntry>,
}

fn even_up(n: usize) -> usize {
    n + n % 2
}

impl SubbandLayout {
    pub fn new(entries: Vec<LayoutEntry>) -> Self {
        SubbandLayout { entries }
    }

    pub fn entries(&self) -> &[LayoutEntry] {
        &self.entries
    }

    pub fn ids(&self) -> Vec<SubbandId> {
        self.entries.iter().map(|e| e.id).collect()
    }

    /// Number of symbols across all subbands.
    pub fn total_count(&self) -> usize {
        self.entries.iter().map(|e| e.count).sum()
    }

    /// Decomposition depth implied by the entry count.
    pub fn levels(&self) -> usize {
        self.entries.len().saturating_sub(1) / 3
    }

    /// Checks that the layout is exactly what encoding a channel of
    /// `original_dims` would have produced.
    pub fn validate(&self, original_dims: (usize, usize)) -> Result<()> {
        let levels = self.levels();
        if levels == 0 || self.entries.len() != 3 * levels + 1 || levels > u8::MAX as usize {
            return Err(CodecError::mismatch(format!(
                "a layout of {} subbands does not describe a wavelet pyramid",
                self.entries.len()
            )));
        }
        let (rows, cols) = original_dims;
        if rows == 0 || cols == 0 {
            return Err(CodecError::mismatch(format!(
                "original dimensions {}x{} are empty",
                rows, cols
            )));
        }

        // Expected subband shape per level, finest first.
        let mut expected = Vec::with_capacity(levels);
        let (mut r, mut c) = (even_up(rows), even_up(cols));
        for _ in 0..levels {
            expected.push((r / 2, c / 2));
            r = even_up(r / 2);
            c = even_up(c / 2);
        }

        for (entry, id) in self
            .entries
            .iter()
            .zip(SubbandId::canonical_order(levels as u8))
        {
            if entry.id != id {
                return Err(CodecError::mismatch(format!(
                    "layout lists subband {} where {} is expected",
                    entry.id, id
                )));
            }
            if entry.count != entry.rows * entry.cols {
                return Err(CodecError::mismatch(format!(
                    "subband {} is {}x{} but records {} symbols",
                    id, entry.rows, entry.cols, entry.count
                )));
            }
            let dims = expected[id.level as usize - 1];
            if (entry.rows, entry.cols) != dims {
                return Err(CodecError::mismatch(format!(
                    "subband {} is {}x{}, a {}x{} channel yields {}x{}",
                    id, entry.rows, entry.cols, rows, cols, dims.0, dims.1
                )));
            }
        }
        Ok(())
    }
}

/// Size figures of one encoded channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionStats {
    /// Bits in the Huffman payload.
    pub compressed_bits: u64,
    /// Symbols in the payload (all subband coefficients).
    pub symbol_count: u64,
    /// Samples of the original channel.
    pub pixel_count: u64,
}

impl CompressionStats {
    /// Payload bits per original sample.
    pub fn bits_per_pixel(&self) -> f64 {
        if self.pixel_count == 0 {
            return 0.0;
        }
        self.compressed_bits as f64 / self.pixel_count as f64
    }

    /// Ratio of raw size at `bits_per_sample` to the payload size.
    pub fn compression_ratio(&self, bits_per_sample: u32) -> f64 {
        if self.compressed_bits == 0 {
            return 0.0;
        }
        (self.pixel_count * bits_per_sample as u64) as f64 / self.compressed_bits as f64
    }

    pub(crate) fn accumulate(&mut self, other: &CompressionStats) {
        self.compressed_bits += other.compressed_bits;
        self.symbol_count += other.symbol_count;
        self.pixel_count += other.pixel_count;
    }
}

/// Everything needed to reconstruct one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedChannel {
    pub bitstream: Bitstream,
    pub table: HuffmanTable,
    pub layout: SubbandLayout,
    pub original_dims: (usize, usize),
    /// Steps used for each subband of `layout`.
    pub steps: StepTable,
}

impl EncodedChannel {
    /// Decomposition depth of this channel.
    pub fn levels(&self) -> usize {
        self.layout.levels()
    }

    pub fn stats(&self) -> CompressionStats {
        CompressionStats {
            compressed_bits: self.bitstream.len() as u64,
            symbol_count: self.layout.total_count() as u64,
            pixel_count: (self.original_dims.0 * self.original_dims.1) as u64,
        }
    }
}

/// Encodes one channel.
pub fn encode_channel(image: &Matrix, params: &CodecParams) -> Result<EncodedChannel> {
    params.validate()?;
    if image.is_empty() {
        return Err(CodecError::shape(format!(
            "cannot encode an empty {}x{} channel",
            image.rows(),
            image.cols()
        )));
    }

    let original_dims = image.dims();
    let padded = image.pad_even();
    let pyramid = Pyramid::decompose(&padded, params.levels)?;

    let mut entries = Vec::with_capacity(3 * params.levels + 1);
    let mut steps = Vec::with_capacity(3 * params.levels + 1);
    let mut symbols = Vec::new();
    for (id, band) in pyramid.subbands() {
        let step = params.steps.step(id)?;
        let quantized = quant::quantize(band, step)?;
        entries.push(LayoutEntry {
            id,
            rows: quantized.rows(),
            cols: quantized.cols(),
            count: quantized.len(),
        });
        steps.push((id, step));
        symbols.extend_from_slice(quantized.as_slice());
    }

    let table = HuffmanTable::build(&symbols)?;
    let bitstream = huffman::encode(&symbols, &table)?;
    let encoded = EncodedChannel {
        bitstream,
        table,
        layout: SubbandLayout::new(entries),
        original_dims,
        steps: StepTable::from_entries(steps)?,
    };

    let stats = encoded.stats();
    debug!(
        "encoded {}x{} channel: {} levels, {} symbols, {} bits ({:.3} bpp)",
        original_dims.0,
        original_dims.1,
        params.levels,
        stats.symbol_count,
        stats.compressed_bits,
        stats.bits_per_pixel()
    );
    Ok(encoded)
}

/// Decodes one channel back to its original dimensions.
pub fn decode_channel(encoded: &EncodedChannel) -> Result<Matrix> {
    let layout = &encoded.layout;
    layout.validate(encoded.original_dims)?;
    let steps = encoded.steps.steps_for(&layout.ids())?;

    let symbols = huffman::decode(&encoded.bitstream, &encoded.table, layout.total_count())?;

    let mut bands = Vec::with_capacity(layout.entries().len());
    let mut offset = 0;
    for (entry, &step) in layout.entries().iter().zip(&steps) {
        let slice = &symbols[offset..offset + entry.count];
        offset += entry.count;
        let quantized = QuantizedBand::from_vec(entry.rows, entry.cols, slice.to_vec())?;
        bands.push(quant::dequantize(&quantized, step)?);
    }

    let mut bands = bands.into_iter();
    let approx = bands
        .next()
        .ok_or_else(|| CodecError::mismatch("layout has no approximation subband"))?;

    // Canonical order lists levels coarsest first; the pyramid wants finest first.
    let mut levels = Vec::with_capacity(layout.levels());
    while let (Some(lh), Some(hl), Some(hh)) = (bands.next(), bands.next(), bands.next()) {
        levels.push((lh, hl, hh));
    }
    levels.reverse();

    let padded_dims = (
        even_up(encoded.original_dims.0),
        even_up(encoded.original_dims.1),
    );
    let mut details: Vec<DetailLevel> = Vec::with_capacity(levels.len());
    for (lh, hl, hh) in levels {
        let source_dims = details.last().map_or(padded_dims, DetailLevel::dims);
        details.push(DetailLevel {
            source_dims,
            lh,
            hl,
            hh,
        });
    }

    let reconstructed = Pyramid::new(approx, details)?.reconstruct()?;
    let (rows, cols) = encoded.original_dims;
    let image = reconstructed.crop(rows, cols)?;
    debug!("decoded {}x{} channel", rows, cols);
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::dwt::SubbandKind;

    fn ramp(rows: usize, cols: usize) -> Matrix {
        Matrix::from_fn(rows, cols, |r, c| (r * cols + c) as f32 * 4.0)
    }

    #[test]
    fn test_layout_order_and_counts() {
        let encoded = encode_channel(&ramp(16, 12), &CodecParams::default()).unwrap();
        let ids: Vec<String> = encoded.layout.ids().iter().map(|id| id.to_string()).collect();
        assert_eq!(ids, ["LL2", "LH2", "HL2", "HH2", "LH1", "HL1", "HH1"]);
        assert_eq!(encoded.layout.entries()[0].count, 4 * 3);
        assert_eq!(encoded.layout.entries()[6].count, 8 * 6);
        assert_eq!(encoded.layout.total_count(), 4 * 12 + 3 * 48);
        assert_eq!(encoded.stats().pixel_count, 192);
    }

    #[test]
    fn test_roundtrip_with_unit_steps() {
        let image = ramp(8, 8);
        let params = CodecParams::new(1, StepTable::uniform(1.0));
        let encoded = encode_channel(&image, &params).unwrap();
        let decoded = decode_channel(&encoded).unwrap();
        assert_eq!(decoded.dims(), (8, 8));
        assert!(image.max_abs_diff(&decoded).unwrap() < 1.0);
    }

    #[test]
    fn test_rejects_empty_image() {
        let params = CodecParams::default();
        assert!(matches!(
            encode_channel(&Matrix::new(0, 4), &params),
            Err(CodecError::Shape(_))
        ));
    }

    #[test]
    fn test_layout_validation_catches_tampering() {
        let mut encoded = encode_channel(&ramp(8, 8), &CodecParams::default()).unwrap();
        let mut entries = encoded.layout.entries().to_vec();
        entries[1].count += 1;
        encoded.layout = SubbandLayout::new(entries);
        assert!(matches!(decode_channel(&encoded), Err(CodecError::ConfigMismatch(_))));
    }

    #[test]
    fn test_missing_step_is_a_mismatch() {
        let mut encoded = encode_channel(&ramp(8, 8), &CodecParams::default()).unwrap();
        let ll = SubbandId::new(2, SubbandKind::LL);
        encoded.steps = StepTable::from_entries(vec![(ll, 1.0)]).unwrap();
        assert!(matches!(decode_channel(&encoded), Err(CodecError::ConfigMismatch(_))));
    }

    #[test]
    fn test_wrong_original_dims_is_a_mismatch() {
        let mut encoded = encode_channel(&ramp(8, 8), &CodecParams::default()).unwrap();
        encoded.original_dims = (12, 8);
        assert!(matches!(decode_channel(&encoded), Err(CodecError::ConfigMismatch(_))));
    }

    #[test]
    fn test_truncated_payload() {
        let mut encoded = encode_channel(&ramp(8, 8), &CodecParams::default()).unwrap();
        let keep = encoded.bitstream.len() / 2;
        encoded.bitstream.truncate(keep);
        assert!(matches!(
            decode_channel(&encoded),
            Err(CodecError::TruncatedStream { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let stats = CompressionStats {
            compressed_bits: 128,
            symbol_count: 64,
            pixel_count: 64,
        };
        assert_eq!(stats.bits_per_pixel(), 2.0);
        assert_eq!(stats.compression_ratio(8), 4.0);
    }
}
