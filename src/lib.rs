//! A Rust library for lossy compression of single-channel raster data.
//!
//! Each channel goes through a multi-level 2D wavelet transform with the
//! 4-tap Daubechies filter, uniform scalar quantization per subband, and
//! Huffman coding of the concatenated integer symbols. Channels of a
//! multi-band image are coded independently and can be stored together in
//! an IFF-style container.
//!
//! # Quick Start
//!
//! ```ignore
//! use dwt_codec::{decode_channel, encode_channel, CodecParams, EncodedImage, Matrix};
//!
//! let band = Matrix::from_fn(64, 64, |r, c| ((r * c) % 256) as f32);
//! let params = CodecParams::default().with_levels(3).with_base_step(2.0);
//!
//! let encoded = encode_channel(&band, &params)?;
//! println!("{:.3} bpp", encoded.stats().bits_per_pixel());
//!
//! let bytes = EncodedImage::new(vec![encoded]).to_bytes()?;
//! let image = EncodedImage::from_bytes(&bytes)?;
//! let restored = decode_channel(&image.channels[0])?;
//! assert_eq!(restored.dims(), (64, 64));
//! ```
//!
//! # Features
//!
//! - **Exact inverse**: the orthonormal filter bank reconstructs unquantized
//!   subbands to floating-point precision
//! - **Any size**: odd dimensions are padded internally and cropped on decode
//! - **Per-band isolation**: one failing band never aborts the others
//! - **Optional parallelism**: Enable `rayon` feature for parallel band coding

// Core modules
pub mod encode;
pub mod iff;
pub mod image;
pub mod pipeline;
pub mod utils;

// Pipeline API
pub use pipeline::{
    decode_bands, decode_channel, encode_bands, encode_channel, CodecParams, CompressionStats,
    EncodedChannel,
};

// Building blocks (for custom workflows)
pub use encode::{HuffmanTable, Pyramid, StepTable, SubbandId, SubbandKind};

// Container and data types
pub use iff::EncodedImage;
pub use image::Matrix;

// Error types
pub use utils::error::{CodecError, Result};

// Constants
pub const CODEC_VERSION: &str = "0.1.0";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert_eq!(CODEC_VERSION, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_public_api_roundtrip() -> Result<()> {
        let band = Matrix::from_fn(16, 16, |r, c| ((r * 16 + c) % 256) as f32);
        let params = CodecParams::new(2, StepTable::uniform(0.5));
        let encoded = encode_channel(&band, &params)?;
        let bytes = EncodedImage::new(vec![encoded]).to_bytes()?;
        assert_eq!(&bytes[8..12], b"DWTC");

        let image = EncodedImage::from_bytes(&bytes)?;
        let restored = decode_channel(&image.channels[0])?;
        assert_eq!(restored.dims(), (16, 16));
        assert!(band.max_abs_diff(&restored)? < 1.0);
        Ok(())
    }
}
