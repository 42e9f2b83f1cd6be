pub mod dwt;
pub mod huffman;
pub mod quant;

// Re-export commonly used encoding functionality
pub use dwt::{Pyramid, SubbandId, SubbandKind};
pub use huffman::{Bitstream, Codeword, HuffmanTable};
pub use quant::{QuantizedBand, StepTable};

// Re-export error types for convenience
pub use crate::utils::error::{CodecError, Result};
