// src/utils/error.rs

use thiserror::Error;

/// The primary error type for all operations in the codec.
///
/// Every stage reports its failures through this type; the pipeline never
/// substitutes defaults for a failed stage.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Odd, mismatched or empty dimensions where even or matching shapes are required.
    #[error("Shape error: {0}")]
    Shape(String),

    /// An attempt to build a code table or encode from zero symbols.
    #[error("Cannot entropy-code an empty symbol sequence")]
    EmptyInput,

    /// The bitstream ran out of bits before the expected symbol count was reached.
    #[error("Truncated stream: decoded {decoded} of {expected} symbols")]
    TruncatedStream { decoded: usize, expected: usize },

    /// The bitstream or code table cannot be interpreted.
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// The decoder's step table or subband layout does not reconcile with the stream.
    #[error("Configuration mismatch: {0}")]
    ConfigMismatch(String),

    /// A symbol has no codeword in the table used for encoding.
    #[error("Symbol {0} has no codeword in the code table")]
    UnknownSymbol(i32),

    /// An invalid argument was provided to a function.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The container framing is malformed.
    #[error("Container format error: {0}")]
    Format(String),

    /// An error occurred while reading or writing a container.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Every band of a multi-band call failed.
    #[error("All {bands} bands failed")]
    AllBandsFailed { bands: usize },
}

impl CodecError {
    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        CodecError::Shape(msg.into())
    }

    pub(crate) fn mismatch(msg: impl Into<String>) -> Self {
        CodecError::ConfigMismatch(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        CodecError::Format(msg.into())
    }
}

/// A specialized `Result` type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = CodecError::TruncatedStream {
            decoded: 3,
            expected: 4,
        };
        assert_eq!(err.to_string(), "Truncated stream: decoded 3 of 4 symbols");
        assert_eq!(
            CodecError::shape("rows must be even").to_string(),
            "Shape error: rows must be even"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: CodecError = io.into();
        assert!(matches!(err, CodecError::Io(_)));
    }
}
