pub mod byte_stream;
pub mod chunk;
pub mod container;

// Re-export commonly used types
pub use byte_stream::{ByteReader, ByteWriter};
pub use chunk::{Chunk, IffReaderExt, IffWriter, IffWriterExt};
pub use container::{EncodedImage, FORMAT_VERSION};
