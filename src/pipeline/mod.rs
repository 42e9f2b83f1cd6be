pub mod bands;
pub mod channel;
pub mod params;

pub use bands::{decode_bands, encode_bands};
pub use channel::{
    decode_channel, encode_channel, CompressionStats, EncodedChannel, LayoutEntry, SubbandLayout,
};
pub use params::{CodecParams, DEFAULT_LEVELS};
