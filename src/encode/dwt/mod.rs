// src/encode/dwt/mod.rs

//! Discrete wavelet transform built on the 4-tap Daubechies filter bank.
//!
//! - `filter_bank`: 1D analysis/synthesis
//! - `transform`: one separable 2D level
//! - `pyramid`: multi-level decomposition with even-padding

pub mod filter_bank;
pub mod pyramid;
pub mod transform;

pub use filter_bank::{forward_1d, inverse_1d, DB4_HIGH, DB4_LOW};
pub use pyramid::{DetailLevel, Pyramid, SubbandId, SubbandKind};
pub use transform::{Decode, Encode, Subbands};
