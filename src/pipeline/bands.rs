// src/pipeline/bands.rs

//! Independent per-band encoding and decoding.
//!
//! Bands share nothing but their parameters, so each one succeeds or fails
//! on its own. With the `rayon` feature enabled the bands are processed in
//! parallel; results always come back in input order.

use log::{info, warn};
#[cfg(feature = "rayon")]
use rayon::prelude::*;

use super::channel::{self, EncodedChannel};
use super::params::CodecParams;
use crate::image::Matrix;
use crate::utils::error::{CodecError, Result};

fn collect_outcomes<T>(results: Vec<Result<T>>, what: &str) -> Result<Vec<Result<T>>> {
    let failed = results.iter().filter(|r| r.is_err()).count();
    if !results.is_empty() && failed == results.len() {
        warn!("{}: all {} bands failed", what, failed);
        return Err(CodecError::AllBandsFailed { bands: failed });
    }
    for (index, result) in results.iter().enumerate() {
        if let Err(e) = result {
            warn!("{}: band {} failed: {}", what, index, e);
        }
    }
    info!(
        "{}: {} of {} bands succeeded",
        what,
        results.len() - failed,
        results.len()
    );
    Ok(results)
}

/// Encodes every band with the same parameters.
///
/// Returns one result per band, in order. Fails as a whole only when the
/// parameters are invalid or every band fails.
pub fn encode_bands(bands: &[Matrix], params: &CodecParams) -> Result<Vec<Result<EncodedChannel>>> {
    params.validate()?;

    #[cfg(feature = "rayon")]
    let results: Vec<_> = bands
        .par_iter()
        .map(|band| channel::encode_channel(band, params))
        .collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<_> = bands
        .iter()
        .map(|band| channel::encode_channel(band, params))
        .collect();

    collect_outcomes(results, "encode")
}

/// Decodes every band independently.
pub fn decode_bands(bands: &[EncodedChannel]) -> Result<Vec<Result<Matrix>>> {
    #[cfg(feature = "rayon")]
    let results: Vec<_> = bands.par_iter().map(channel::decode_channel).collect();
    #[cfg(not(feature = "rayon"))]
    let results: Vec<_> = bands.iter().map(channel::decode_channel).collect();

    collect_outcomes(results, "decode")
}
