// src/encode/dwt/filter_bank.rs

//! Two-band orthogonal filter bank built on the 4-tap Daubechies wavelet.
//!
//! The analysis step splits an even-length signal into `N/2` approximation
//! and `N/2` detail samples. The signal is extended periodically by two
//! samples on each side, which keeps the analysis operator orthonormal: the
//! synthesis step is its exact transpose and reconstructs the input up to
//! floating-point rounding.
//!
//! Samples are stored as `f32` but every dot product is accumulated in `f64`
//! so that rounding does not build up across decomposition levels.

use crate::utils::error::{CodecError, Result};

/// Number of taps of each analysis/synthesis filter.
pub const TAPS: usize = 4;

/// Number of samples the signal is extended by on each side.
pub const EXTENSION: usize = 2;

/// Analysis low-pass taps: `[(1+√3), (3+√3), (3−√3), (1−√3)] / (4√2)`.
pub const DB4_LOW: [f64; TAPS] = [
    0.482_962_913_144_534_1,
    0.836_516_303_737_807_7,
    0.224_143_868_042_013_4,
    -0.129_409_522_551_260_34,
];

/// Analysis high-pass taps, the quadrature mirror `g[j] = (-1)^j h[3-j]`.
pub const DB4_HIGH: [f64; TAPS] = [DB4_LOW[3], -DB4_LOW[2], DB4_LOW[1], -DB4_LOW[0]];

/// Index into the periodically extended signal for output pair `k`, tap `j`.
#[inline]
fn tap_index(k: usize, j: usize, n: usize) -> usize {
    (2 * k + j + n - EXTENSION) % n
}

/// Forward 1D transform: `signal -> (approx, detail)`.
///
/// Requires an even length of at least 4.
pub fn forward_1d(signal: &[f32]) -> Result<(Vec<f32>, Vec<f32>)> {
    let n = signal.len();
    if n < TAPS || n % 2 != 0 {
        return Err(CodecError::shape(format!(
            "forward transform needs an even length >= {}, got {}",
            TAPS, n
        )));
    }

    let half = n / 2;
    let mut approx = Vec::with_capacity(half);
    let mut detail = Vec::with_capacity(half);
    for k in 0..half {
        let mut a = 0.0f64;
        let mut d = 0.0f64;
        for j in 0..TAPS {
            let x = signal[tap_index(k, j, n)] as f64;
            a += DB4_LOW[j] * x;
            d += DB4_HIGH[j] * x;
        }
        approx.push(a as f32);
        detail.push(d as f32);
    }
    Ok((approx, detail))
}

/// Inverse 1D transform: `(approx, detail) -> signal` of length `2 * approx.len()`.
///
/// Each pair `(approx[k], detail[k])` contributes `h[j]*a + g[j]*d` to the
/// output positions covered by analysis window `k`; overlaps are summed.
pub fn inverse_1d(approx: &[f32], detail: &[f32]) -> Result<Vec<f32>> {
    if approx.len() != detail.len() {
        return Err(CodecError::shape(format!(
            "approximation has {} samples but detail has {}",
            approx.len(),
            detail.len()
        )));
    }
    let n = approx.len() * 2;
    if n < TAPS {
        return Err(CodecError::shape(format!(
            "inverse transform needs at least {} output samples, got {}",
            TAPS, n
        )));
    }

    let mut out = vec![0.0f64; n];
    for (k, (&a, &d)) in approx.iter().zip(detail).enumerate() {
        let (a, d) = (a as f64, d as f64);
        for j in 0..TAPS {
            out[tap_index(k, j, n)] += DB4_LOW[j] * a + DB4_HIGH[j] * d;
        }
    }
    Ok(out.into_iter().map(|v| v as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_err(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).fold(0.0, f32::max)
    }

    #[test]
    fn test_filter_invariants() {
        let sum_low: f64 = DB4_LOW.iter().sum();
        let sum_high: f64 = DB4_HIGH.iter().sum();
        let energy: f64 = DB4_LOW.iter().map(|h| h * h).sum();
        assert!((sum_low - std::f64::consts::SQRT_2).abs() < 1e-12);
        assert!(sum_high.abs() < 1e-12);
        assert!((energy - 1.0).abs() < 1e-12);
        // Orthogonal to its own shift by two.
        let shifted = DB4_LOW[0] * DB4_LOW[2] + DB4_LOW[1] * DB4_LOW[3];
        assert!(shifted.abs() < 1e-12);
    }

    #[test]
    fn test_rejects_bad_lengths() {
        assert!(matches!(forward_1d(&[1.0, 2.0]), Err(CodecError::Shape(_))));
        assert!(matches!(forward_1d(&[1.0; 5]), Err(CodecError::Shape(_))));
        assert!(matches!(inverse_1d(&[1.0; 2], &[1.0; 3]), Err(CodecError::Shape(_))));
        assert!(matches!(inverse_1d(&[1.0], &[1.0]), Err(CodecError::Shape(_))));
    }

    #[test]
    fn test_constant_signal_has_no_detail() {
        let (approx, detail) = forward_1d(&[5.0; 8]).unwrap();
        for a in approx {
            assert!((a - 5.0 * std::f32::consts::SQRT_2).abs() < 1e-4);
        }
        for d in detail {
            assert!(d.abs() < 1e-5);
        }
    }

    #[test]
    fn test_linear_signal_interior_detail_vanishes() {
        // Two vanishing moments: windows that do not wrap see zero detail.
        let signal: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let (_, detail) = forward_1d(&signal).unwrap();
        for d in &detail[1..] {
            assert!(d.abs() < 1e-4, "detail {} should vanish", d);
        }
    }

    #[test]
    fn test_roundtrip() {
        for n in [4usize, 6, 8, 10, 32] {
            let signal: Vec<f32> = (0..n).map(|i| ((i * 37) % 19) as f32 - 7.5).collect();
            let (a, d) = forward_1d(&signal).unwrap();
            assert_eq!(a.len(), n / 2);
            let back = inverse_1d(&a, &d).unwrap();
            assert_eq!(back.len(), n);
            assert!(max_err(&signal, &back) < 1e-4, "n = {}", n);
        }
    }

    #[test]
    fn test_energy_preserved() {
        let signal: Vec<f32> = (0..12).map(|i| (i as f32 * 0.7).sin() * 10.0).collect();
        let (a, d) = forward_1d(&signal).unwrap();
        let e_in: f32 = signal.iter().map(|v| v * v).sum();
        let e_out: f32 = a.iter().chain(&d).map(|v| v * v).sum();
        assert!((e_in - e_out).abs() < 1e-2);
    }
}
