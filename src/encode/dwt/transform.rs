// src/encode/dwt/transform.rs

//! One level of the separable 2D wavelet transform.
//!
//! Naming is fixed across the crate: the first letter is the row
//! (horizontal) filter, the second the column (vertical) filter.
//! `LH` therefore holds row-low-pass, column-high-pass coefficients.

use super::filter_bank::{forward_1d, inverse_1d};
use crate::image::Matrix;
use crate::utils::error::{CodecError, Result};

/// The four quadrant outputs of one 2D decomposition step.
#[derive(Debug, Clone, PartialEq)]
pub struct Subbands {
    pub ll: Matrix,
    pub lh: Matrix,
    pub hl: Matrix,
    pub hh: Matrix,
}

impl Subbands {
    /// Shape shared by all four subbands.
    pub fn dims(&self) -> (usize, usize) {
        self.ll.dims()
    }
}

/// Gathers per-row transform outputs into two half-width matrices.
fn split_rows(input: &Matrix) -> Result<(Matrix, Matrix)> {
    let (rows, cols) = input.dims();
    let half = cols / 2;
    let mut low = Vec::with_capacity(rows * half);
    let mut high = Vec::with_capacity(rows * half);
    for r in 0..rows {
        let (a, d) = forward_1d(input.row(r))?;
        low.extend(a);
        high.extend(d);
    }
    Ok((
        Matrix::from_vec(rows, half, low)?,
        Matrix::from_vec(rows, half, high)?,
    ))
}

/// Runs the forward transform down every column of `input`.
fn split_columns(input: &Matrix) -> Result<(Matrix, Matrix)> {
    let (rows, cols) = input.dims();
    let half = rows / 2;
    let mut low = Matrix::new(half, cols);
    let mut high = Matrix::new(half, cols);
    for c in 0..cols {
        let (a, d) = forward_1d(&input.column(c))?;
        for r in 0..half {
            low.set(r, c, a[r]);
            high.set(r, c, d[r]);
        }
    }
    Ok((low, high))
}

fn merge_columns(low: &Matrix, high: &Matrix) -> Result<Matrix> {
    let (half, cols) = low.dims();
    let mut out = Matrix::new(half * 2, cols);
    for c in 0..cols {
        let col = inverse_1d(&low.column(c), &high.column(c))?;
        for (r, v) in col.into_iter().enumerate() {
            out.set(r, c, v);
        }
    }
    Ok(out)
}

fn merge_rows(low: &Matrix, high: &Matrix) -> Result<Matrix> {
    let (rows, half) = low.dims();
    let mut data = Vec::with_capacity(rows * half * 2);
    for r in 0..rows {
        data.extend(inverse_1d(low.row(r), high.row(r))?);
    }
    Matrix::from_vec(rows, half * 2, data)
}

pub struct Encode;

impl Encode {
    /// Forward 2D transform of one level: row pass, then column pass.
    ///
    /// `input` must have even dimensions of at least 4 in both directions.
    pub fn forward(input: &Matrix) -> Result<Subbands> {
        let (rows, cols) = input.dims();
        if rows < 4 || cols < 4 || rows % 2 != 0 || cols % 2 != 0 {
            return Err(CodecError::shape(format!(
                "2D transform needs even dimensions >= 4, got {}x{}",
                rows, cols
            )));
        }

        let (low_rows, high_rows) = split_rows(input)?;
        let (ll, lh) = split_columns(&low_rows)?;
        let (hl, hh) = split_columns(&high_rows)?;
        Ok(Subbands { ll, lh, hl, hh })
    }
}

pub struct Decode;

impl Decode {
    /// Inverse 2D transform of one level: inverse columns, then inverse rows.
    ///
    /// Output dimensions are twice the subband dimensions.
    pub fn backward(bands: &Subbands) -> Result<Matrix> {
        let dims = bands.ll.dims();
        for (name, band) in [("LH", &bands.lh), ("HL", &bands.hl), ("HH", &bands.hh)] {
            if band.dims() != dims {
                return Err(CodecError::shape(format!(
                    "{} subband is {}x{} but LL is {}x{}",
                    name,
                    band.rows(),
                    band.cols(),
                    dims.0,
                    dims.1
                )));
            }
        }
        if dims.0 < 2 || dims.1 < 2 {
            return Err(CodecError::shape(format!(
                "subbands of {}x{} are too small to reconstruct",
                dims.0, dims.1
            )));
        }

        let low_rows = merge_columns(&bands.ll, &bands.lh)?;
        let high_rows = merge_columns(&bands.hl, &bands.hh)?;
        merge_rows(&low_rows, &high_rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_shapes() {
        let m = Matrix::from_fn(8, 12, |r, c| (r * c) as f32);
        let bands = Encode::forward(&m).unwrap();
        assert_eq!(bands.dims(), (4, 6));
        assert_eq!(bands.hh.dims(), (4, 6));
    }

    #[test]
    fn test_forward_rejects_odd_or_small() {
        assert!(Encode::forward(&Matrix::new(5, 8)).is_err());
        assert!(Encode::forward(&Matrix::new(8, 2)).is_err());
    }

    #[test]
    fn test_subband_orientation() {
        // Every row is constant, so the row high-pass output is zero.
        let m = Matrix::from_fn(8, 8, |r, _| if r % 2 == 0 { 10.0 } else { -10.0 });
        let bands = Encode::forward(&m).unwrap();
        for v in bands.hl.as_slice().iter().chain(bands.hh.as_slice()) {
            assert!(v.abs() < 1e-4);
        }
        assert!(bands.lh.as_slice().iter().any(|v| v.abs() > 1.0));
    }

    #[test]
    fn test_single_level_roundtrip() {
        let m = Matrix::from_fn(6, 10, |r, c| ((r * 7 + c * 3) % 11) as f32 * 20.0);
        let bands = Encode::forward(&m).unwrap();
        let back = Decode::backward(&bands).unwrap();
        assert!(m.max_abs_diff(&back).unwrap() < 1e-3);
    }

    #[test]
    fn test_backward_rejects_mismatched_bands() {
        let bands = Subbands {
            ll: Matrix::new(2, 2),
            lh: Matrix::new(2, 2),
            hl: Matrix::new(2, 3),
            hh: Matrix::new(2, 2),
        };
        assert!(matches!(Decode::backward(&bands), Err(CodecError::Shape(_))));
    }
}
