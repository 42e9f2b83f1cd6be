// src/image/matrix.rs

//! In-memory representation of one image channel or spectral band.
//!
//! A `Matrix` is a dense, row-major grid of `f32` samples. It is the unit
//! that flows through the codec: raw bands go in, subbands are produced by
//! the wavelet transform, and reconstructed bands come out. Every operation
//! returns a new matrix; callers' matrices are never modified in place.

use crate::utils::error::{CodecError, Result};

/// A 2D buffer of real-valued samples stored in row-major order.
#[derive(Clone, Debug, PartialEq)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    data: Vec<f32>,
}

impl Matrix {
    /// Creates a new matrix with the given dimensions, initialized to zero.
    pub fn new(rows: usize, cols: usize) -> Self {
        Matrix {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    /// Creates a matrix from a raw vector of samples in row-major order.
    pub fn from_vec(rows: usize, cols: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(CodecError::shape(format!(
                "{} samples cannot fill a {}x{} matrix",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(Matrix { rows, cols, data })
    }

    /// Creates a matrix from a slice of equally sized rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(CodecError::shape(format!(
                    "row {} has {} samples, expected {}",
                    i,
                    row.len(),
                    cols
                )));
            }
            data.extend_from_slice(row);
        }
        Ok(Matrix {
            rows: rows.len(),
            cols,
            data,
        })
    }

    /// Creates a matrix by calling a function for each `(row, col)` position.
    pub fn from_fn<F>(rows: usize, cols: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(rows * cols);
        for r in 0..rows {
            for c in 0..cols {
                data.push(f(r, c));
            }
        }
        Matrix { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Returns the dimensions as a tuple `(rows, cols)`.
    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col]
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        assert!(row < self.rows && col < self.cols);
        self.data[row * self.cols + col] = value;
    }

    /// Borrows one row as a slice.
    pub fn row(&self, row: usize) -> &[f32] {
        let start = row * self.cols;
        &self.data[start..start + self.cols]
    }

    /// Gathers one column into a new vector.
    pub fn column(&self, col: usize) -> Vec<f32> {
        (0..self.rows).map(|r| self.data[r * self.cols + col]).collect()
    }

    /// Returns the samples in row-major order.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// Returns a copy padded to even dimensions.
    ///
    /// An odd row count duplicates the last row, an odd column count
    /// duplicates the last column. Even dimensions are returned unchanged.
    pub fn pad_even(&self) -> Matrix {
        let rows = self.rows + self.rows % 2;
        let cols = self.cols + self.cols % 2;
        if (rows, cols) == self.dims() {
            return self.clone();
        }
        Matrix::from_fn(rows, cols, |r, c| {
            self.data[r.min(self.rows - 1) * self.cols + c.min(self.cols - 1)]
        })
    }

    /// Returns the top-left `rows x cols` region.
    pub fn crop(&self, rows: usize, cols: usize) -> Result<Matrix> {
        if rows > self.rows || cols > self.cols {
            return Err(CodecError::shape(format!(
                "cannot crop {}x{} matrix to {}x{}",
                self.rows, self.cols, rows, cols
            )));
        }
        if (rows, cols) == self.dims() {
            return Ok(self.clone());
        }
        Ok(Matrix::from_fn(rows, cols, |r, c| self.data[r * self.cols + c]))
    }

    /// Largest absolute sample difference between two matrices of equal shape.
    pub fn max_abs_diff(&self, other: &Matrix) -> Result<f32> {
        if self.dims() != other.dims() {
            return Err(CodecError::shape(format!(
                "cannot compare {}x{} with {}x{}",
                self.rows, self.cols, other.rows, other.cols
            )));
        }
        Ok(self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f32::max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_vec_rejects_wrong_length() {
        assert!(Matrix::from_vec(2, 3, vec![0.0; 5]).is_err());
        assert!(Matrix::from_vec(2, 3, vec![0.0; 6]).is_ok());
    }

    #[test]
    fn test_from_rows_ragged() {
        let rows = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(Matrix::from_rows(&rows), Err(CodecError::Shape(_))));
    }

    #[test]
    fn test_pad_even_duplicates_last_row_and_column() {
        let m = Matrix::from_fn(3, 5, |r, c| (r * 10 + c) as f32);
        let p = m.pad_even();
        assert_eq!(p.dims(), (4, 6));
        for c in 0..5 {
            assert_eq!(p.get(3, c), m.get(2, c));
        }
        for r in 0..3 {
            assert_eq!(p.get(r, 5), m.get(r, 4));
        }
        assert_eq!(p.get(3, 5), m.get(2, 4));
    }

    #[test]
    fn test_pad_even_keeps_even_matrix() {
        let m = Matrix::from_fn(4, 2, |r, c| (r + c) as f32);
        assert_eq!(m.pad_even(), m);
    }

    #[test]
    fn test_crop() {
        let m = Matrix::from_fn(4, 4, |r, c| (r * 4 + c) as f32);
        let c = m.crop(3, 2).unwrap();
        assert_eq!(c.dims(), (3, 2));
        assert_eq!(c.row(2), &[8.0, 9.0]);
        assert!(m.crop(5, 1).is_err());
    }

    #[test]
    fn test_column_and_row() {
        let m = Matrix::from_fn(2, 3, |r, c| (r * 3 + c) as f32);
        assert_eq!(m.row(1), &[3.0, 4.0, 5.0]);
        assert_eq!(m.column(2), vec![2.0, 5.0]);
    }
}
