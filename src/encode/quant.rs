// src/encode/quant.rs

//! Uniform scalar quantization of wavelet subbands.
//!
//! Quantization is `round(value / step)`, dequantization `value * step`.
//! Both are pure elementwise maps; step sizes come from a [`StepTable`]
//! that is fixed for a run and travels with the encoded channel.

use std::collections::BTreeMap;

use super::dwt::{SubbandId, SubbandKind};
use crate::image::Matrix;
use crate::utils::error::{CodecError, Result};

/// A quantized subband: integer symbols in row-major order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuantizedBand {
    rows: usize,
    cols: usize,
    data: Vec<i32>,
}

impl QuantizedBand {
    pub fn from_vec(rows: usize, cols: usize, data: Vec<i32>) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(CodecError::shape(format!(
                "{} symbols cannot fill a {}x{} subband",
                data.len(),
                rows,
                cols
            )));
        }
        Ok(QuantizedBand { rows, cols, data })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The symbol stream (row-major flattening).
    pub fn as_slice(&self) -> &[i32] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<i32> {
        self.data
    }
}

fn check_step(step: f32) -> Result<()> {
    if step.is_finite() && step > 0.0 {
        Ok(())
    } else {
        Err(CodecError::InvalidArgument(format!(
            "quantization step must be finite and positive, got {}",
            step
        )))
    }
}

/// Quantizes every coefficient of `band` to `round(value / step)`.
pub fn quantize(band: &Matrix, step: f32) -> Result<QuantizedBand> {
    check_step(step)?;
    let step = step as f64;
    let mut data = Vec::with_capacity(band.len());
    for &value in band.as_slice() {
        if !value.is_finite() {
            return Err(CodecError::InvalidArgument(format!(
                "cannot quantize non-finite coefficient {}",
                value
            )));
        }
        let q = (value as f64 / step).round();
        if q < i32::MIN as f64 || q > i32::MAX as f64 {
            return Err(CodecError::InvalidArgument(format!(
                "coefficient {} overflows at step {}",
                value, step
            )));
        }
        data.push(q as i32);
    }
    QuantizedBand::from_vec(band.rows(), band.cols(), data)
}

/// Maps quantized symbols back to coefficients: `value * step`.
pub fn dequantize(band: &QuantizedBand, step: f32) -> Result<Matrix> {
    check_step(step)?;
    let data = band
        .as_slice()
        .iter()
        .map(|&q| (q as f64 * step as f64) as f32)
        .collect();
    Matrix::from_vec(band.rows(), band.cols(), data)
}

/// Step size per subband.
///
/// A table either lists explicit steps or falls back to one uniform step
/// for subbands it does not list.
#[derive(Debug, Clone, PartialEq)]
pub struct StepTable {
    steps: BTreeMap<SubbandId, f32>,
    fallback: Option<f32>,
}

impl StepTable {
    /// One step for every subband.
    pub fn uniform(step: f32) -> Self {
        StepTable {
            steps: BTreeMap::new(),
            fallback: Some(step),
        }
    }

    /// The fixed policy: fine steps for the approximation, coarser steps
    /// for detail subbands, doubling per level towards the finest level,
    /// and `HH` twice as coarse as `LH`/`HL` of the same level.
    pub fn standard(levels: u8, base: f32) -> Self {
        let mut steps = BTreeMap::new();
        for id in SubbandId::canonical_order(levels) {
            let step = match id.kind {
                SubbandKind::LL => base,
                kind => {
                    let detail = base * (1u32 << (levels - id.level + 1).min(31)) as f32;
                    if kind == SubbandKind::HH { detail * 2.0 } else { detail }
                }
            };
            steps.insert(id, step);
        }
        StepTable {
            steps,
            fallback: None,
        }
    }

    /// Builds a table from explicit `(id, step)` pairs.
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (SubbandId, f32)>,
    {
        let mut steps = BTreeMap::new();
        for (id, step) in entries {
            check_step(step)?;
            if steps.insert(id, step).is_some() {
                return Err(CodecError::mismatch(format!("duplicate step for subband {}", id)));
            }
        }
        Ok(StepTable {
            steps,
            fallback: None,
        })
    }

    /// Overrides the step of one subband.
    pub fn with_step(mut self, id: SubbandId, step: f32) -> Self {
        self.steps.insert(id, step);
        self
    }

    /// Step for `id`; fails if the table has no entry and no fallback.
    pub fn step(&self, id: SubbandId) -> Result<f32> {
        self.steps
            .get(&id)
            .copied()
            .or(self.fallback)
            .ok_or_else(|| CodecError::mismatch(format!("no quantization step for subband {}", id)))
    }

    /// Steps for a list of subbands, in the same order.
    pub fn steps_for(&self, ids: &[SubbandId]) -> Result<Vec<f32>> {
        ids.iter().map(|&id| self.step(id)).collect()
    }

    /// Checks that every step the table can produce is usable.
    pub fn validate(&self) -> Result<()> {
        self.steps.values().chain(self.fallback.iter()).try_for_each(|&s| check_step(s))
    }
}

impl Default for StepTable {
    fn default() -> Self {
        StepTable::standard(2, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_rounds_to_nearest() {
        let m = Matrix::from_vec(1, 6, vec![0.4, 0.5, -0.5, 2.6, -7.49, 10.0]).unwrap();
        let q = quantize(&m, 1.0).unwrap();
        assert_eq!(q.as_slice(), &[0, 1, -1, 3, -7, 10]);
        let q = quantize(&m, 4.0).unwrap();
        assert_eq!(q.as_slice(), &[0, 0, 0, 1, -2, 3]);
    }

    #[test]
    fn test_error_bound() {
        let m = Matrix::from_fn(9, 9, |r, c| (r as f32 * 3.3 - c as f32 * 7.1) * 1.7);
        for step in [0.5f32, 1.0, 3.0, 16.0] {
            let back = dequantize(&quantize(&m, step).unwrap(), step).unwrap();
            let err = m.max_abs_diff(&back).unwrap();
            assert!(err <= step / 2.0 + 1e-4, "step {} error {}", step, err);
        }
    }

    #[test]
    fn test_rejects_bad_steps() {
        let m = Matrix::new(2, 2);
        for step in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            assert!(matches!(quantize(&m, step), Err(CodecError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_rejects_non_finite_coefficients() {
        let m = Matrix::from_vec(1, 2, vec![1.0, f32::NAN]).unwrap();
        assert!(quantize(&m, 1.0).is_err());
    }

    #[test]
    fn test_standard_policy() {
        let table = StepTable::standard(2, 1.0);
        let ll = SubbandId::new(2, SubbandKind::LL);
        let lh2 = SubbandId::new(2, SubbandKind::LH);
        let lh1 = SubbandId::new(1, SubbandKind::LH);
        let hh1 = SubbandId::new(1, SubbandKind::HH);
        assert_eq!(table.step(ll).unwrap(), 1.0);
        assert_eq!(table.step(lh2).unwrap(), 2.0);
        assert_eq!(table.step(lh1).unwrap(), 4.0);
        assert_eq!(table.step(hh1).unwrap(), 8.0);
        assert!(matches!(
            table.step(SubbandId::new(3, SubbandKind::HH)),
            Err(CodecError::ConfigMismatch(_))
        ));
    }

    #[test]
    fn test_uniform_and_override() {
        let id = SubbandId::new(1, SubbandKind::HL);
        let table = StepTable::uniform(2.5).with_step(id, 9.0);
        assert_eq!(table.step(id).unwrap(), 9.0);
        assert_eq!(table.step(SubbandId::new(4, SubbandKind::HH)).unwrap(), 2.5);
        assert!(StepTable::uniform(-1.0).validate().is_err());
    }

    #[test]
    fn test_from_entries_rejects_duplicates() {
        let id = SubbandId::new(1, SubbandKind::LL);
        assert!(StepTable::from_entries(vec![(id, 1.0), (id, 2.0)]).is_err());
    }
}
