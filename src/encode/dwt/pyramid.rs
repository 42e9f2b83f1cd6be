// src/encode/dwt/pyramid.rs

//! Multi-level wavelet decomposition and reconstruction.
//!
//! Level 1 is the finest level (the first decomposition of the image),
//! level `L` the coarsest. Only the coarsest approximation (`LL` of level `L`)
//! is kept; every intermediate `LL` is consumed by the next level.
//!
//! Before each level, the input is padded to even dimensions by duplicating
//! its last row and/or column. This is separate from the periodic extension
//! inside the filter bank. Reconstruction crops the recombined `LL` back to
//! the recorded pre-padding size before moving to the next finer level.

use std::fmt;

use log::trace;

use super::transform::{Decode, Encode, Subbands};
use crate::image::Matrix;
use crate::utils::error::{CodecError, Result};

/// Smallest even input size the 4-tap filter bank accepts.
const MIN_LEVEL_INPUT: usize = 4;

/// Which quadrant of a decomposition level a subband holds.
///
/// First letter = row (horizontal) filter, second letter = column filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SubbandKind {
    LL,
    LH,
    HL,
    HH,
}

impl SubbandKind {
    /// Detail subbands in their canonical order within a level.
    pub const DETAIL: [SubbandKind; 3] = [SubbandKind::LH, SubbandKind::HL, SubbandKind::HH];

    pub fn to_u8(self) -> u8 {
        match self {
            SubbandKind::LL => 0,
            SubbandKind::LH => 1,
            SubbandKind::HL => 2,
            SubbandKind::HH => 3,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(SubbandKind::LL),
            1 => Some(SubbandKind::LH),
            2 => Some(SubbandKind::HL),
            3 => Some(SubbandKind::HH),
            _ => None,
        }
    }
}

/// Identifies one subband of a pyramid: decomposition level and quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubbandId {
    pub level: u8,
    pub kind: SubbandKind,
}

impl SubbandId {
    pub fn new(level: u8, kind: SubbandKind) -> Self {
        SubbandId { level, kind }
    }

    /// All subband ids of an `levels`-deep pyramid in canonical order:
    /// coarsest `LL` first, then detail levels from coarsest to finest,
    /// each as `LH`, `HL`, `HH`.
    pub fn canonical_order(levels: u8) -> Vec<SubbandId> {
        let mut ids = Vec::with_capacity(3 * levels as usize + 1);
        if levels == 0 {
            return ids;
        }
        ids.push(SubbandId::new(levels, SubbandKind::LL));
        for level in (1..=levels).rev() {
            for kind in SubbandKind::DETAIL {
                ids.push(SubbandId::new(level, kind));
            }
        }
        ids
    }
}

impl fmt::Display for SubbandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{}", self.kind, self.level)
    }
}

/// The detail subbands of one decomposition level.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailLevel {
    /// Dimensions of this level's input before even-padding.
    pub source_dims: (usize, usize),
    pub lh: Matrix,
    pub hl: Matrix,
    pub hh: Matrix,
}

impl DetailLevel {
    /// Shape shared by the three detail subbands.
    pub fn dims(&self) -> (usize, usize) {
        self.lh.dims()
    }

    /// Dimensions of this level's input after even-padding.
    pub fn padded_dims(&self) -> (usize, usize) {
        let (rows, cols) = self.dims();
        (rows * 2, cols * 2)
    }

    pub fn get(&self, kind: SubbandKind) -> Option<&Matrix> {
        match kind {
            SubbandKind::LL => None,
            SubbandKind::LH => Some(&self.lh),
            SubbandKind::HL => Some(&self.hl),
            SubbandKind::HH => Some(&self.hh),
        }
    }
}

fn even_up(n: usize) -> usize {
    n + n % 2
}

/// A multi-level wavelet decomposition of one channel.
#[derive(Debug, Clone, PartialEq)]
pub struct Pyramid {
    approx: Matrix,
    /// Finest level first.
    levels: Vec<DetailLevel>,
}

impl Pyramid {
    /// Assembles a pyramid from its parts, checking that every level's
    /// shapes agree with its neighbours.
    pub fn new(approx: Matrix, levels: Vec<DetailLevel>) -> Result<Self> {
        if levels.is_empty() {
            return Err(CodecError::shape("a pyramid needs at least one level"));
        }
        for (i, level) in levels.iter().enumerate() {
            let dims = level.dims();
            if level.hl.dims() != dims || level.hh.dims() != dims {
                return Err(CodecError::shape(format!(
                    "detail subbands of level {} disagree in shape",
                    i + 1
                )));
            }
            let (src_rows, src_cols) = level.source_dims;
            let expected = (even_up(src_rows) / 2, even_up(src_cols) / 2);
            if dims != expected {
                return Err(CodecError::shape(format!(
                    "level {} subbands are {}x{} but a {}x{} input yields {}x{}",
                    i + 1,
                    dims.0,
                    dims.1,
                    src_rows,
                    src_cols,
                    expected.0,
                    expected.1
                )));
            }
            if i > 0 && level.source_dims != levels[i - 1].dims() {
                return Err(CodecError::shape(format!(
                    "level {} input does not match level {} subband shape",
                    i + 1,
                    i
                )));
            }
        }
        let coarsest = levels[levels.len() - 1].dims();
        if approx.dims() != coarsest {
            return Err(CodecError::shape(format!(
                "approximation is {}x{} but coarsest level is {}x{}",
                approx.rows(),
                approx.cols(),
                coarsest.0,
                coarsest.1
            )));
        }
        Ok(Pyramid { approx, levels })
    }

    /// Number of levels that can be taken from a `rows x cols` input.
    pub fn max_levels(rows: usize, cols: usize) -> usize {
        let (mut rows, mut cols) = (rows, cols);
        let mut levels = 0;
        loop {
            let (r, c) = (even_up(rows), even_up(cols));
            if r < MIN_LEVEL_INPUT || c < MIN_LEVEL_INPUT {
                return levels;
            }
            levels += 1;
            rows = r / 2;
            cols = c / 2;
        }
    }

    /// Decomposes `image` into `levels` levels.
    pub fn decompose(image: &Matrix, levels: usize) -> Result<Self> {
        if levels == 0 {
            return Err(CodecError::InvalidArgument(
                "decomposition needs at least one level".to_string(),
            ));
        }
        if levels > u8::MAX as usize {
            return Err(CodecError::InvalidArgument(format!(
                "{} levels exceeds the supported maximum of {}",
                levels,
                u8::MAX
            )));
        }
        let max = Self::max_levels(image.rows(), image.cols());
        if levels > max {
            return Err(CodecError::shape(format!(
                "a {}x{} input supports at most {} levels, {} requested",
                image.rows(),
                image.cols(),
                max,
                levels
            )));
        }

        let mut details = Vec::with_capacity(levels);
        let mut current = image.pad_even();
        let mut source_dims = image.dims();
        let mut approx = Matrix::new(0, 0);
        for level in 1..=levels {
            let Subbands { ll, lh, hl, hh } = Encode::forward(&current)?;
            trace!(
                "level {}: {}x{} -> {}x{} subbands",
                level,
                current.rows(),
                current.cols(),
                ll.rows(),
                ll.cols()
            );
            details.push(DetailLevel {
                source_dims,
                lh,
                hl,
                hh,
            });
            source_dims = ll.dims();
            current = ll.pad_even();
            approx = ll;
        }
        Pyramid::new(approx, details)
    }

    /// Reconstructs the level-1 input (at its padded size) from all subbands.
    pub fn reconstruct(self) -> Result<Matrix> {
        let mut ll = self.approx;
        let count = self.levels.len();
        for (i, level) in self.levels.into_iter().enumerate().rev() {
            if ll.dims() != level.dims() {
                ll = ll.crop(level.dims().0, level.dims().1)?;
            }
            let DetailLevel { lh, hl, hh, .. } = level;
            ll = Decode::backward(&Subbands { ll, lh, hl, hh })?;
            trace!(
                "level {} of {} reconstructed to {}x{}",
                i + 1,
                count,
                ll.rows(),
                ll.cols()
            );
        }
        Ok(ll)
    }

    /// The coarsest approximation subband.
    pub fn approx(&self) -> &Matrix {
        &self.approx
    }

    /// Detail levels, finest first.
    pub fn levels(&self) -> &[DetailLevel] {
        &self.levels
    }

    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Looks up one subband by id.
    pub fn subband(&self, id: SubbandId) -> Option<&Matrix> {
        let level = id.level as usize;
        if level == 0 || level > self.levels.len() {
            return None;
        }
        match id.kind {
            SubbandKind::LL if level == self.levels.len() => Some(&self.approx),
            SubbandKind::LL => None,
            kind => self.levels[level - 1].get(kind),
        }
    }

    /// All subbands in canonical order.
    pub fn subbands(&self) -> Vec<(SubbandId, &Matrix)> {
        SubbandId::canonical_order(self.levels.len() as u8)
            .into_iter()
            .filter_map(|id| self.subband(id).map(|m| (id, m)))
            .collect()
    }
}
