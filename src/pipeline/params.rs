// src/pipeline/params.rs

use crate::encode::dwt::{SubbandId, SubbandKind};
use crate::encode::quant::StepTable;
use crate::utils::error::{CodecError, Result};

/// Default number of decomposition levels.
pub const DEFAULT_LEVELS: usize = 2;

/// Configuration for encoding one or more channels.
#[derive(Debug, Clone, PartialEq)]
pub struct CodecParams {
    /// Number of wavelet decomposition levels (default: 2)
    pub levels: usize,
    /// Quantization step per subband; must cover every subband of `levels`
    pub steps: StepTable,
}

impl Default for CodecParams {
    fn default() -> Self {
        Self {
            levels: DEFAULT_LEVELS,
            steps: StepTable::standard(DEFAULT_LEVELS as u8, 1.0),
        }
    }
}

impl CodecParams {
    pub fn new(levels: usize, steps: StepTable) -> Self {
        Self { levels, steps }
    }

    /// Sets the level count and regenerates the standard step policy for it,
    /// keeping the current approximation step as the base.
    pub fn with_levels(mut self, levels: usize) -> Self {
        let base = self
            .steps
            .step(SubbandId::new(self.levels as u8, SubbandKind::LL))
            .unwrap_or(1.0);
        self.levels = levels;
        self.steps = StepTable::standard(levels.min(u8::MAX as usize) as u8, base);
        self
    }

    /// Replaces the step table with the standard policy around `base`.
    pub fn with_base_step(mut self, base: f32) -> Self {
        self.steps = StepTable::standard(self.levels.min(u8::MAX as usize) as u8, base);
        self
    }

    /// Replaces the step table.
    pub fn with_steps(mut self, steps: StepTable) -> Self {
        self.steps = steps;
        self
    }

    /// Checks the level count and that every subband has a usable step.
    pub fn validate(&self) -> Result<()> {
        if self.levels == 0 || self.levels > u8::MAX as usize {
            return Err(CodecError::InvalidArgument(format!(
                "levels must be in 1..={}, got {}",
                u8::MAX,
                self.levels
            )));
        }
        self.steps.validate()?;
        self.steps
            .steps_for(&SubbandId::canonical_order(self.levels as u8))
            .map(|_| ())
    }
}
