use crate::decimal::RoundingMode;

pub const DEFAULT_SCALE: u32 = 10;
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// Knobs for evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EvalConfig {
    /// Fraction digits kept on every quotient.
    pub scale: u32,
    pub rounding: RoundingMode,
    /// Deepest bracket nesting the evaluator will recurse into.
    pub max_depth: usize,
}

impl Default for EvalConfig {
    fn default() -> Self {
        EvalConfig {
            scale: DEFAULT_SCALE,
            rounding: RoundingMode::default(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl EvalConfig {
    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}
