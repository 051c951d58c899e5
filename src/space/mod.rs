// Search space modeling: domains, quantization and joint spaces
//
// Each input variable is bound to exactly one SearchSpace. Continuous spaces
// are never indexed directly; they are quantized into a fixed number of
// buckets first, and every consumer (aggregation, table layout, run-time
// encoding) goes through the same QuantizedSpace so bucket boundaries agree.
//
// Pipeline: builder (observed values -> SearchSpace) -> quantize
// (SearchSpace -> QuantizedSpace) -> combine (ordered product of spaces).

mod builder;
mod combine;
mod quantize;

pub use builder::{SpaceBuilder, CATEGORICAL_CUTOFF};
pub use combine::{combine, join, JointSpace};
pub use quantize::{quantize, Bound, QuantizedSpace, Spacing, DEFAULT_SLICES};

use crate::variable::Value;
use serde::{Deserialize, Serialize};

/// Domain of a single variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchSpace {
    /// No values; identity element of [`combine`]
    Empty,
    /// Unordered choices, stored sorted by value
    Categorical(Vec<Value>),
    /// Ordered choices, stored in declared order
    Ordinal(Vec<Value>),
    /// Half-open `[min, max)`, linearly sliced
    Interval { min: f64, max: f64 },
    /// Half-open `[min, max)`, geometrically sliced
    Ratio { min: f64, max: f64 },
}

impl SearchSpace {
    /// Interval and ratio spaces must be quantized before use
    pub fn is_continuous(&self) -> bool {
        matches!(self, Self::Interval { .. } | Self::Ratio { .. })
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Categorical(values) | Self::Ordinal(values) => values.is_empty(),
            Self::Interval { .. } | Self::Ratio { .. } => false,
        }
    }

    /// Number of buckets this space contributes once quantized
    pub fn cardinality(&self, slices: usize) -> usize {
        match self {
            Self::Empty => 0,
            Self::Categorical(values) | Self::Ordinal(values) => values.len(),
            Self::Interval { .. } | Self::Ratio { .. } => slices,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Categorical(_) => "categorical",
            Self::Ordinal(_) => "ordinal",
            Self::Interval { .. } => "interval",
            Self::Ratio { .. } => "ratio",
        }
    }
}
