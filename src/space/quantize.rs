// Quantization of continuous domains into ordered buckets
//
// Interval spaces are sliced linearly, ratio spaces geometrically:
//
//   linear:    rep(i) = min + i * (max - min) / slices
//   geometric: rep(i) = min * ratio^i,  ratio = exp((ln max - ln min) / slices)
//
// Bucket i is the half-open range [rep(i), rep(i + 1)); the last bucket ends
// at max. A ratio space whose minimum is not positive has no logarithm and is
// sliced linearly instead.
//
// Location estimates from floor() are corrected against the representatives
// themselves, so locate(rep(i)) == i holds despite floating-point rounding.

use super::SearchSpace;
use crate::variable::Value;
use serde::{Deserialize, Serialize};

/// Default number of buckets per continuous variable
pub const DEFAULT_SLICES: usize = 10;

/// How representatives are spaced
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Spacing {
    /// Discrete domain, representatives are the values themselves
    Identity,
    /// Constant bucket width
    Linear { step: f64 },
    /// Constant ratio between consecutive bucket edges
    Geometric { ratio: f64 },
}

/// Which edge of the domain a value fell outside of
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bound {
    BelowMin { min: f64 },
    AboveMax { max: f64 },
    NotInDomain,
    /// No value was supplied at all
    Missing,
}

impl std::fmt::Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowMin { min } => write!(f, "below minimum {}", min),
            Self::AboveMax { max } => write!(f, "at or above maximum {}", max),
            Self::NotInDomain => write!(f, "not a value of the domain"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// Read-only bucket view of a search space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuantizedSpace {
    spacing: Spacing,
    lower: f64,
    upper: f64,
    representatives: Vec<Value>,
}

/// Quantize `space` into at most `slices` buckets
///
/// Discrete spaces come back unchanged; `Empty` yields no buckets.
///
/// # Example
/// ```
/// use scholar::space::{quantize, SearchSpace, Spacing};
/// use scholar::variable::Value;
///
/// let q = quantize(&SearchSpace::Interval { min: 0.0, max: 10.0 }, 10);
/// assert_eq!(q.spacing(), Spacing::Linear { step: 1.0 });
/// assert_eq!(q.representatives()[4], Value::Continuous(4.0));
/// assert_eq!(q.locate(Value::Continuous(4.5)), Ok(4));
/// ```
pub fn quantize(space: &SearchSpace, slices: usize) -> QuantizedSpace {
    let slices = slices.max(1);
    match space {
        SearchSpace::Empty => QuantizedSpace::discrete(Vec::new()),
        SearchSpace::Categorical(values) | SearchSpace::Ordinal(values) => {
            QuantizedSpace::discrete(values.clone())
        }
        SearchSpace::Interval { min, max } => QuantizedSpace::linear(*min, *max, slices),
        SearchSpace::Ratio { min, max } => {
            if *min > 0.0 && max.is_finite() {
                QuantizedSpace::geometric(*min, *max, slices)
            } else {
                tracing::debug!(
                    "Ratio space [{}, {}) has no positive minimum, slicing linearly",
                    min,
                    max
                );
                QuantizedSpace::linear(*min, *max, slices)
            }
        }
    }
}

impl QuantizedSpace {
    fn discrete(values: Vec<Value>) -> Self {
        Self {
            spacing: Spacing::Identity,
            lower: 0.0,
            upper: 0.0,
            representatives: values,
        }
    }

    fn linear(lower: f64, upper: f64, slices: usize) -> Self {
        let step = (upper - lower) / slices as f64;
        let representatives = (0..slices)
            .map(|i| Value::Continuous(lower + i as f64 * step))
            .collect();
        Self {
            spacing: Spacing::Linear { step },
            lower,
            upper,
            representatives,
        }
    }

    fn geometric(lower: f64, upper: f64, slices: usize) -> Self {
        let ratio = ((upper.ln() - lower.ln()) / slices as f64).exp();
        let representatives = (0..slices)
            .map(|i| Value::Continuous(lower * ratio.powi(i as i32)))
            .collect();
        Self {
            spacing: Spacing::Geometric { ratio },
            lower,
            upper,
            representatives,
        }
    }

    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self.spacing, Spacing::Identity)
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        self.representatives.len()
    }

    pub fn is_empty(&self) -> bool {
        self.representatives.is_empty()
    }

    /// One representative per bucket (the bucket's lower edge when continuous)
    pub fn representatives(&self) -> &[Value] {
        &self.representatives
    }

    /// Lower edge of the domain (continuous spaces only)
    pub fn lower(&self) -> f64 {
        self.lower
    }

    /// Exclusive upper edge of the domain (continuous spaces only)
    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Bucket coordinate of `value`, rejecting anything outside the domain
    pub fn locate(&self, value: Value) -> Result<usize, Bound> {
        match self.spacing {
            Spacing::Identity => self
                .representatives
                .iter()
                .position(|r| *r == value)
                .ok_or(Bound::NotInDomain),
            _ => {
                let x = value.as_f64();
                if x >= self.upper {
                    return Err(Bound::AboveMax { max: self.upper });
                }
                self.locate_continuous(x)
            }
        }
    }

    /// Like [`locate`](Self::locate), but the top bucket accepts every value
    /// at or above its lower edge
    pub fn locate_saturating(&self, value: Value) -> Result<usize, Bound> {
        match self.spacing {
            Spacing::Identity => self.locate(value),
            _ => {
                let x = value.as_f64();
                if x >= self.upper && !self.representatives.is_empty() {
                    return Ok(self.representatives.len() - 1);
                }
                self.locate_continuous(x)
            }
        }
    }

    fn locate_continuous(&self, x: f64) -> Result<usize, Bound> {
        if x.is_nan() || self.representatives.is_empty() {
            return Err(Bound::NotInDomain);
        }
        if x < self.lower {
            return Err(Bound::BelowMin { min: self.lower });
        }

        let estimate = match self.spacing {
            Spacing::Linear { step } => ((x - self.lower) / step).floor(),
            Spacing::Geometric { ratio } => ((x / self.lower).ln() / ratio.ln()).floor(),
            Spacing::Identity => 0.0,
        };
        let last = self.representatives.len() - 1;
        let mut index = if estimate.is_finite() && estimate > 0.0 {
            (estimate as usize).min(last)
        } else {
            0
        };

        while index < last && x >= self.edge(index + 1) {
            index += 1;
        }
        while index > 0 && x < self.edge(index) {
            index -= 1;
        }
        Ok(index)
    }

    fn edge(&self, index: usize) -> f64 {
        self.representatives[index].as_f64()
    }
}
