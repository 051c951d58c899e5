//! Mixed-radix lookup encoding
//!
//! A problem's inputs become the axes of a dense table. Axes are laid out
//! discrete-first (categorical/ordinal, then interval/ratio), each group in
//! declared order. Strides come from folding that layout in reverse: the last
//! axis has stride 1 and every earlier axis strides over all later ones.
//!
//! ```text
//! layout:   [mode (3)] [size (10)] [ratio (10)]
//! strides:      100         10          1
//! index   = 100 * c_mode + 10 * c_size + c_ratio
//! ```
//!
//! Enumerating the joint space by left-folding `combine` over the same layout
//! visits buckets in exactly index order, which is what makes
//! `decode(encode(x)) == x` hold for the emitted table.

use crate::error::{CompileError, Result};
use crate::space::{Bound, QuantizedSpace};
use crate::variable::{ProblemId, Value, VariableId};
use serde::{Deserialize, Serialize};

/// One table axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub variable: VariableId,
    /// Position of the variable in the problem's declared input list
    pub declared_index: usize,
    pub space: QuantizedSpace,
    pub stride: usize,
}

impl Axis {
    pub fn radix(&self) -> usize {
        self.space.len()
    }
}

/// A run-time input that has no bucket
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("input variable {variable} value {value:?} is {bound}")]
pub struct OutOfRange {
    pub variable: VariableId,
    /// `None` when the value was absent
    pub value: Option<Value>,
    pub bound: Bound,
}

/// Stride table plus the quantized space of every axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encoder {
    axes: Vec<Axis>,
    size: usize,
}

impl Encoder {
    /// Lay out `inputs` (given in declared order) and assign strides
    ///
    /// # Errors
    /// `TableTooLarge` if the product of radices overflows `usize`.
    pub fn new(problem: ProblemId, inputs: Vec<(VariableId, QuantizedSpace)>) -> Result<Self> {
        let (discrete, continuous): (Vec<_>, Vec<_>) = inputs
            .into_iter()
            .enumerate()
            .partition(|(_, (_, space))| space.is_discrete());

        let mut axes: Vec<Axis> = discrete
            .into_iter()
            .chain(continuous)
            .map(|(declared_index, (variable, space))| Axis {
                variable,
                declared_index,
                space,
                stride: 0,
            })
            .collect();

        let mut size: usize = 1;
        for axis in axes.iter_mut().rev() {
            axis.stride = size;
            size = size
                .checked_mul(axis.radix())
                .ok_or(CompileError::TableTooLarge { problem })?;
        }

        Ok(Self { axes, size })
    }

    /// Check a deserialized encoder against the layout rules `new` applies
    ///
    /// Strides must be the reverse fold of the radices, the size their
    /// product, and the declared indices a permutation of the axes.
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| Err(CompileError::MalformedTable(reason));

        let mut size: usize = 1;
        for axis in self.axes.iter().rev() {
            if axis.stride != size {
                return malformed(format!(
                    "axis {} has stride {}, expected {}",
                    axis.variable, axis.stride, size
                ));
            }
            size = match size.checked_mul(axis.radix()) {
                Some(size) => size,
                None => return malformed("table size overflows".to_string()),
            };
        }
        if size != self.size {
            return malformed(format!(
                "encoder size {} does not match its axes ({})",
                self.size, size
            ));
        }

        let mut seen = vec![false; self.axes.len()];
        for axis in &self.axes {
            match seen.get_mut(axis.declared_index) {
                Some(slot) if !*slot => *slot = true,
                _ => {
                    return malformed(format!(
                        "axis {} has invalid declared index {}",
                        axis.variable, axis.declared_index
                    ))
                }
            }
        }
        Ok(())
    }

    /// Axes in layout order
    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    /// Number of table entries
    pub fn size(&self) -> usize {
        self.size
    }

    /// Quantized spaces in layout order, for enumerating the joint space
    pub fn layout(&self) -> impl Iterator<Item = &QuantizedSpace> {
        self.axes.iter().map(|axis| &axis.space)
    }

    /// Table index of a bucket given input values in declared order
    ///
    /// # Example
    /// ```
    /// use scholar::encoding::Encoder;
    /// use scholar::space::{quantize, SearchSpace};
    /// use scholar::variable::Value;
    ///
    /// let x = quantize(&SearchSpace::Interval { min: 0.0, max: 10.0 }, 10);
    /// let mode = quantize(&SearchSpace::Categorical(vec![Value::Discrete(0), Value::Discrete(1)]), 10);
    /// let encoder = Encoder::new(1, vec![(7, x), (8, mode)])?;
    ///
    /// // categorical `mode` is laid out first, so it carries stride 10
    /// let index = encoder.encode(&[Value::Continuous(4.5), Value::Discrete(1)]).unwrap();
    /// assert_eq!(index, 14);
    /// assert_eq!(encoder.decode(index)?, vec![1, 4]);
    /// # Ok::<(), scholar::error::CompileError>(())
    /// ```
    pub fn encode(&self, inputs: &[Value]) -> std::result::Result<usize, OutOfRange> {
        self.encode_with(|axis| inputs.get(axis.declared_index).copied())
    }

    /// Encode with values supplied per axis; allocation-free
    pub fn encode_with<F>(&self, mut value_of: F) -> std::result::Result<usize, OutOfRange>
    where
        F: FnMut(&Axis) -> Option<Value>,
    {
        let mut index: usize = 0;
        for axis in &self.axes {
            let value = value_of(axis).ok_or(OutOfRange {
                variable: axis.variable,
                value: None,
                bound: Bound::Missing,
            })?;
            let miss = |bound| OutOfRange {
                variable: axis.variable,
                value: Some(value),
                bound,
            };
            let coordinate = axis.space.locate(value).map_err(miss)?;
            index = coordinate
                .checked_mul(axis.stride)
                .and_then(|offset| index.checked_add(offset))
                .filter(|&index| index < self.size)
                .ok_or(miss(Bound::NotInDomain))?;
        }
        Ok(index)
    }

    /// Table index of a bucket given values in layout order
    pub fn encode_layout(&self, values: &[Value]) -> std::result::Result<usize, OutOfRange> {
        let mut values = values.iter().copied();
        self.encode_with(|_| values.next())
    }

    /// Table index of layout-ordered coordinates
    pub fn index_of(&self, coordinates: &[usize]) -> usize {
        self.axes
            .iter()
            .zip(coordinates)
            .fold(0usize, |index, (axis, c)| {
                index.saturating_add(c.saturating_mul(axis.stride))
            })
    }

    /// Layout-ordered coordinates of a table index
    pub fn decode(&self, index: usize) -> Result<Vec<usize>> {
        if index >= self.size {
            return Err(CompileError::IndexOutOfBounds {
                index,
                size: self.size,
            });
        }
        let mut rest = index;
        self.axes
            .iter()
            .map(|axis| -> Result<usize> {
                let coordinate = rest.checked_div(axis.stride).ok_or_else(|| {
                    CompileError::MalformedTable(format!("axis {} has stride 0", axis.variable))
                })?;
                rest %= axis.stride;
                Ok(coordinate)
            })
            .collect()
    }

    /// Representative values of a bucket, in layout order
    pub fn representatives(&self, coordinates: &[usize]) -> Vec<Value> {
        self.axes
            .iter()
            .zip(coordinates)
            .filter_map(|(axis, &c)| axis.space.representatives().get(c).copied())
            .collect()
    }
}
