// Ordered Cartesian product of search spaces
//
// Laws:
//   combine(Empty, S) == S == combine(S, Empty)
//   |combine(A, B)| == |A| * |B|
//   combine is associative (tuples are flattened, never nested)
//   combine is NOT commutative: the left operand varies slowest

use super::{quantize, QuantizedSpace, SearchSpace};
use crate::variable::Value;

/// A discrete space whose elements are fixed-length tuples (buckets)
#[derive(Debug, Clone, PartialEq)]
pub enum JointSpace {
    /// Identity element of [`combine`]
    Empty,
    /// Tuples of `arity` coordinates, in enumeration order
    Tuples {
        arity: usize,
        elements: Vec<Vec<Value>>,
    },
}

impl JointSpace {
    /// Quantize a single space and wrap each representative in a 1-tuple
    pub fn lift(space: &SearchSpace, slices: usize) -> Self {
        Self::from_quantized(&quantize(space, slices))
    }

    pub fn from_quantized(space: &QuantizedSpace) -> Self {
        if space.is_empty() {
            return Self::Empty;
        }
        Self::Tuples {
            arity: 1,
            elements: space.representatives().iter().map(|&v| vec![v]).collect(),
        }
    }

    /// Number of buckets
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Tuples { elements, .. } => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Coordinates per bucket
    pub fn arity(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Tuples { arity, .. } => *arity,
        }
    }

    pub fn elements(&self) -> &[Vec<Value>] {
        match self {
            Self::Empty => &[],
            Self::Tuples { elements, .. } => elements,
        }
    }

    pub fn into_elements(self) -> Vec<Vec<Value>> {
        match self {
            Self::Empty => Vec::new(),
            Self::Tuples { elements, .. } => elements,
        }
    }
}

/// Ordered binary product; every `a` is paired with every `b`, `a` outermost
///
/// # Example
/// ```
/// use scholar::space::{combine, JointSpace, SearchSpace};
/// use scholar::variable::Value;
///
/// let a = JointSpace::lift(&SearchSpace::Categorical(vec![Value::Discrete(0), Value::Discrete(1)]), 10);
/// let b = JointSpace::lift(&SearchSpace::Interval { min: 0.0, max: 3.0 }, 3);
/// let ab = combine(&a, &b);
/// assert_eq!(ab.len(), 6);
/// assert_eq!(ab.elements()[1], vec![Value::Discrete(0), Value::Continuous(1.0)]);
/// ```
pub fn combine(a: &JointSpace, b: &JointSpace) -> JointSpace {
    match (a, b) {
        (JointSpace::Empty, other) | (other, JointSpace::Empty) => other.clone(),
        (
            JointSpace::Tuples {
                arity: left_arity,
                elements: left,
            },
            JointSpace::Tuples {
                arity: right_arity,
                elements: right,
            },
        ) => {
            let mut elements = Vec::with_capacity(left.len() * right.len());
            for l in left {
                for r in right {
                    let mut tuple = Vec::with_capacity(left_arity + right_arity);
                    tuple.extend_from_slice(l);
                    tuple.extend_from_slice(r);
                    elements.push(tuple);
                }
            }
            JointSpace::Tuples {
                arity: left_arity + right_arity,
                elements,
            }
        }
    }
}

/// Left fold of [`combine`] over quantized spaces, starting from `Empty`
pub fn join<'a, I>(spaces: I) -> JointSpace
where
    I: IntoIterator<Item = &'a QuantizedSpace>,
{
    spaces.into_iter().fold(JointSpace::Empty, |acc, space| {
        combine(&acc, &JointSpace::from_quantized(space))
    })
}
