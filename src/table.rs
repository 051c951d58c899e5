//! Dense decision table: one entry per bucket of a problem's joint input space
//!
//! Entry `i` belongs to the bucket the encoder maps to index `i`. Buckets no
//! trial landed in hold [`Entry::NoData`], which no output vector can equal.

use crate::aggregate::Aggregation;
use crate::catalog::{Catalog, Problem};
use crate::encoding::Encoder;
use crate::error::{CompileError, Result};
use crate::space::join;
use crate::variable::{ProblemId, Value, ValueType, VariableId};
use serde::{Deserialize, Serialize};

/// Typed, named position in a problem's input or output vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub variable: VariableId,
    pub name: String,
    pub value_type: ValueType,
}

/// Content of one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entry {
    /// Recommended outputs in declared output order, with the group score
    Outputs { values: Vec<Value>, score: f64 },
    /// No historical trial fell in this bucket
    NoData,
}

impl Entry {
    pub fn outputs(&self) -> Option<&[Value]> {
        match self {
            Self::Outputs { values, .. } => Some(values),
            Self::NoData => None,
        }
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, Self::NoData)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTable {
    pub problem: ProblemId,
    pub encoder: Encoder,
    /// Inputs in declared order
    pub inputs: Vec<Slot>,
    /// Outputs in declared order
    pub outputs: Vec<Slot>,
    pub entries: Vec<Entry>,
}

impl DecisionTable {
    /// Fill every bucket from the aggregation's winners
    ///
    /// Buckets are visited by enumerating the joint space of the encoder's
    /// layout; each bucket's representatives must encode back to its position.
    pub fn build(
        catalog: &Catalog,
        problem: &Problem,
        encoder: Encoder,
        aggregation: &Aggregation,
    ) -> Result<Self> {
        let joint = join(encoder.layout());
        if joint.len() != encoder.size() {
            return Err(CompileError::MalformedTable(format!(
                "joint space of problem {} has {} buckets, encoder expects {}",
                problem.id,
                joint.len(),
                encoder.size()
            )));
        }

        let mut entries = Vec::with_capacity(encoder.size());
        for (position, bucket) in joint.into_elements().into_iter().enumerate() {
            if encoder.encode_layout(&bucket) != Ok(position) {
                return Err(CompileError::MalformedTable(format!(
                    "bucket {} of problem {} does not encode to its position",
                    position, problem.id
                )));
            }
            entries.push(match aggregation.winner(position) {
                Some(winner) => Entry::Outputs {
                    values: winner.outputs.clone(),
                    score: winner.score,
                },
                None => Entry::NoData,
            });
        }

        let table = Self {
            problem: problem.id,
            inputs: slots(catalog, problem, &problem.inputs)?,
            outputs: slots(catalog, problem, &problem.outputs)?,
            encoder,
            entries,
        };
        table.validate()?;
        Ok(table)
    }

    /// Structural invariants every table must hold before it is queried
    pub fn validate(&self) -> Result<()> {
        let malformed = |reason: String| Err(CompileError::MalformedTable(reason));

        self.encoder.validate()?;
        if self.entries.len() != self.encoder.size() {
            return malformed(format!(
                "{} entries for {} buckets",
                self.entries.len(),
                self.encoder.size()
            ));
        }
        if self.inputs.len() != self.encoder.axes().len() {
            return malformed(format!(
                "{} input slots for {} axes",
                self.inputs.len(),
                self.encoder.axes().len()
            ));
        }
        for axis in self.encoder.axes() {
            match self.inputs.get(axis.declared_index) {
                Some(slot) if slot.variable == axis.variable => {}
                _ => return malformed(format!("axis {} has no matching input slot", axis.variable)),
            }
        }
        for (index, entry) in self.entries.iter().enumerate() {
            if let Some(values) = entry.outputs() {
                if values.len() != self.outputs.len() {
                    return malformed(format!(
                        "entry {} has {} outputs, expected {}",
                        index,
                        values.len(),
                        self.outputs.len()
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn entry(&self, index: usize) -> Option<&Entry> {
        self.entries.get(index)
    }

    /// Buckets holding a recommendation
    pub fn filled(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_no_data()).count()
    }

    pub fn no_data(&self) -> usize {
        self.size() - self.filled()
    }
}

fn slots(catalog: &Catalog, problem: &Problem, ids: &[VariableId]) -> Result<Vec<Slot>> {
    ids.iter()
        .map(|&id| {
            let variable = catalog.variable(id).ok_or(CompileError::UnknownVariable {
                problem: problem.id,
                variable: id,
            })?;
            Ok(Slot {
                variable: id,
                name: variable.name.clone(),
                value_type: variable.value_type,
            })
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::space::{quantize, SearchSpace};

    pub const X: VariableId = 1;
    pub const Y: VariableId = 2;
    pub const MODE: VariableId = 3;

    /// Inputs `[x: Interval(0,10), mode: Categorical{0,1}]`, output `y`;
    /// every third bucket is empty, the rest recommend `y = index`
    pub fn two_input_table() -> DecisionTable {
        let x = quantize(&SearchSpace::Interval { min: 0.0, max: 10.0 }, 10);
        let mode = quantize(
            &SearchSpace::Categorical(vec![Value::Discrete(0), Value::Discrete(1)]),
            10,
        );
        let encoder = Encoder::new(7, vec![(X, x), (MODE, mode)]).unwrap();
        let entries = (0..encoder.size())
            .map(|i| {
                if i % 3 == 0 {
                    Entry::NoData
                } else {
                    Entry::Outputs {
                        values: vec![Value::Discrete(i as i64)],
                        score: i as f64,
                    }
                }
            })
            .collect();
        DecisionTable {
            problem: 7,
            encoder,
            inputs: vec![
                Slot {
                    variable: X,
                    name: "x".into(),
                    value_type: ValueType::Float,
                },
                Slot {
                    variable: MODE,
                    name: "mode".into(),
                    value_type: ValueType::Integer,
                },
            ],
            outputs: vec![Slot {
                variable: Y,
                name: "y".into(),
                value_type: ValueType::Integer,
            }],
            entries,
        }
    }
}
