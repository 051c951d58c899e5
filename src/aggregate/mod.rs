// Trial aggregation: historical trials -> best output combination per bucket
//
// Algorithm:
// 1. Each trial's input values are located in the problem's quantized axes
//    (top continuous bucket saturates, absorbing the +1 domain padding).
// 2. Trials are grouped by (table index, raw output values) and each group is
//    scored with the configured central tendency.
// 3. Per table index the best-scoring group wins. Equal scores go to the
//    group containing the lowest trial id.
//
// Buckets without trials get no winner here; the table builder turns that
// absence into NoData.

mod tendency;

pub use tendency::{median, spread, CentralTendency, OptimizationGoal};

use crate::catalog::{Catalog, Problem};
use crate::encoding::Encoder;
use crate::error::Result;
use crate::variable::{TrialId, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Best output combination observed in one bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    /// Output values in the problem's declared output order
    pub outputs: Vec<Value>,
    pub score: f64,
    /// Trials in the winning group
    pub trials: usize,
    pub spread: f64,
    /// Lowest trial id of the winning group
    pub first_trial: TrialId,
}

/// Outcome of aggregating one problem
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregation {
    /// Winners keyed by table index
    pub winners: BTreeMap<usize, Winner>,
    pub trials_used: usize,
    pub trials_skipped: usize,
}

impl Aggregation {
    pub fn winner(&self, index: usize) -> Option<&Winner> {
        self.winners.get(&index)
    }
}

#[derive(Debug)]
struct Group {
    results: Vec<f64>,
    first_trial: TrialId,
}

/// In-memory group-by over a problem's trials
#[derive(Debug, Clone, Copy)]
pub struct TrialAggregator<'a> {
    catalog: &'a Catalog,
    tendency: CentralTendency,
    goal: OptimizationGoal,
}

impl<'a> TrialAggregator<'a> {
    pub fn new(catalog: &'a Catalog, tendency: CentralTendency, goal: OptimizationGoal) -> Self {
        Self {
            catalog,
            tendency,
            goal,
        }
    }

    /// Select the winning output combination of every bucket that has trials
    pub fn aggregate(&self, problem: &Problem, encoder: &Encoder) -> Result<Aggregation> {
        let mut groups: BTreeMap<(usize, Vec<Value>), Group> = BTreeMap::new();
        let mut aggregation = Aggregation::default();

        for trial in self.catalog.trials(problem.id) {
            if !trial.result.is_finite() {
                debug!("Trial {} has non-finite result, skipping", trial.id);
                aggregation.trials_skipped += 1;
                continue;
            }
            let (inputs, outputs) = match (
                trial.values_of(&problem.inputs),
                trial.values_of(&problem.outputs),
            ) {
                (Some(inputs), Some(outputs)) => (inputs, outputs),
                _ => {
                    debug!("Trial {} is missing values, skipping", trial.id);
                    aggregation.trials_skipped += 1;
                    continue;
                }
            };
            let Some(index) = bucket_of(encoder, &inputs) else {
                debug!("Trial {} falls outside the input space, skipping", trial.id);
                aggregation.trials_skipped += 1;
                continue;
            };

            aggregation.trials_used += 1;
            groups
                .entry((index, outputs))
                .or_insert_with(|| Group {
                    results: Vec::new(),
                    first_trial: trial.id,
                })
                .results
                .push(trial.result);
        }

        for ((index, outputs), group) in groups {
            let score = self.tendency.summarize(&group.results)?;
            if !score.is_finite() {
                warn!(
                    "Problem {} bucket {} scored {}, ignoring group",
                    problem.id, index, score
                );
                continue;
            }
            let candidate = Winner {
                outputs,
                score,
                trials: group.results.len(),
                spread: spread(&group.results),
                first_trial: group.first_trial,
            };
            match aggregation.winners.get(&index) {
                Some(incumbent) if !self.beats(&candidate, incumbent) => {}
                _ => {
                    aggregation.winners.insert(index, candidate);
                }
            }
        }

        Ok(aggregation)
    }

    fn beats(&self, candidate: &Winner, incumbent: &Winner) -> bool {
        if candidate.score == incumbent.score {
            candidate.first_trial < incumbent.first_trial
        } else {
            self.goal.prefers(candidate.score, incumbent.score)
        }
    }
}

/// Table index of a trial's inputs (declared order); the top bucket saturates
fn bucket_of(encoder: &Encoder, inputs: &[Value]) -> Option<usize> {
    encoder.axes().iter().try_fold(0, |index, axis| {
        let value = *inputs.get(axis.declared_index)?;
        let coordinate = axis.space.locate_saturating(value).ok()?;
        Some(index + coordinate * axis.stride)
    })
}
