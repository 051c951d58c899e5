// Search space construction from observed values
//
// Reclassification: a nominally continuous variable with few distinct
// observed values is stored as Categorical and never quantized. Boolean and
// text variables are always Categorical, since their stored integers have no
// metric meaning.

use super::SearchSpace;
use crate::variable::{StatisticalCategory, Value, Variable};
use std::collections::BTreeSet;

/// Continuous variables with at most this many distinct observations become categorical
pub const CATEGORICAL_CUTOFF: usize = 2;

/// Assigns a concrete [`SearchSpace`] to a variable
#[derive(Debug, Clone, Copy)]
pub struct SpaceBuilder {
    categorical_cutoff: usize,
}

impl Default for SpaceBuilder {
    fn default() -> Self {
        Self {
            categorical_cutoff: CATEGORICAL_CUTOFF,
        }
    }
}

impl SpaceBuilder {
    pub fn new(categorical_cutoff: usize) -> Self {
        Self { categorical_cutoff }
    }

    /// Build the space of `variable` from its observed values
    ///
    /// # Example
    /// ```
    /// use scholar::space::{SearchSpace, SpaceBuilder};
    /// use scholar::variable::{Role, StatisticalCategory, Value, ValueType, Variable};
    ///
    /// let size = Variable {
    ///     id: 1,
    ///     name: "size".into(),
    ///     value_type: ValueType::Float,
    ///     category: StatisticalCategory::Interval,
    ///     role: Role::Input,
    /// };
    /// let observed = [0.0, 3.0, 9.0].map(Value::Continuous);
    /// let space = SpaceBuilder::default().build(&size, &observed);
    /// assert_eq!(space, SearchSpace::Interval { min: 0.0, max: 10.0 });
    /// ```
    pub fn build(&self, variable: &Variable, observed: &[Value]) -> SearchSpace {
        self.build_with_candidates(variable, observed, None)
    }

    /// Build a space, letting an ordinal variable use its declared candidate order
    pub fn build_with_candidates(
        &self,
        variable: &Variable,
        observed: &[Value],
        declared: Option<&[Value]>,
    ) -> SearchSpace {
        if !variable.value_type.is_metric() {
            return categorical(observed);
        }

        match variable.category {
            StatisticalCategory::Categorical => categorical(observed),
            StatisticalCategory::Ordinal => {
                let source = match declared {
                    Some(candidates) if !candidates.is_empty() => candidates,
                    _ => observed,
                };
                let values = first_occurrences(source);
                if values.is_empty() {
                    SearchSpace::Empty
                } else {
                    SearchSpace::Ordinal(values)
                }
            }
            StatisticalCategory::Interval | StatisticalCategory::Ratio => {
                self.continuous(variable, observed)
            }
        }
    }

    fn continuous(&self, variable: &Variable, observed: &[Value]) -> SearchSpace {
        let distinct: Vec<Value> = observed
            .iter()
            .copied()
            .filter(|v| v.as_f64().is_finite())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let (first, last) = match (distinct.first(), distinct.last()) {
            (Some(&first), Some(&last)) => (first, last),
            _ => return SearchSpace::Empty,
        };

        if distinct.len() <= self.categorical_cutoff {
            tracing::debug!(
                "Variable {} ({}) has {} distinct values, treating as categorical",
                variable.id,
                variable.name,
                distinct.len()
            );
            return SearchSpace::Categorical(distinct);
        }

        let min = first.as_f64();
        let max = last.as_f64();
        if min >= max {
            return SearchSpace::Categorical(vec![first]);
        }

        // +1 pads the observed maximum so the last half-open bucket holds it
        let max = max + 1.0;
        match variable.category {
            StatisticalCategory::Ratio => SearchSpace::Ratio { min, max },
            _ => SearchSpace::Interval { min, max },
        }
    }
}

fn categorical(observed: &[Value]) -> SearchSpace {
    let values: Vec<Value> = observed
        .iter()
        .copied()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if values.is_empty() {
        SearchSpace::Empty
    } else {
        SearchSpace::Categorical(values)
    }
}

/// Drop repeats, keeping each value where it first appears
fn first_occurrences(values: &[Value]) -> Vec<Value> {
    let mut seen = BTreeSet::new();
    values.iter().copied().filter(|v| seen.insert(*v)).collect()
}
