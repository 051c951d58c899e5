//! Run-time lookup over a compiled artifact
//!
//! The host supplies a context of id-tagged typed input values and a set of
//! id-tagged output slots. The lookup either fills every slot with the
//! recommended configuration or returns a [`NoRecommendation`] explaining the
//! miss. It never panics on host input, never allocates on the
//! `encode`/`recommend_into` path and never mutates the table, so one
//! `Lookup` can serve any number of threads without locking.
//!
//! # Example
//! ```no_run
//! use scholar::lookup::{ContextValue, Lookup, TuningSlot};
//! use scholar::variable::TypedValue;
//!
//! let lookup = Lookup::load(std::path::Path::new("problem_1.json"))?;
//! let context = [ContextValue::new(1, TypedValue::Float(4.5))];
//! let mut slots = [TuningSlot::new(2)];
//! match lookup.recommend_into(&context, &mut slots) {
//!     Ok(_) => println!("use {:?}", slots[0].value),
//!     Err(miss) => println!("no recommendation: {}", miss),
//! }
//! # Ok::<(), scholar::error::CompileError>(())
//! ```

use crate::artifact::Artifact;
use crate::encoding::OutOfRange;
use crate::error::Result;
use crate::space::Bound;
use crate::table::DecisionTable;
use crate::variable::{TypedValue, VariableId};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One input value supplied by the host
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextValue {
    pub variable: VariableId,
    pub value: TypedValue,
}

impl ContextValue {
    pub fn new(variable: VariableId, value: TypedValue) -> Self {
        Self { variable, value }
    }
}

/// An output the host wants filled
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuningSlot {
    pub variable: VariableId,
    pub value: Option<TypedValue>,
}

impl TuningSlot {
    pub fn new(variable: VariableId) -> Self {
        Self {
            variable,
            value: None,
        }
    }
}

/// Why no recommendation was produced
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum NoRecommendation {
    #[error("input variable {0} was not supplied")]
    MissingInput(VariableId),

    #[error(transparent)]
    OutOfRange(OutOfRange),

    #[error("no historical trial covers bucket {index}")]
    NoData { index: usize },

    #[error("output variable {0} is not tuned by this table")]
    UnknownOutput(VariableId),
}

/// What the host gets when the table has no answer
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum NoDataMode {
    /// Hand the miss back to the caller
    #[default]
    Return,
    /// Ask the host's fallback provider
    Fallback,
}

/// External collaborator consulted when the table has no recommendation
pub trait FallbackProvider {
    /// Fill `slots` and return true, or return false to decline
    fn recommend(&self, context: &[ContextValue], slots: &mut [TuningSlot]) -> bool;
}

/// Verified artifact ready for queries
#[derive(Debug, Clone)]
pub struct Lookup {
    artifact: Artifact,
}

impl Lookup {
    pub fn from_artifact(artifact: Artifact) -> Result<Self> {
        artifact.verify()?;
        Ok(Self { artifact })
    }

    pub fn load(path: &Path) -> Result<Self> {
        Artifact::read_from(path).map(|artifact| Self { artifact })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn table(&self) -> &DecisionTable {
        &self.artifact.table
    }

    /// Table index of the bucket `context` falls in
    pub fn encode(&self, context: &[ContextValue]) -> std::result::Result<usize, NoRecommendation> {
        self.table()
            .encoder
            .encode_with(|axis| {
                context
                    .iter()
                    .find(|c| c.variable == axis.variable)
                    .map(|c| c.value.to_value())
            })
            .map_err(|miss| {
                if miss.bound == Bound::Missing {
                    return NoRecommendation::MissingInput(miss.variable);
                }
                tracing::warn!(
                    "Problem {}: input variable {} value {:?} is {}",
                    self.artifact.problem,
                    miss.variable,
                    miss.value,
                    miss.bound
                );
                NoRecommendation::OutOfRange(miss)
            })
    }

    /// Fill `slots` with the recommendation for `context`
    ///
    /// Slots are only written when every one of them can be filled. Returns the
    /// table index used.
    pub fn recommend_into(
        &self,
        context: &[ContextValue],
        slots: &mut [TuningSlot],
    ) -> std::result::Result<usize, NoRecommendation> {
        let table = self.table();
        let position = |variable: VariableId| {
            table
                .outputs
                .iter()
                .position(|slot| slot.variable == variable)
                .ok_or(NoRecommendation::UnknownOutput(variable))
        };
        for slot in slots.iter() {
            position(slot.variable)?;
        }

        let index = self.encode(context)?;
        let values = table
            .entry(index)
            .and_then(|entry| entry.outputs())
            .ok_or(NoRecommendation::NoData { index })?;

        for slot in slots.iter_mut() {
            let at = position(slot.variable)?;
            let value = values
                .get(at)
                .copied()
                .ok_or(NoRecommendation::NoData { index })?;
            slot.value = Some(TypedValue::from_value(value, table.outputs[at].value_type));
        }
        Ok(index)
    }

    /// Every output, in declared order
    pub fn recommend(
        &self,
        context: &[ContextValue],
    ) -> std::result::Result<Vec<TypedValue>, NoRecommendation> {
        let mut slots: Vec<TuningSlot> = self
            .table()
            .outputs
            .iter()
            .map(|slot| TuningSlot::new(slot.variable))
            .collect();
        self.recommend_into(context, &mut slots)?;
        Ok(slots.into_iter().filter_map(|slot| slot.value).collect())
    }
}

/// Where an [`Advisor`] answer came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Table { index: usize },
    Fallback,
}

/// Applies the no-data mode on top of a [`Lookup`]
pub struct Advisor<'a> {
    lookup: &'a Lookup,
    mode: NoDataMode,
    fallback: Option<Box<dyn FallbackProvider + Send + Sync + 'a>>,
}

impl<'a> Advisor<'a> {
    /// Use the mode recorded in the artifact
    pub fn new(lookup: &'a Lookup) -> Self {
        Self {
            lookup,
            mode: lookup.artifact().no_data_mode,
            fallback: None,
        }
    }

    pub fn with_mode(mut self, mode: NoDataMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_fallback(mut self, provider: impl FallbackProvider + Send + Sync + 'a) -> Self {
        self.fallback = Some(Box::new(provider));
        self
    }

    pub fn mode(&self) -> NoDataMode {
        self.mode
    }

    pub fn advise(
        &self,
        context: &[ContextValue],
        slots: &mut [TuningSlot],
    ) -> std::result::Result<Source, NoRecommendation> {
        let miss = match self.lookup.recommend_into(context, slots) {
            Ok(index) => return Ok(Source::Table { index }),
            Err(miss) => miss,
        };
        match (&self.mode, &self.fallback) {
            (NoDataMode::Fallback, Some(provider)) if provider.recommend(context, slots) => {
                Ok(Source::Fallback)
            }
            _ => Err(miss),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::fixtures::{two_input_table, MODE, X, Y};
    use crate::variable::Value;

    fn lookup() -> Lookup {
        let artifact = Artifact::new(two_input_table(), 10, NoDataMode::Return).unwrap();
        Lookup::from_artifact(artifact).unwrap()
    }

    fn context(x: f64, mode: i64) -> [ContextValue; 2] {
        [
            ContextValue::new(MODE, TypedValue::Integer(mode)),
            ContextValue::new(X, TypedValue::Float(x)),
        ]
    }

    struct Constant(i64);

    impl FallbackProvider for Constant {
        fn recommend(&self, _context: &[ContextValue], slots: &mut [TuningSlot]) -> bool {
            for slot in slots {
                slot.value = Some(TypedValue::Integer(self.0));
            }
            true
        }
    }

    #[test]
    fn test_context_order_does_not_matter() {
        let lookup = lookup();
        let [mode, x] = context(4.5, 1);
        // mode has stride 10, x stride 1
        assert_eq!(lookup.encode(&[mode, x]), Ok(14));
        assert_eq!(lookup.encode(&[x, mode]), Ok(14));
    }

    #[test]
    fn test_recommend_fills_slots() {
        let lookup = lookup();
        let mut slots = [TuningSlot::new(Y)];
        assert_eq!(lookup.recommend_into(&context(4.5, 1), &mut slots), Ok(14));
        assert_eq!(slots[0].value, Some(TypedValue::Integer(14)));
        assert_eq!(
            lookup.recommend(&context(2.0, 0)),
            Ok(vec![TypedValue::Integer(2)])
        );
    }

    #[test]
    fn test_no_data_bucket() {
        let lookup = lookup();
        let mut slots = [TuningSlot::new(Y)];
        // index 12 is a multiple of three
        assert_eq!(
            lookup.recommend_into(&context(2.0, 1), &mut slots),
            Err(NoRecommendation::NoData { index: 12 })
        );
        assert_eq!(slots[0].value, None);
    }

    #[test]
    fn test_out_of_range_inputs() {
        let lookup = lookup();
        for x in [-0.5, 10.0, 1e9] {
            assert!(matches!(
                lookup.recommend(&context(x, 0)),
                Err(NoRecommendation::OutOfRange(OutOfRange { variable: X, .. }))
            ));
        }
        assert!(matches!(
            lookup.recommend(&context(1.0, 5)),
            Err(NoRecommendation::OutOfRange(OutOfRange {
                variable: MODE,
                bound: Bound::NotInDomain,
                ..
            }))
        ));
        assert!(lookup.recommend(&context(f64::NAN, 0)).is_err());
    }

    #[test]
    fn test_missing_input_and_unknown_output() {
        let lookup = lookup();
        let only_x = [ContextValue::new(X, TypedValue::Float(1.0))];
        assert_eq!(
            lookup.recommend(&only_x),
            Err(NoRecommendation::MissingInput(MODE))
        );

        let mut slots = [TuningSlot::new(Y), TuningSlot::new(42)];
        assert_eq!(
            lookup.recommend_into(&context(1.0, 0), &mut slots),
            Err(NoRecommendation::UnknownOutput(42))
        );
        assert_eq!(slots[0].value, None);
    }

    #[test]
    fn test_advisor_return_mode_passes_miss_through() {
        let lookup = lookup();
        let advisor = Advisor::new(&lookup).with_fallback(Constant(-1));
        assert_eq!(advisor.mode(), NoDataMode::Return);
        let mut slots = [TuningSlot::new(Y)];
        assert_eq!(
            advisor.advise(&context(0.0, 0), &mut slots),
            Err(NoRecommendation::NoData { index: 0 })
        );
    }

    #[test]
    fn test_advisor_fallback_mode_defers() {
        let lookup = lookup();
        let advisor = Advisor::new(&lookup)
            .with_mode(NoDataMode::Fallback)
            .with_fallback(Constant(64));
        let mut slots = [TuningSlot::new(Y)];
        assert_eq!(
            advisor.advise(&context(0.0, 0), &mut slots),
            Ok(Source::Fallback)
        );
        assert_eq!(slots[0].value, Some(TypedValue::Integer(64)));

        assert_eq!(
            advisor.advise(&context(1.0, 0), &mut slots),
            Ok(Source::Table { index: 1 })
        );
        assert_eq!(slots[0].value, Some(TypedValue::Integer(1)));
    }

    #[test]
    fn test_fallback_mode_without_provider_returns_miss() {
        let lookup = lookup();
        let advisor = Advisor::new(&lookup).with_mode(NoDataMode::Fallback);
        let mut slots = [TuningSlot::new(Y)];
        assert!(advisor.advise(&context(0.0, 0), &mut slots).is_err());
    }

    #[test]
    fn test_lookup_is_shareable_across_threads() {
        let lookup = lookup();
        std::thread::scope(|scope| {
            for mode in 0..2 {
                let lookup = &lookup;
                scope.spawn(move || {
                    for x in 0..10 {
                        let _ = lookup.encode(&context(x as f64, mode));
                    }
                });
            }
        });
        assert_eq!(
            lookup.table().entry(5).and_then(|e| e.outputs()),
            Some(&[Value::Discrete(5)][..])
        );
    }
}
