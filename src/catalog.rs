//! Immutable in-memory repository of variables, problems and trials
//!
//! The catalog is built once (from the trial store or, in tests, by hand) and
//! then only read. Every pipeline stage receives it by reference.

use crate::error::{CompileError, Result};
use crate::variable::{ProblemId, Role, TrialId, Value, Variable, VariableId};
use std::collections::BTreeMap;

/// A tuning problem: ordered inputs and outputs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub id: ProblemId,
    /// Context variables in declared order
    pub inputs: Vec<VariableId>,
    /// Tuned variables in declared order
    pub outputs: Vec<VariableId>,
}

/// One historical measurement
#[derive(Debug, Clone, PartialEq)]
pub struct Trial {
    pub id: TrialId,
    pub problem: ProblemId,
    /// Measured cost
    pub result: f64,
    values: BTreeMap<VariableId, Value>,
}

impl Trial {
    pub fn new(id: TrialId, problem: ProblemId, result: f64) -> Self {
        Self {
            id,
            problem,
            result,
            values: BTreeMap::new(),
        }
    }

    /// Recorded value of a variable in this trial
    pub fn value(&self, variable: VariableId) -> Option<Value> {
        self.values.get(&variable).copied()
    }

    /// Values of `variables`, in the given order; `None` if any is missing
    pub fn values_of(&self, variables: &[VariableId]) -> Option<Vec<Value>> {
        variables.iter().map(|&v| self.value(v)).collect()
    }

    pub fn set_value(&mut self, variable: VariableId, value: Value) {
        self.values.insert(variable, value);
    }
}

/// Read-only repository handed to every pipeline stage
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    variables: BTreeMap<VariableId, Variable>,
    problems: BTreeMap<ProblemId, Problem>,
    trials: BTreeMap<ProblemId, Vec<Trial>>,
    observations: BTreeMap<VariableId, Vec<Value>>,
    candidates: BTreeMap<VariableId, Vec<Value>>,
}

impl Catalog {
    pub fn builder() -> CatalogBuilder {
        CatalogBuilder::default()
    }

    pub fn variable(&self, id: VariableId) -> Option<&Variable> {
        self.variables.get(&id)
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.values()
    }

    pub fn problem(&self, id: ProblemId) -> Result<&Problem> {
        self.problems
            .get(&id)
            .ok_or(CompileError::UnknownProblem(id))
    }

    /// All problems in id order
    pub fn problems(&self) -> impl Iterator<Item = &Problem> {
        self.problems.values()
    }

    /// Trials of a problem in trial id order
    pub fn trials(&self, problem: ProblemId) -> &[Trial] {
        self.trials.get(&problem).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every recorded value of a variable across all trials, in trial id order
    pub fn observed_values(&self, variable: VariableId) -> &[Value] {
        self.observations
            .get(&variable)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Candidate list declared by the recorder, if any
    pub fn declared_candidates(&self, variable: VariableId) -> Option<&[Value]> {
        self.candidates.get(&variable).map(Vec::as_slice)
    }

    pub fn trial_count(&self) -> usize {
        self.trials.values().map(Vec::len).sum()
    }
}

/// Accumulates catalog rows, then validates them into a [`Catalog`]
///
/// # Example
/// ```
/// use scholar::catalog::{Catalog, Problem};
/// use scholar::variable::{Role, StatisticalCategory, Value, ValueType, Variable};
///
/// let mut builder = Catalog::builder();
/// builder
///     .variable(Variable {
///         id: 1,
///         name: "size".into(),
///         value_type: ValueType::Float,
///         category: StatisticalCategory::Interval,
///         role: Role::Input,
///     })
///     .variable(Variable {
///         id: 2,
///         name: "tile".into(),
///         value_type: ValueType::Integer,
///         category: StatisticalCategory::Categorical,
///         role: Role::Output,
///     })
///     .problem(Problem { id: 1, inputs: vec![1], outputs: vec![2] })
///     .trial(1, 1, 0.5, &[(1, Value::Continuous(3.0)), (2, Value::Discrete(16))]);
///
/// let catalog = builder.build()?;
/// assert_eq!(catalog.trials(1).len(), 1);
/// # Ok::<(), scholar::error::CompileError>(())
/// ```
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    variables: Vec<Variable>,
    problems: Vec<Problem>,
    trials: BTreeMap<TrialId, Trial>,
    duplicate_trial: Option<TrialId>,
    orphan_values: usize,
    candidates: BTreeMap<VariableId, Vec<Value>>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn variable(&mut self, variable: Variable) -> &mut Self {
        self.variables.push(variable);
        self
    }

    pub fn problem(&mut self, problem: Problem) -> &mut Self {
        self.problems.push(problem);
        self
    }

    /// Register a trial header (`trials` row)
    ///
    /// A repeated id keeps the first header and fails [`build`](Self::build).
    pub fn trial_header(&mut self, id: TrialId, problem: ProblemId, result: f64) -> &mut Self {
        if self.trials.contains_key(&id) {
            self.duplicate_trial.get_or_insert(id);
        } else {
            self.trials.insert(id, Trial::new(id, problem, result));
        }
        self
    }

    /// Attach a value (`trial_values` row) to a registered trial
    pub fn trial_value(&mut self, trial: TrialId, variable: VariableId, value: Value) -> &mut Self {
        match self.trials.get_mut(&trial) {
            Some(t) => t.set_value(variable, value),
            None => self.orphan_values += 1,
        }
        self
    }

    /// Register a trial with all of its values at once
    pub fn trial(
        &mut self,
        id: TrialId,
        problem: ProblemId,
        result: f64,
        values: &[(VariableId, Value)],
    ) -> &mut Self {
        self.trial_header(id, problem, result);
        for &(variable, value) in values {
            self.trial_value(id, variable, value);
        }
        self
    }

    /// Append a declared candidate, preserving declaration order
    pub fn candidate(&mut self, variable: VariableId, value: Value) -> &mut Self {
        self.candidates.entry(variable).or_default().push(value);
        self
    }

    /// Validate references and freeze the catalog
    ///
    /// # Errors
    /// Fails on duplicate variable or trial ids, on problems referencing unknown
    /// variables, and on problems using a variable in the wrong role.
    pub fn build(self) -> Result<Catalog> {
        let mut variables = BTreeMap::new();
        for variable in self.variables {
            let id = variable.id;
            if variables.insert(id, variable).is_some() {
                return Err(CompileError::DuplicateVariable(id));
            }
        }
        if let Some(id) = self.duplicate_trial {
            return Err(CompileError::DuplicateTrial(id));
        }

        let mut problems = BTreeMap::new();
        for problem in self.problems {
            check_roles(&variables, &problem, &problem.inputs, Role::Input)?;
            check_roles(&variables, &problem, &problem.outputs, Role::Output)?;
            problems.insert(problem.id, problem);
        }

        if self.orphan_values > 0 {
            tracing::warn!(
                "Ignoring {} trial values that reference unknown trials",
                self.orphan_values
            );
        }

        let mut trials: BTreeMap<ProblemId, Vec<Trial>> = BTreeMap::new();
        let mut observations: BTreeMap<VariableId, Vec<Value>> = BTreeMap::new();
        let mut undescribed = 0usize;
        let mut uncatalogued = 0usize;
        for (_, trial) in self.trials {
            if !problems.contains_key(&trial.problem) {
                undescribed += 1;
                continue;
            }
            for (variable, value) in &trial.values {
                if variables.contains_key(variable) {
                    observations.entry(*variable).or_default().push(*value);
                } else {
                    uncatalogued += 1;
                }
            }
            trials.entry(trial.problem).or_default().push(trial);
        }
        if undescribed > 0 {
            tracing::warn!("Ignoring {} trials of undescribed problems", undescribed);
        }
        if uncatalogued > 0 {
            tracing::warn!(
                "Ignoring {} trial values of uncatalogued variables",
                uncatalogued
            );
        }

        Ok(Catalog {
            variables,
            problems,
            trials,
            observations,
            candidates: self.candidates,
        })
    }
}

fn check_roles(
    variables: &BTreeMap<VariableId, Variable>,
    problem: &Problem,
    ids: &[VariableId],
    expected: Role,
) -> Result<()> {
    for &id in ids {
        let variable = variables.get(&id).ok_or(CompileError::UnknownVariable {
            problem: problem.id,
            variable: id,
        })?;
        if variable.role != expected {
            return Err(CompileError::RoleMismatch {
                problem: problem.id,
                variable: id,
                expected: expected.as_str(),
                found: variable.role.as_str(),
            });
        }
    }
    Ok(())
}
