//! Compilation pipeline: catalog -> spaces -> aggregation -> table -> artifact
//!
//! Problems share nothing mutable, so with `jobs > 1` they are compiled by
//! scoped worker threads draining a lock-free queue of problem positions.
//! Results are put back in problem id order before anything is written, and
//! nothing is written unless every selected problem compiled.

use crate::aggregate::TrialAggregator;
use crate::artifact::{Artifact, ArtifactFormat};
use crate::catalog::{Catalog, Problem};
use crate::config::CompilerConfig;
use crate::encoding::Encoder;
use crate::error::Result;
use crate::space::{quantize, SearchSpace, SpaceBuilder};
use crate::table::DecisionTable;
use crate::variable::{ProblemId, Role, VariableId};
use crossbeam::queue::ArrayQueue;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// One search space per input variable, built once per run
#[derive(Debug, Clone, Default)]
pub struct SpaceRepository {
    spaces: BTreeMap<VariableId, SearchSpace>,
}

impl SpaceRepository {
    pub fn build(catalog: &Catalog, builder: SpaceBuilder) -> Self {
        let spaces = catalog
            .variables()
            .filter(|v| v.role == Role::Input)
            .map(|v| {
                let space = builder.build_with_candidates(
                    v,
                    catalog.observed_values(v.id),
                    catalog.declared_candidates(v.id),
                );
                debug!("Variable {} ({}) has {} space", v.id, v.name, space.kind());
                (v.id, space)
            })
            .collect();
        Self { spaces }
    }

    pub fn space(&self, variable: VariableId) -> Option<&SearchSpace> {
        self.spaces.get(&variable)
    }
}

/// A compiled problem awaiting emission
#[derive(Debug, Clone)]
pub struct CompiledProblem {
    pub artifact: Artifact,
    pub trials_used: usize,
    pub trials_skipped: usize,
}

/// A problem left out of the run, with the reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedProblem {
    pub problem: ProblemId,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub enum ProblemOutcome {
    Compiled(Box<CompiledProblem>),
    Skipped(SkippedProblem),
}

/// Every selected problem, compiled or skipped, in problem id order
#[derive(Debug, Clone, Default)]
pub struct Compilation {
    pub compiled: Vec<CompiledProblem>,
    pub skipped: Vec<SkippedProblem>,
}

pub struct Compiler<'a> {
    catalog: &'a Catalog,
    config: &'a CompilerConfig,
    spaces: SpaceRepository,
}

impl<'a> Compiler<'a> {
    pub fn new(catalog: &'a Catalog, config: &'a CompilerConfig) -> Self {
        let spaces = SpaceRepository::build(catalog, SpaceBuilder::new(config.categorical_cutoff));
        Self {
            catalog,
            config,
            spaces,
        }
    }

    pub fn spaces(&self) -> &SpaceRepository {
        &self.spaces
    }

    /// Compile one problem, or explain why it has no table
    pub fn compile_problem(&self, problem: &Problem) -> Result<ProblemOutcome> {
        let skip = |reason: String| {
            warn!("Skipping problem {}: {}", problem.id, reason);
            Ok(ProblemOutcome::Skipped(SkippedProblem {
                problem: problem.id,
                reason,
            }))
        };

        if problem.inputs.is_empty() {
            return skip("no input variables".to_string());
        }
        if self.catalog.trials(problem.id).is_empty() {
            return skip("no trials".to_string());
        }

        let mut axes = Vec::with_capacity(problem.inputs.len());
        for &input in &problem.inputs {
            match self.spaces.space(input) {
                Some(space) if !space.is_empty() => {
                    axes.push((input, quantize(space, self.config.slices)));
                }
                _ => return skip(format!("input {} has no observed values", input)),
            }
        }

        let encoder = Encoder::new(problem.id, axes)?;
        let aggregation =
            TrialAggregator::new(self.catalog, self.config.central_tendency, self.config.goal)
                .aggregate(problem, &encoder)?;
        let table = DecisionTable::build(self.catalog, problem, encoder, &aggregation)?;

        info!(
            "Compiled problem {}: {} buckets, {} with data, {} trials used, {} skipped",
            problem.id,
            table.size(),
            table.filled(),
            aggregation.trials_used,
            aggregation.trials_skipped
        );

        Ok(ProblemOutcome::Compiled(Box::new(CompiledProblem {
            artifact: Artifact::new(table, self.config.slices, self.config.no_data_mode)?,
            trials_used: aggregation.trials_used,
            trials_skipped: aggregation.trials_skipped,
        })))
    }

    /// Compile the selected problems (all when the selection is empty)
    ///
    /// # Errors
    /// The first fatal error of any problem aborts the whole run.
    pub fn compile_all(&self) -> Result<Compilation> {
        let problems = self.selected()?;
        let outcomes = if self.config.jobs > 1 && problems.len() > 1 {
            self.compile_parallel(&problems)?
        } else {
            problems
                .iter()
                .map(|p| self.compile_problem(p))
                .collect::<Result<Vec<_>>>()?
        };

        let mut compilation = Compilation::default();
        for outcome in outcomes {
            match outcome {
                ProblemOutcome::Compiled(compiled) => compilation.compiled.push(*compiled),
                ProblemOutcome::Skipped(skipped) => compilation.skipped.push(skipped),
            }
        }
        Ok(compilation)
    }

    fn selected(&self) -> Result<Vec<&'a Problem>> {
        if self.config.problems.is_empty() {
            return Ok(self.catalog.problems().collect());
        }
        let mut ids = self.config.problems.clone();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| self.catalog.problem(id)).collect()
    }

    fn compile_parallel(&self, problems: &[&Problem]) -> Result<Vec<ProblemOutcome>> {
        let queue = ArrayQueue::new(problems.len());
        for position in 0..problems.len() {
            // capacity equals the number of pushes
            let _ = queue.push(position);
        }
        let workers = self.config.jobs.min(problems.len());
        debug!("Compiling {} problems on {} workers", problems.len(), workers);

        let queue = &queue;
        let finished = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move |_| {
                        let mut done = Vec::new();
                        while let Some(position) = queue.pop() {
                            done.push((position, self.compile_problem(problems[position])));
                        }
                        done
                    })
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| match handle.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect::<Vec<_>>()
        });
        let mut finished = match finished {
            Ok(finished) => finished,
            Err(panic) => std::panic::resume_unwind(panic),
        };

        finished.sort_by_key(|(position, _)| *position);
        finished.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

impl Compilation {
    /// Write every artifact, then summarize the run
    pub fn write(&self, dir: &Path, format: ArtifactFormat) -> Result<CompileSummary> {
        let mut problems = Vec::with_capacity(self.compiled.len());
        for compiled in &self.compiled {
            let path = compiled.artifact.write_to(dir, format)?;
            info!("Wrote {}", path.display());
            problems.push(ProblemSummary::new(compiled, Some(path)));
        }
        Ok(CompileSummary {
            problems,
            skipped: self.skipped.clone(),
        })
    }

    /// Summary without writing anything
    pub fn summary(&self) -> CompileSummary {
        CompileSummary {
            problems: self
                .compiled
                .iter()
                .map(|c| ProblemSummary::new(c, None))
                .collect(),
            skipped: self.skipped.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemSummary {
    pub problem: ProblemId,
    pub table_size: usize,
    pub filled: usize,
    pub no_data: usize,
    pub trials_used: usize,
    pub trials_skipped: usize,
    pub fingerprint: String,
    pub artifact: Option<PathBuf>,
}

impl ProblemSummary {
    fn new(compiled: &CompiledProblem, artifact: Option<PathBuf>) -> Self {
        let table = &compiled.artifact.table;
        Self {
            problem: compiled.artifact.problem,
            table_size: table.size(),
            filled: table.filled(),
            no_data: table.no_data(),
            trials_used: compiled.trials_used,
            trials_skipped: compiled.trials_skipped,
            fingerprint: compiled.artifact.fingerprint.clone(),
            artifact,
        }
    }
}

/// Build summary, rendered as text or JSON
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompileSummary {
    pub problems: Vec<ProblemSummary>,
    pub skipped: Vec<SkippedProblem>,
}

impl CompileSummary {
    pub fn to_report_string(&self) -> String {
        let mut report = String::new();
        let _ = writeln!(
            report,
            "{:>8} {:>10} {:>8} {:>8} {:>8} {:>8}  artifact",
            "problem", "buckets", "filled", "no-data", "used", "skipped"
        );
        for p in &self.problems {
            let artifact = p
                .artifact
                .as_ref()
                .map(|a| a.display().to_string())
                .unwrap_or_else(|| "-".to_string());
            let _ = writeln!(
                report,
                "{:>8} {:>10} {:>8} {:>8} {:>8} {:>8}  {}",
                p.problem, p.table_size, p.filled, p.no_data, p.trials_used, p.trials_skipped, artifact
            );
        }
        for s in &self.skipped {
            let _ = writeln!(report, "{:>8} skipped: {}", s.problem, s.reason);
        }
        let _ = write!(
            report,
            "{} compiled, {} skipped",
            self.problems.len(),
            self.skipped.len()
        );
        report
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
