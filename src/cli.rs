//! CLI argument parsing for Scholar

use crate::aggregate::{CentralTendency, OptimizationGoal};
use crate::artifact::ArtifactFormat;
use crate::config::CompilerConfig;
use crate::lookup::NoDataMode;
use crate::variable::{ProblemId, VariableId};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the build summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    /// Human-readable table (default)
    Text,
    /// JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "scholar")]
#[command(version)]
#[command(about = "Compile historical tuning trials into quantized decision tables", long_about = None)]
pub struct Cli {
    /// Trial store to read (default: tuning_db.db, or tuning_db<rank>.db under MPI)
    #[arg(short = 'd', long = "database", value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// TOML configuration file; flags override its values
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory receiving problem_<id> artifacts
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Artifact encoding
    #[arg(long = "format", value_enum)]
    pub format: Option<ArtifactFormat>,

    /// Buckets per interval/ratio input (default: 10)
    #[arg(long = "slices", value_name = "N")]
    pub slices: Option<usize>,

    /// Continuous inputs with at most N distinct values become categorical (default: 2)
    #[arg(long = "categorical-cutoff", value_name = "N")]
    pub categorical_cutoff: Option<usize>,

    /// Statistic scoring each output combination
    #[arg(long = "tendency", value_enum)]
    pub tendency: Option<CentralTendency>,

    /// Whether lower or higher results win
    #[arg(long = "goal", value_enum)]
    pub goal: Option<OptimizationGoal>,

    /// What hosts do when a bucket has no recommendation
    #[arg(long = "on-no-data", value_enum)]
    pub on_no_data: Option<NoDataMode>,

    /// Compile only this problem (repeatable)
    #[arg(short = 'p', long = "problem", value_name = "ID")]
    pub problems: Vec<ProblemId>,

    /// Problems compiled concurrently
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    pub jobs: Option<usize>,

    /// Build summary format
    #[arg(long = "summary", value_enum, default_value = "text")]
    pub summary: SummaryFormat,

    /// Enable debug tracing output
    #[arg(long = "debug")]
    pub debug: bool,

    /// Query a compiled artifact instead of compiling
    #[arg(long = "probe", value_name = "ARTIFACT")]
    pub probe: Option<PathBuf>,

    /// Input value for --probe (repeatable)
    #[arg(
        long = "context",
        value_name = "ID=VALUE",
        requires = "probe",
        value_parser = parse_context
    )]
    pub context: Vec<(VariableId, String)>,
}

impl Cli {
    /// Layer the flags that were given over `config`
    pub fn apply(&self, config: &mut CompilerConfig) {
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir = output_dir.clone();
        }
        if let Some(format) = self.format {
            config.format = format;
        }
        if let Some(slices) = self.slices {
            config.slices = slices;
        }
        if let Some(cutoff) = self.categorical_cutoff {
            config.categorical_cutoff = cutoff;
        }
        if let Some(tendency) = self.tendency {
            config.central_tendency = tendency;
        }
        if let Some(goal) = self.goal {
            config.goal = goal;
        }
        if let Some(mode) = self.on_no_data {
            config.no_data_mode = mode;
        }
        if !self.problems.is_empty() {
            config.problems = self.problems.clone();
        }
        if let Some(jobs) = self.jobs {
            config.jobs = jobs;
        }
    }
}

fn parse_context(arg: &str) -> Result<(VariableId, String), String> {
    let (id, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected ID=VALUE, got '{}'", arg))?;
    let id = id
        .trim()
        .parse()
        .map_err(|e| format!("invalid variable id '{}': {}", id, e))?;
    Ok((id, value.trim().to_string()))
}
