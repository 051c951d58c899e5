// Compiler configuration
//
// Precedence: built-in defaults < TOML file (--config) < command-line flags.
// Every field is optional in the file; missing ones keep their defaults.

use crate::aggregate::{CentralTendency, OptimizationGoal};
use crate::artifact::ArtifactFormat;
use crate::lookup::NoDataMode;
use crate::space::{CATEGORICAL_CUTOFF, DEFAULT_SLICES};
use crate::store::default_database_path;
use crate::variable::ProblemId;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Everything a compilation run needs besides the data itself
///
/// # Example
/// ```
/// use scholar::config::CompilerConfig;
///
/// let config = CompilerConfig::from_toml_str("slices = 16\ngoal = \"maximize\"")?;
/// assert_eq!(config.slices, 16);
/// assert_eq!(config.categorical_cutoff, 2);
/// assert!(config.validate().is_ok());
/// # Ok::<(), anyhow::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Trial store; `tuning_db.db` (or `tuning_db<rank>.db` under MPI)
    pub database: PathBuf,

    /// Buckets per interval/ratio input
    pub slices: usize,

    /// Continuous inputs with at most this many distinct values become categorical
    pub categorical_cutoff: usize,

    pub central_tendency: CentralTendency,

    pub goal: OptimizationGoal,

    /// Recorded in every artifact; hosts apply it when the table has no answer
    pub no_data_mode: NoDataMode,

    pub format: ArtifactFormat,

    pub output_dir: PathBuf,

    /// Problems compiled concurrently
    pub jobs: usize,

    /// Restrict the run to these problems (empty: all)
    pub problems: Vec<ProblemId>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            database: default_database_path(),
            slices: DEFAULT_SLICES,
            categorical_cutoff: CATEGORICAL_CUTOFF,
            central_tendency: CentralTendency::Mean,
            goal: OptimizationGoal::Minimize,
            no_data_mode: NoDataMode::Return,
            format: ArtifactFormat::Json,
            output_dir: PathBuf::from("."),
            jobs: 1,
            problems: Vec::new(),
        }
    }
}

impl CompilerConfig {
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read config file: {}", path.as_ref().display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML configuration")
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.slices == 0 {
            return Err("slices must be >= 1".to_string());
        }

        if self.jobs == 0 {
            return Err("jobs must be >= 1".to_string());
        }

        if self.database.as_os_str().is_empty() {
            return Err("database path must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompilerConfig::default();
        assert_eq!(config.slices, 10);
        assert_eq!(config.categorical_cutoff, 2);
        assert_eq!(config.central_tendency, CentralTendency::Mean);
        assert_eq!(config.goal, OptimizationGoal::Minimize);
        assert_eq!(config.no_data_mode, NoDataMode::Return);
        assert_eq!(config.jobs, 1);
        assert!(config.problems.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_file() {
        let config = CompilerConfig::from_toml_str(
            r#"
            database = "runs/tuning_db.db"
            slices = 8
            categorical_cutoff = 3
            central_tendency = "median"
            goal = "maximize"
            no_data_mode = "fallback"
            format = "message_pack"
            output_dir = "tables"
            jobs = 4
            problems = [1, 3]
            "#,
        )
        .unwrap();
        assert_eq!(config.database, PathBuf::from("runs/tuning_db.db"));
        assert_eq!(config.central_tendency, CentralTendency::Median);
        assert_eq!(config.no_data_mode, NoDataMode::Fallback);
        assert_eq!(config.format, ArtifactFormat::MessagePack);
        assert_eq!(config.problems, vec![1, 3]);
        assert_eq!(config.jobs, 4);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        assert!(CompilerConfig::from_toml_str("goal = \"sideways\"").is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = CompilerConfig::from_toml_file("/nonexistent/scholar.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_slices() {
        let mut config = CompilerConfig::default();
        config.slices = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    #[allow(clippy::field_reassign_with_default)]
    fn test_invalid_jobs() {
        let mut config = CompilerConfig::default();
        config.jobs = 0;
        assert!(config.validate().is_err());
    }
}
