//! Error types for decision-table compilation
//!
//! Every variant here is fatal for the build: no artifact is written once one
//! of these surfaces. Recoverable conditions (degenerate domains, empty
//! buckets, skipped trials) never become a `CompileError`.

use crate::variable::{ProblemId, TrialId, VariableId};
use thiserror::Error;

/// Errors that abort a compilation run
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("Variable {variable} has unknown statistical category code {code}")]
    UnknownStatisticalCategory { variable: VariableId, code: i64 },

    #[error("Variable {variable} has unknown value type code {code}")]
    UnknownValueType { variable: VariableId, code: i64 },

    #[error("Problem {problem} references unknown variable {variable}")]
    UnknownVariable {
        problem: ProblemId,
        variable: VariableId,
    },

    #[error("Unknown problem {0}")]
    UnknownProblem(ProblemId),

    #[error("Problem {problem} uses variable {variable} as {expected}, but it is declared as {found}")]
    RoleMismatch {
        problem: ProblemId,
        variable: VariableId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Variable id {0} is declared more than once")]
    DuplicateVariable(VariableId),

    #[error("Trial {trial} value for variable {variable} must carry exactly one of discrete_result or real_result")]
    MalformedTrialValue {
        trial: TrialId,
        variable: VariableId,
    },

    #[error("Decision table for problem {problem} overflows the index space")]
    TableTooLarge { problem: ProblemId },

    #[error("Table index {index} is outside a table of {size} buckets")]
    IndexOutOfBounds { index: usize, size: usize },

    #[error("Malformed decision table: {0}")]
    MalformedTable(String),

    #[error("Trial id {0} is recorded more than once")]
    DuplicateTrial(TrialId),

    #[error("Statistics failed: {0}")]
    Statistics(String),

    #[error("Artifact fingerprint mismatch: expected {expected}, computed {computed}")]
    FingerprintMismatch { expected: String, computed: String },

    #[error("Unsupported artifact format version {found} (this build reads {supported})")]
    UnsupportedArtifactVersion { found: u32, supported: u32 },

    #[error("Trial store error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MessagePack encode error: {0}")]
    MessagePackEncode(#[from] rmp_serde::encode::Error),

    #[error("MessagePack decode error: {0}")]
    MessagePackDecode(#[from] rmp_serde::decode::Error),
}

/// Result type for compilation operations
pub type Result<T> = std::result::Result<T, CompileError>;
