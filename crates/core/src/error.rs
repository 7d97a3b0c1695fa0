//! Error types for the analytics pipeline
//!
//! Structural problems (a stage's required column is absent, a configuration
//! value is outside its domain, an input file cannot be read) are reported
//! through [`PipelineError`]. Data-sparsity conditions are not errors: the
//! source estimator returns an empty estimate and optional enrichment stages
//! pass the table through unchanged.

use crate::core_types::Column;

/// Errors that can occur while preparing or analysing an observation table
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A stage was invoked on a table that lacks one of its required columns
    MissingColumn {
        /// Stage that rejected the table (e.g. `"severity"`)
        stage: &'static str,
        /// Column that was expected
        column: Column,
    },
    /// A configuration value is outside its documented domain
    InvalidParameter(String),
    /// A CSV row could not be parsed
    Ingest {
        /// 1-based line number in the source file, when known
        line: Option<u64>,
        /// Parser message
        message: String,
    },
    /// The source file could not be opened or read
    Io(String),
}

impl PipelineError {
    /// Create error for a required column missing from the table schema.
    pub fn missing_column(stage: &'static str, column: Column) -> Self {
        Self::MissingColumn { stage, column }
    }

    /// Create error for an invalid configuration value.
    ///
    /// # Arguments
    /// * `param_name` - The name of the parameter (e.g. `"wind.strength"`)
    /// * `message` - A description of the constraint that was violated
    pub fn invalid_parameter(param_name: &str, message: &str) -> Self {
        Self::InvalidParameter(format!("{param_name}: {message}"))
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineError::MissingColumn { stage, column } => {
                write!(f, "Stage '{stage}' requires column '{column}'")
            }
            PipelineError::InvalidParameter(msg) => write!(f, "Invalid parameter {msg}"),
            PipelineError::Ingest {
                line: Some(line),
                message,
            } => write!(f, "Failed to parse line {line}: {message}"),
            PipelineError::Ingest {
                line: None,
                message,
            } => write!(f, "Failed to parse input: {message}"),
            PipelineError::Io(msg) => write!(f, "Failed to read input: {msg}"),
        }
    }
}

impl std::error::Error for PipelineError {}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        if err.is_io_error() {
            return PipelineError::Io(err.to_string());
        }
        PipelineError::Ingest {
            line: err.position().map(csv::Position::line),
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(err: std::io::Error) -> Self {
        PipelineError::Io(err.to_string())
    }
}

/// Convenience alias used by every fallible pipeline operation
pub type PipelineResult<T> = Result<T, PipelineError>;
