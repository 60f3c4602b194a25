//! Exit codes for CLI operations following Unix conventions.
//!
//! # Exit Code Semantics
//!
//! - `0`: Success - analysis ran and every output was written
//! - `1`: General error - unspecified failure
//! - `3`: Empty corpus - nothing to analyse, no outputs written
//! - `5`: I/O error - input unreadable or an output could not be saved
//! - `6`: Configuration error
//! - `8`: Unsupported clustering method or similarity metric
//! - `126-255`: Reserved by shell

use crate::analysis::AnalysisRun;
use crate::error::AnalysisError;
use crate::vector::VectorError;

/// Standard exit codes for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    /// Operation succeeded (code 0)
    Success = 0,

    /// Unspecified error occurred (code 1)
    GeneralError = 1,

    /// No documents with usable embeddings (code 3)
    EmptyCorpus = 3,

    /// File I/O error (code 5)
    IoError = 5,

    /// Configuration error (code 6)
    ConfigError = 6,

    /// Unknown method or metric name (code 8)
    UnsupportedOperation = 8,
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> i32 {
        code as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code as u8)
    }
}

impl ExitCode {
    /// Exit code for a completed run.
    ///
    /// Returns `EmptyCorpus` when there was nothing to analyse and
    /// `IoError` when a report file could not be written.
    pub fn from_run(run: &AnalysisRun) -> Self {
        match &run.result {
            None => ExitCode::EmptyCorpus,
            Some(_) if !run.outputs_saved() => ExitCode::IoError,
            Some(_) => ExitCode::Success,
        }
    }

    /// Convert an `AnalysisError` to the appropriate exit code.
    pub fn from_error(error: &AnalysisError) -> Self {
        match error {
            AnalysisError::Vector(
                VectorError::UnsupportedMethod(_) | VectorError::UnsupportedMetric(_),
            ) => ExitCode::UnsupportedOperation,
            AnalysisError::Vector(VectorError::InvalidClusterCount(_)) => ExitCode::ConfigError,
            AnalysisError::FileRead { .. } | AnalysisError::FileWrite { .. } => ExitCode::IoError,
            AnalysisError::ConfigError { .. } => ExitCode::ConfigError,
            _ => ExitCode::GeneralError,
        }
    }

    /// Check if this exit code indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Get a human-readable description of the exit code.
    pub fn description(&self) -> &str {
        match self {
            ExitCode::Success => "Success",
            ExitCode::GeneralError => "General error",
            ExitCode::EmptyCorpus => "No documents with embeddings",
            ExitCode::IoError => "I/O error",
            ExitCode::ConfigError => "Configuration error",
            ExitCode::UnsupportedOperation => "Unsupported operation",
        }
    }
}
