//! Error types for the corpus analysis system
//!
//! This module provides structured error types using thiserror for better
//! error handling and actionable error messages. Data-quality problems in
//! the input corpus are not errors: they are logged and recovered where
//! they occur. What remains here are configuration mistakes and structural
//! I/O failures.

use crate::vector::VectorError;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for analysis runs
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Numeric stage errors, including unsupported method or metric names
    #[error(transparent)]
    Vector(#[from] VectorError),

    /// File system errors
    #[error("Failed to read '{path}': {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Invalid configuration: {reason}")]
    ConfigError { reason: String },

    /// General errors for cases where we need to preserve existing behavior
    #[error("{0}")]
    General(String),
}

impl AnalysisError {
    /// Get a stable status code for this error type.
    ///
    /// Returns a string identifier that can be used in JSON responses
    /// for programmatic error handling.
    pub fn status_code(&self) -> String {
        match self {
            Self::Vector(VectorError::UnsupportedMethod(_)) => "UNSUPPORTED_METHOD",
            Self::Vector(VectorError::UnsupportedMetric(_)) => "UNSUPPORTED_METRIC",
            Self::Vector(VectorError::InvalidClusterCount(_)) => "INVALID_CLUSTER_COUNT",
            Self::Vector(VectorError::DimensionMismatch { .. }) => "DIMENSION_MISMATCH",
            Self::FileRead { .. } => "FILE_READ_ERROR",
            Self::FileWrite { .. } => "FILE_WRITE_ERROR",
            Self::ConfigError { .. } => "CONFIG_ERROR",
            Self::General(_) => "GENERAL_ERROR",
        }
        .to_string()
    }

    /// Get recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            Self::Vector(VectorError::UnsupportedMethod(_)) => vec![
                "Set analysis.clustering_method to 'kmeans' or 'dbscan'",
                "Or pass --method kmeans|dbscan on the command line",
            ],
            Self::Vector(VectorError::UnsupportedMetric(_)) => vec![
                "Set analysis.similarity_metric to 'cosine', 'euclidean' or 'correlation'",
                "Or pass --metric on the command line",
            ],
            Self::Vector(VectorError::InvalidClusterCount(_)) => {
                vec!["Pass --clusters with a value of at least 1, or omit it for automatic k"]
            }
            Self::FileRead { .. } => vec![
                "Check that the vector directory exists and you have read permissions",
                "Run 'corpusmap config' to see which input directory is in use",
            ],
            Self::FileWrite { .. } => vec![
                "Check disk space and permissions for the output location",
                "Use --output-json, --output-html or --output-dir to write elsewhere",
            ],
            Self::ConfigError { .. } => vec![
                "Run 'corpusmap init --force' to regenerate .corpusmap/settings.toml",
            ],
            _ => vec![],
        }
    }
}

/// Result type alias for analysis operations
pub type RunResult<T> = Result<T, AnalysisError>;

/// Helper trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context(self, msg: &str) -> Result<T, AnalysisError>;

    /// Add context with a path
    fn with_path(self, path: &std::path::Path) -> Result<T, AnalysisError>;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, msg: &str) -> Result<T, AnalysisError> {
        self.map_err(|e| AnalysisError::General(format!("{msg}: {e}")))
    }

    fn with_path(self, path: &std::path::Path) -> Result<T, AnalysisError> {
        self.map_err(|e| {
            AnalysisError::General(format!("Error processing '{}': {}", path.display(), e))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err: AnalysisError = VectorError::UnsupportedMethod("spectral".into()).into();
        assert_eq!(err.status_code(), "UNSUPPORTED_METHOD");
        assert!(err.to_string().contains("spectral"));
        assert!(!err.recovery_suggestions().is_empty());

        let err = AnalysisError::ConfigError {
            reason: "bad".into(),
        };
        assert_eq!(err.status_code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_error_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = result.context("Saving results").unwrap_err();
        assert_eq!(err.to_string(), "Saving results: boom");

        let result: Result<(), std::io::Error> = Err(std::io::Error::other("boom"));
        let err = result
            .with_path(std::path::Path::new("out.json"))
            .unwrap_err();
        assert!(err.to_string().contains("out.json"));
    }
}
