//! Type-safe wrappers and core types for the numeric analysis stages.
//!
//! Method and metric names arrive as strings from settings and the CLI;
//! they are parsed into closed enums here so that an unsupported name is
//! rejected before any stage runs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Label value reserved for density-based noise points.
pub const NOISE_LABEL: i32 = -1;

/// Cluster assignment for one embedding row.
///
/// Non-negative values identify a cluster; [`NOISE_LABEL`] marks a point
/// that density-based clustering left unclustered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClusterLabel(i32);

impl ClusterLabel {
    /// The noise label.
    pub const NOISE: Self = Self(NOISE_LABEL);

    /// Creates a label for cluster `id`.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        Self(id)
    }

    /// Returns the underlying integer value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }

    /// True when this label marks a noise point.
    #[must_use]
    pub const fn is_noise(&self) -> bool {
        self.0 == NOISE_LABEL
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unsupervised partitioning algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClusteringMethod {
    /// Centroid partitioning over standardized features.
    #[default]
    KMeans,
    /// Density-based clustering over raw vectors with cosine distance.
    Dbscan,
}

impl ClusteringMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KMeans => "kmeans",
            Self::Dbscan => "dbscan",
        }
    }
}

impl FromStr for ClusteringMethod {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "kmeans" | "k-means" => Ok(Self::KMeans),
            "dbscan" => Ok(Self::Dbscan),
            _ => Err(VectorError::UnsupportedMethod(s.to_string())),
        }
    }
}

impl fmt::Display for ClusteringMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pairwise document similarity measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimilarityMetric {
    #[default]
    Cosine,
    /// Euclidean distance normalized by the largest pairwise distance and inverted.
    Euclidean,
    /// Pearson correlation between document vectors.
    Correlation,
}

impl SimilarityMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cosine => "cosine",
            Self::Euclidean => "euclidean",
            Self::Correlation => "correlation",
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = VectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cosine" => Ok(Self::Cosine),
            "euclidean" => Ok(Self::Euclidean),
            "correlation" | "pearson" => Ok(Self::Correlation),
            _ => Err(VectorError::UnsupportedMetric(s.to_string())),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur during vector operations.
///
/// All error messages include actionable suggestions for resolution.
#[derive(Error, Debug)]
pub enum VectorError {
    #[error("Unsupported clustering method: '{0}'\nSuggestion: Use one of 'kmeans' or 'dbscan'")]
    UnsupportedMethod(String),

    #[error(
        "Unsupported similarity metric: '{0}'\nSuggestion: Use one of 'cosine', 'euclidean' or 'correlation'"
    )]
    UnsupportedMetric(String),

    #[error("Invalid cluster count: {0}\nSuggestion: Use k of at least 1")]
    InvalidClusterCount(usize),

    #[error(
        "Vector dimension mismatch: expected {expected}, got {actual}\nSuggestion: Ensure all vectors come from the same embedding model"
    )]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for vector operations
pub type VectorResult<T> = Result<T, VectorError>;
