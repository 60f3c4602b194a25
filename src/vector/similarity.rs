//! Pairwise document similarity under a selectable metric.
//!
//! Every metric produces a square, symmetric matrix with an all-ones
//! diagonal. Only the upper triangle is computed; the lower triangle is
//! mirrored from it.

use crate::vector::clustering::{cosine_similarity, ensure_uniform_dimension};
use crate::vector::types::{SimilarityMetric, VectorResult};
use serde::{Deserialize, Serialize};

/// Square pairwise similarity matrix, positionally aligned with the
/// embedding rows it was computed from.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimilarityMatrix {
    values: Vec<Vec<f64>>,
}

impl SimilarityMatrix {
    /// Wraps precomputed rows.
    #[must_use]
    pub fn from_rows(values: Vec<Vec<f64>>) -> Self {
        Self { values }
    }

    fn identity(n: usize) -> Self {
        let values = (0..n)
            .map(|i| {
                let mut row = vec![0.0; n];
                row[i] = 1.0;
                row
            })
            .collect();
        Self { values }
    }

    /// Number of documents (rows and columns).
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Similarity between documents `i` and `j`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    fn set_pair(&mut self, i: usize, j: usize, value: f64) {
        self.values[i][j] = value;
        self.values[j][i] = value;
    }

    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.values
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.values
    }
}

/// Computes the pairwise similarity matrix of `matrix` rows.
///
/// - `Cosine`: standard cosine similarity.
/// - `Euclidean`: `1 - d / max(d)`, all ones when every point coincides.
/// - `Correlation`: Pearson correlation between row vectors; a pair that
///   involves a constant row has undefined correlation and scores 0.
///
/// An empty input yields an empty matrix.
pub fn compute_similarity_matrix(
    matrix: &[Vec<f64>],
    metric: SimilarityMetric,
) -> VectorResult<SimilarityMatrix> {
    ensure_uniform_dimension(matrix)?;
    let n = matrix.len();
    let mut similarity = SimilarityMatrix::identity(n);

    match metric {
        SimilarityMetric::Cosine => {
            for i in 0..n {
                for j in (i + 1)..n {
                    similarity.set_pair(i, j, cosine_similarity(&matrix[i], &matrix[j]));
                }
            }
        }
        SimilarityMetric::Euclidean => {
            let mut distances = vec![vec![0.0; n]; n];
            let mut max_distance: f64 = 0.0;
            for i in 0..n {
                for j in (i + 1)..n {
                    let d = euclidean_distance(&matrix[i], &matrix[j]);
                    distances[i][j] = d;
                    max_distance = max_distance.max(d);
                }
            }
            for i in 0..n {
                for j in (i + 1)..n {
                    let value = if max_distance > 0.0 {
                        1.0 - distances[i][j] / max_distance
                    } else {
                        1.0
                    };
                    similarity.set_pair(i, j, value);
                }
            }
        }
        SimilarityMetric::Correlation => {
            for i in 0..n {
                for j in (i + 1)..n {
                    let value = pearson_correlation(&matrix[i], &matrix[j]).unwrap_or(0.0);
                    similarity.set_pair(i, j, value);
                }
            }
        }
    }

    Ok(similarity)
}

/// Euclidean distance between two vectors.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Pearson correlation coefficient between two equally long vectors.
///
/// Returns `None` when either vector has zero variance or fewer than two
/// elements, where the coefficient is undefined.
pub fn pearson_correlation(a: &[f64], b: &[f64]) -> Option<f64> {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");
    if a.len() < 2 {
        return None;
    }

    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;

    let mut covariance = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (x, y) in a.iter().zip(b) {
        let da = x - mean_a;
        let db = y - mean_b;
        covariance += da * db;
        var_a += da * da;
        var_b += db * db;
    }

    let denominator = (var_a * var_b).sqrt();
    if denominator == 0.0 || !denominator.is_finite() {
        return None;
    }
    Some((covariance / denominator).clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Vec<f64>> {
        vec![
            vec![0.1, 0.2, 0.3, 0.4, 0.5],
            vec![0.15, 0.25, 0.35, 0.45, 0.55],
            vec![0.9, 0.8, 0.7, 0.6, 0.5],
        ]
    }

    fn assert_symmetric_with_unit_diagonal(m: &SimilarityMatrix) {
        for i in 0..m.len() {
            assert_eq!(m.get(i, i), 1.0);
            for j in 0..m.len() {
                assert_eq!(m.get(i, j), m.get(j, i));
            }
        }
    }

    #[test]
    fn test_all_metrics_symmetric_with_unit_diagonal() {
        for metric in [
            SimilarityMetric::Cosine,
            SimilarityMetric::Euclidean,
            SimilarityMetric::Correlation,
        ] {
            let m = compute_similarity_matrix(&sample(), metric).unwrap();
            assert_eq!(m.len(), 3);
            assert_symmetric_with_unit_diagonal(&m);
        }
    }

    #[test]
    fn test_cosine_orders_near_pair_first() {
        let m = compute_similarity_matrix(&sample(), SimilarityMetric::Cosine).unwrap();
        assert!(m.get(0, 1) > 0.99);
        assert!(m.get(0, 1) > m.get(0, 2));
        assert!(m.get(0, 2) < 0.99);
    }

    #[test]
    fn test_cosine_zero_vector_keeps_unit_diagonal() {
        let m = compute_similarity_matrix(
            &[vec![0.0, 0.0], vec![1.0, 0.0]],
            SimilarityMetric::Cosine,
        )
        .unwrap();
        assert_eq!(m.get(0, 0), 1.0);
        assert_eq!(m.get(0, 1), 0.0);
    }

    #[test]
    fn test_euclidean_normalized_and_inverted() {
        let m = compute_similarity_matrix(
            &[vec![0.0, 0.0], vec![3.0, 4.0], vec![6.0, 8.0]],
            SimilarityMetric::Euclidean,
        )
        .unwrap();
        // Farthest pair scores 0, half distance scores 0.5
        assert!((m.get(0, 2) - 0.0).abs() < 1e-12);
        assert!((m.get(0, 1) - 0.5).abs() < 1e-12);
        assert!((m.get(1, 2) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_euclidean_coincident_points_all_ones() {
        let m = compute_similarity_matrix(&vec![vec![1.0, 1.0]; 3], SimilarityMetric::Euclidean)
            .unwrap();
        assert!(m.rows().iter().flatten().all(|&v| v == 1.0));
    }

    #[test]
    fn test_correlation_values() {
        let m = compute_similarity_matrix(&sample(), SimilarityMetric::Correlation).unwrap();
        // Row 1 is a shift of row 0; row 2 is strictly decreasing
        assert!((m.get(0, 1) - 1.0).abs() < 1e-9);
        assert!((m.get(0, 2) + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_correlation_constant_row_scores_zero() {
        let m = compute_similarity_matrix(
            &[vec![0.5, 0.5, 0.5], vec![0.1, 0.2, 0.3]],
            SimilarityMetric::Correlation,
        )
        .unwrap();
        assert_eq!(m.get(0, 1), 0.0);
        assert_eq!(m.get(0, 0), 1.0);
        assert!(pearson_correlation(&[0.5, 0.5], &[0.1, 0.2]).is_none());
    }

    #[test]
    fn test_empty_input() {
        let m = compute_similarity_matrix(&[], SimilarityMetric::Cosine).unwrap();
        assert!(m.is_empty());
    }
}
