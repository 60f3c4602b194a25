//! Unsupervised clustering of document embeddings.
//!
//! Two algorithms are provided:
//! - K-means over standardized features (zero mean, unit variance per
//!   dimension) so that raw magnitude differences between embedding
//!   dimensions do not dominate the distance.
//! - DBSCAN over the raw vectors with cosine distance, which discovers the
//!   number of clusters and marks outliers with the noise label.
//!
//! # Algorithm Details
//! - K-means initialization: greedy K-means++ from a seeded generator
//! - K-means restarts: `n_init` runs, lowest inertia wins
//! - Max iterations: 300 per run
//! - Convergence tolerance: 1e-4, scaled by the mean feature variance
//!
//! # Performance Characteristics
//! - K-means: O(n_init * iterations * n * k * d)
//! - DBSCAN: O(n^2 * d) for the neighborhood table

use crate::vector::types::{ClusterLabel, ClusteringMethod, VectorError, VectorResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Epsilon for floating-point comparisons.
const EPSILON: f64 = 1e-10;

/// Tunables for both clustering algorithms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams {
    /// Seed for K-means initialization
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of K-means restarts
    #[serde(default = "default_n_init")]
    pub n_init: usize,

    /// Maximum Lloyd iterations per restart
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Relative tolerance on centroid movement
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// DBSCAN neighborhood radius (cosine distance)
    #[serde(default = "default_eps")]
    pub dbscan_eps: f64,

    /// DBSCAN minimum neighborhood size, counting the point itself
    #[serde(default = "default_min_samples")]
    pub dbscan_min_samples: usize,
}

fn default_seed() -> u64 {
    42
}
fn default_n_init() -> usize {
    10
}
fn default_max_iterations() -> usize {
    300
}
fn default_tolerance() -> f64 {
    1e-4
}
fn default_eps() -> f64 {
    0.5
}
fn default_min_samples() -> usize {
    2
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            n_init: default_n_init(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            dbscan_eps: default_eps(),
            dbscan_min_samples: default_min_samples(),
        }
    }
}

/// Result of K-means clustering operation.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansResult {
    /// Cluster centroids in the (standardized) input space.
    pub centroids: Vec<Vec<f64>>,

    /// Cluster assignment for each input vector, in `0..k`.
    pub assignments: Vec<usize>,

    /// Sum of squared distances of samples to their centroid.
    pub inertia: f64,

    /// Number of iterations of the winning run.
    pub iterations: usize,
}

/// Default number of clusters for `n` rows: `max(2, floor(sqrt(n)))`.
#[must_use]
pub fn default_cluster_count(n_rows: usize) -> usize {
    ((n_rows as f64).sqrt().floor() as usize).max(2)
}

/// Partitions the rows of `matrix` and returns one label per row.
///
/// An empty matrix yields an empty labeling. With `n_clusters` unset,
/// K-means uses [`default_cluster_count`]; DBSCAN ignores it.
pub fn cluster_documents(
    matrix: &[Vec<f64>],
    n_clusters: Option<usize>,
    method: ClusteringMethod,
    params: &ClusteringParams,
) -> VectorResult<Vec<ClusterLabel>> {
    if matrix.is_empty() {
        return Ok(Vec::new());
    }
    ensure_uniform_dimension(matrix)?;

    match method {
        ClusteringMethod::KMeans => {
            let requested = n_clusters.unwrap_or_else(|| default_cluster_count(matrix.len()));
            if requested == 0 {
                return Err(VectorError::InvalidClusterCount(0));
            }
            let k = if requested > matrix.len() {
                tracing::warn!(
                    "Requested {requested} clusters for {} documents; using {}",
                    matrix.len(),
                    matrix.len()
                );
                matrix.len()
            } else {
                requested
            };

            let scaled = standardize(matrix);
            let result = kmeans_clustering(&scaled, k, params)?;
            Ok(result
                .assignments
                .into_iter()
                .map(|c| ClusterLabel::new(c as i32))
                .collect())
        }
        ClusteringMethod::Dbscan => Ok(dbscan_clustering(
            matrix,
            params.dbscan_eps,
            params.dbscan_min_samples,
        )),
    }
}

/// Scales every feature to zero mean and unit (population) variance.
///
/// Constant features are centered but left unscaled.
pub fn standardize(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let Some(first) = matrix.first() else {
        return Vec::new();
    };
    let n = matrix.len() as f64;
    let dimension = first.len();

    let mut means = vec![0.0; dimension];
    for row in matrix {
        for (mean, &value) in means.iter_mut().zip(row) {
            *mean += value;
        }
    }
    for mean in &mut means {
        *mean /= n;
    }

    let mut scales = vec![0.0; dimension];
    for row in matrix {
        for ((scale, &value), mean) in scales.iter_mut().zip(row).zip(&means) {
            *scale += (value - mean).powi(2);
        }
    }
    for scale in &mut scales {
        *scale = (*scale / n).sqrt();
        if *scale < EPSILON {
            *scale = 1.0;
        }
    }

    matrix
        .iter()
        .map(|row| {
            row.iter()
                .zip(means.iter().zip(&scales))
                .map(|(&value, (mean, scale))| (value - mean) / scale)
                .collect()
        })
        .collect()
}

/// Performs K-means clustering with Euclidean distance.
///
/// # Algorithm
/// 1. Seed one generator from `params.seed`
/// 2. For each of `params.n_init` restarts:
///    - Initialize centroids with greedy K-means++
///    - Run Lloyd iterations until assignments stop changing, the
///      centroid shift falls under the scaled tolerance, or the
///      iteration cap is hit
/// 3. Keep the run with the lowest inertia
#[must_use = "clustering results should be used or the computation is wasted"]
pub fn kmeans_clustering(
    vectors: &[Vec<f64>],
    k: usize,
    params: &ClusteringParams,
) -> VectorResult<KMeansResult> {
    if k == 0 || k > vectors.len() {
        return Err(VectorError::InvalidClusterCount(k));
    }
    ensure_uniform_dimension(vectors)?;

    let tolerance = params.tolerance * mean_feature_variance(vectors);
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<KMeansResult> = None;

    for _ in 0..params.n_init.max(1) {
        let centroids = initialize_centroids_kmeans_plus_plus(vectors, k, &mut rng);
        let run = lloyd(vectors, centroids, params.max_iterations.max(1), tolerance);

        let improved = best
            .as_ref()
            .is_none_or(|current| run.inertia < current.inertia);
        if improved {
            best = Some(run);
        }
    }

    best.ok_or(VectorError::InvalidClusterCount(k))
}

fn lloyd(
    vectors: &[Vec<f64>],
    mut centroids: Vec<Vec<f64>>,
    max_iterations: usize,
    tolerance: f64,
) -> KMeansResult {
    let k = centroids.len();
    let mut assignments = vec![usize::MAX; vectors.len()];
    let mut iterations = 0;

    loop {
        iterations += 1;

        // Assignment step
        let new_assignments: Vec<usize> = vectors
            .iter()
            .map(|vector| nearest_centroid(vector, &centroids).0)
            .collect();
        let converged = new_assignments == assignments;
        assignments = new_assignments;

        if converged || iterations >= max_iterations {
            break;
        }

        // Update step
        let new_centroids = update_centroids(vectors, &assignments, &centroids, k);
        let shift: f64 = centroids
            .iter()
            .zip(&new_centroids)
            .map(|(old, new)| squared_euclidean(old, new))
            .sum();
        centroids = new_centroids;

        if shift <= tolerance {
            assignments = vectors
                .iter()
                .map(|vector| nearest_centroid(vector, &centroids).0)
                .collect();
            break;
        }
    }

    if iterations >= max_iterations {
        tracing::debug!("K-means stopped at the {max_iterations} iteration cap");
    }

    let inertia = vectors
        .iter()
        .zip(&assignments)
        .map(|(vector, &c)| squared_euclidean(vector, &centroids[c]))
        .sum();

    KMeansResult {
        centroids,
        assignments,
        inertia,
        iterations,
    }
}

/// Returns the index of the nearest centroid and the squared distance to it.
pub fn nearest_centroid(vector: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best_distance = f64::INFINITY;
    let mut best_cluster = 0;

    for (i, centroid) in centroids.iter().enumerate() {
        let distance = squared_euclidean(vector, centroid);
        if distance < best_distance {
            best_distance = distance;
            best_cluster = i;
        }
    }

    (best_cluster, best_distance)
}

/// Recomputes centroids as the mean of their assigned vectors.
///
/// An empty cluster is moved onto the point that lies farthest from its
/// current centroid.
fn update_centroids(
    vectors: &[Vec<f64>],
    assignments: &[usize],
    previous: &[Vec<f64>],
    k: usize,
) -> Vec<Vec<f64>> {
    let dimension = vectors[0].len();
    let mut new_centroids = vec![vec![0.0; dimension]; k];
    let mut cluster_sizes = vec![0usize; k];

    for (vector, &cluster) in vectors.iter().zip(assignments) {
        for (sum, &value) in new_centroids[cluster].iter_mut().zip(vector) {
            *sum += value;
        }
        cluster_sizes[cluster] += 1;
    }

    for (centroid, &size) in new_centroids.iter_mut().zip(&cluster_sizes) {
        if size > 0 {
            for value in centroid.iter_mut() {
                *value /= size as f64;
            }
        }
    }

    if cluster_sizes.contains(&0) {
        let mut by_distance: Vec<(usize, f64)> = vectors
            .iter()
            .zip(assignments)
            .enumerate()
            .map(|(i, (vector, &c))| (i, squared_euclidean(vector, &previous[c])))
            .collect();
        by_distance.sort_by(|a, b| b.1.total_cmp(&a.1));

        let mut far_points = by_distance.into_iter().map(|(i, _)| i);
        for (centroid, _) in new_centroids
            .iter_mut()
            .zip(&cluster_sizes)
            .filter(|(_, size)| **size == 0)
        {
            if let Some(i) = far_points.next() {
                centroid.clone_from(&vectors[i]);
            }
        }
    }

    new_centroids
}

/// Initializes centroids using greedy K-means++.
///
/// Each new centroid is the best of several candidates sampled with
/// probability proportional to the squared distance to the nearest
/// existing centroid, where "best" minimizes the resulting potential.
fn initialize_centroids_kmeans_plus_plus(
    vectors: &[Vec<f64>],
    k: usize,
    rng: &mut StdRng,
) -> Vec<Vec<f64>> {
    let n = vectors.len();
    let local_trials = 2 + (k as f64).ln().floor() as usize;
    let mut centroids = Vec::with_capacity(k);

    // Choose first centroid uniformly
    let first_idx = rng.random_range(0..n);
    centroids.push(vectors[first_idx].clone());

    let mut closest: Vec<f64> = vectors
        .iter()
        .map(|v| squared_euclidean(v, &centroids[0]))
        .collect();

    while centroids.len() < k {
        let potential: f64 = closest.iter().sum();

        let mut best_candidate = None;
        let mut best_potential = f64::INFINITY;
        let mut best_closest = Vec::new();

        for _ in 0..local_trials {
            let candidate = if potential < EPSILON {
                // All points coincide with chosen centroids
                rng.random_range(0..n)
            } else {
                sample_proportional(&closest, potential, rng)
            };

            let candidate_closest: Vec<f64> = vectors
                .iter()
                .zip(&closest)
                .map(|(v, &d)| d.min(squared_euclidean(v, &vectors[candidate])))
                .collect();
            let candidate_potential: f64 = candidate_closest.iter().sum();

            if candidate_potential < best_potential {
                best_potential = candidate_potential;
                best_candidate = Some(candidate);
                best_closest = candidate_closest;
            }
        }

        let chosen = best_candidate.unwrap_or(n - 1);
        centroids.push(vectors[chosen].clone());
        closest = best_closest;
    }

    centroids
}

fn sample_proportional(weights: &[f64], total: f64, rng: &mut StdRng) -> usize {
    let target = rng.random::<f64>() * total;
    let mut cumulative = 0.0;
    for (i, &weight) in weights.iter().enumerate() {
        cumulative += weight;
        if cumulative >= target && weight > 0.0 {
            return i;
        }
    }
    // Rounding left the target past the last positive weight
    weights.iter().rposition(|&w| w > 0.0).unwrap_or(weights.len() - 1)
}

/// Density-based clustering with cosine distance.
///
/// A point is a core point when at least `min_samples` points (itself
/// included) lie within cosine distance `eps`. Clusters grow from core
/// points in row order and are numbered in the order they are founded;
/// points reachable from no core point are labeled noise.
pub fn dbscan_clustering(vectors: &[Vec<f64>], eps: f64, min_samples: usize) -> Vec<ClusterLabel> {
    let n = vectors.len();
    let neighborhoods: Vec<Vec<usize>> = (0..n)
        .map(|i| {
            (0..n)
                .filter(|&j| {
                    // A zero vector has no cosine similarity, even to itself.
                    j == i || 1.0 - cosine_similarity(&vectors[i], &vectors[j]) <= eps
                })
                .collect()
        })
        .collect();
    let is_core: Vec<bool> = neighborhoods
        .iter()
        .map(|neighbors| neighbors.len() >= min_samples)
        .collect();

    let mut labels = vec![ClusterLabel::NOISE; n];
    let mut next_label = 0;
    let mut stack = Vec::new();

    for start in 0..n {
        if !labels[start].is_noise() || !is_core[start] {
            continue;
        }

        let mut current = start;
        loop {
            if labels[current].is_noise() {
                labels[current] = ClusterLabel::new(next_label);
                if is_core[current] {
                    stack.extend(
                        neighborhoods[current]
                            .iter()
                            .copied()
                            .filter(|&v| labels[v].is_noise()),
                    );
                }
            }
            match stack.pop() {
                Some(next) => current = next,
                None => break,
            }
        }
        next_label += 1;
    }

    labels
}

/// Computes cosine similarity between two vectors.
///
/// # Returns
/// * Cosine similarity in range [-1, 1]; 0 when either vector has zero norm
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "Vectors must have same dimension");

    let dot_product: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f64 = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|x| x * x).sum::<f64>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot_product / (norm_a * norm_b)
    }
}

/// Squared Euclidean distance between two vectors.
pub fn squared_euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum()
}

fn mean_feature_variance(vectors: &[Vec<f64>]) -> f64 {
    let n = vectors.len() as f64;
    let dimension = vectors[0].len();
    if dimension == 0 {
        return 0.0;
    }
    let mut total = 0.0;
    for d in 0..dimension {
        let mean = vectors.iter().map(|v| v[d]).sum::<f64>() / n;
        total += vectors.iter().map(|v| (v[d] - mean).powi(2)).sum::<f64>() / n;
    }
    total / dimension as f64
}

pub(crate) fn ensure_uniform_dimension(vectors: &[Vec<f64>]) -> VectorResult<()> {
    let Some(first) = vectors.first() else {
        return Ok(());
    };
    match vectors.iter().find(|v| v.len() != first.len()) {
        Some(row) => Err(VectorError::DimensionMismatch {
            expected: first.len(),
            actual: row.len(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn three_blobs() -> Vec<Vec<f64>> {
        vec![
            // Cluster 1: mostly x-axis
            vec![1.0, 0.1, 0.0],
            vec![0.9, 0.2, 0.1],
            vec![1.1, 0.0, 0.2],
            // Cluster 2: mostly y-axis
            vec![0.1, 1.0, 0.0],
            vec![0.2, 0.9, 0.1],
            vec![0.0, 1.1, 0.2],
            // Cluster 3: mostly z-axis
            vec![0.0, 0.1, 1.0],
            vec![0.1, 0.2, 0.9],
            vec![0.2, 0.0, 1.1],
        ]
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 1e-12);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-12);

        let a = vec![1.0, 2.0, 3.0];
        let b = vec![-1.0, -2.0, -3.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-12);

        let b = vec![0.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_default_cluster_count() {
        assert_eq!(default_cluster_count(1), 2);
        assert_eq!(default_cluster_count(3), 2);
        assert_eq!(default_cluster_count(9), 3);
        assert_eq!(default_cluster_count(15), 3);
        assert_eq!(default_cluster_count(100), 10);
    }

    #[test]
    fn test_standardize_zero_mean_unit_variance() {
        let scaled = standardize(&[vec![1.0, 5.0], vec![3.0, 5.0], vec![5.0, 5.0]]);
        let column: Vec<f64> = scaled.iter().map(|r| r[0]).collect();
        let mean: f64 = column.iter().sum::<f64>() / 3.0;
        let var: f64 = column.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        assert!((var - 1.0).abs() < 1e-12);

        // Constant feature is centered, not divided by zero
        assert!(scaled.iter().all(|r| r[1] == 0.0));
    }

    #[test]
    fn test_kmeans_clustering_basic() {
        let vectors = three_blobs();
        let result = kmeans_clustering(&vectors, 3, &ClusteringParams::default()).unwrap();

        assert_eq!(result.centroids.len(), 3);
        assert_eq!(result.assignments.len(), 9);

        for group in [0, 3, 6] {
            let cluster = result.assignments[group];
            assert_eq!(result.assignments[group + 1], cluster);
            assert_eq!(result.assignments[group + 2], cluster);
        }
        let mut distinct = result.assignments.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, vec![0, 1, 2]);
    }

    #[test]
    fn test_kmeans_is_deterministic_for_fixed_seed() {
        let vectors = three_blobs();
        let params = ClusteringParams::default();
        let first = kmeans_clustering(&vectors, 3, &params).unwrap();
        let second = kmeans_clustering(&vectors, 3, &params).unwrap();
        assert_eq!(first.assignments, second.assignments);
        assert_eq!(first.inertia, second.inertia);
    }

    #[test]
    fn test_kmeans_edge_cases() {
        let params = ClusteringParams::default();

        let vectors = vec![vec![1.0, 2.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, 0, &params),
            Err(VectorError::InvalidClusterCount(0))
        ));

        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, 3, &params),
            Err(VectorError::InvalidClusterCount(3))
        ));

        let vectors = vec![vec![1.0, 2.0], vec![3.0, 4.0, 5.0]];
        assert!(matches!(
            kmeans_clustering(&vectors, 1, &params),
            Err(VectorError::DimensionMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_kmeans_identical_points() {
        let vectors = vec![vec![0.5, 0.5]; 4];
        let result = kmeans_clustering(&vectors, 2, &ClusteringParams::default()).unwrap();
        assert_eq!(result.assignments.len(), 4);
        assert!(result.assignments.iter().all(|&c| c < 2));
        assert_eq!(result.inertia, 0.0);
    }

    #[test]
    fn test_cluster_documents_labels_in_range() {
        let vectors = three_blobs();
        let params = ClusteringParams::default();
        for k in 1..=4 {
            let labels =
                cluster_documents(&vectors, Some(k), ClusteringMethod::KMeans, &params).unwrap();
            assert_eq!(labels.len(), vectors.len());
            assert!(labels.iter().all(|l| (0..k as i32).contains(&l.get())));
        }
    }

    #[test]
    fn test_cluster_documents_auto_k() {
        let vectors = three_blobs();
        let labels = cluster_documents(
            &vectors,
            None,
            ClusteringMethod::KMeans,
            &ClusteringParams::default(),
        )
        .unwrap();
        // sqrt(9) = 3 clusters, all of them populated for well separated blobs
        let mut distinct: Vec<i32> = labels.iter().map(|l| l.get()).collect();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct, vec![0, 1, 2]);
    }

    #[test]
    fn test_cluster_documents_clamps_k_to_rows() {
        let vectors = vec![vec![0.1, 0.2], vec![0.9, 0.8]];
        let labels = cluster_documents(
            &vectors,
            Some(5),
            ClusteringMethod::KMeans,
            &ClusteringParams::default(),
        )
        .unwrap();
        assert_eq!(labels.len(), 2);
        assert!(labels.iter().all(|l| (0..2).contains(&l.get())));
    }

    #[test]
    fn test_cluster_documents_empty() {
        let labels = cluster_documents(
            &[],
            None,
            ClusteringMethod::Dbscan,
            &ClusteringParams::default(),
        )
        .unwrap();
        assert!(labels.is_empty());
    }

    #[test]
    fn test_dbscan_finds_clusters_and_noise() {
        let vectors = vec![
            vec![1.0, 0.0, 0.0],
            vec![0.95, 0.05, 0.0],
            vec![0.0, 1.0, 0.0],
            vec![0.05, 0.95, 0.0],
            vec![-1.0, -1.0, 0.0],
        ];
        let labels = dbscan_clustering(&vectors, 0.5, 2);
        let raw: Vec<i32> = labels.iter().map(|l| l.get()).collect();
        assert_eq!(raw, vec![0, 0, 1, 1, -1]);
    }

    #[test]
    fn test_dbscan_min_samples_counts_self() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert!(dbscan_clustering(&vectors, 0.5, 2).iter().all(|l| l.is_noise()));
        assert_eq!(
            dbscan_clustering(&vectors, 0.5, 1),
            vec![ClusterLabel::new(0), ClusterLabel::new(1)]
        );
    }

    #[test]
    fn test_dbscan_zero_vector_is_own_neighbor() {
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.98, 0.02]];
        assert_eq!(
            dbscan_clustering(&vectors, 0.5, 1),
            vec![
                ClusterLabel::new(0),
                ClusterLabel::new(1),
                ClusterLabel::new(0)
            ]
        );
        let labels = dbscan_clustering(&vectors, 0.5, 2);
        assert!(labels[1].is_noise());
        assert_eq!(labels[0], labels[2]);
    }
}
