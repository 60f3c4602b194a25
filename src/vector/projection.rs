//! t-SNE projection of the embedding space to a low dimension for plotting.
//!
//! This is the exact O(n^2) formulation, adequate for corpora of tens to
//! low hundreds of documents.
//!
//! # Algorithm Details
//! - Input affinities: Gaussian kernels on squared Euclidean distance,
//!   per-point precision found by binary search to match the perplexity
//! - Output affinities: Student-t with one degree of freedom
//! - Initialization: PCA scaled so the first axis has std 1e-4
//! - Optimizer: gradient descent with momentum and adaptive gains,
//!   early exaggeration for the first 250 iterations
//!
//! Coordinates are deterministic for a fixed seed and input but are not
//! expected to match other implementations bit for bit.

use crate::vector::clustering::{ensure_uniform_dimension, squared_euclidean};
use crate::vector::types::VectorResult;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Smallest probability kept in the joint distributions.
const MACHINE_EPSILON: f64 = f64::EPSILON;

/// Iterations run with early exaggeration.
const EXPLORATION_ITERATIONS: usize = 250;

const PERPLEXITY_TOLERANCE: f64 = 1e-5;
const PERPLEXITY_STEPS: usize = 100;
const MIN_GAIN: f64 = 0.01;
const POWER_ITERATIONS: usize = 100;

/// Tunables for the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionParams {
    /// Output dimensionality
    #[serde(default = "default_n_components")]
    pub n_components: usize,

    /// Effective number of neighbors per point
    #[serde(default = "default_perplexity")]
    pub perplexity: f64,

    /// Seed for initialization
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Total optimization iterations
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,

    /// Multiplier on input affinities during the exploration phase
    #[serde(default = "default_early_exaggeration")]
    pub early_exaggeration: f64,
}

fn default_n_components() -> usize {
    2
}
fn default_perplexity() -> f64 {
    30.0
}
fn default_seed() -> u64 {
    42
}
fn default_max_iterations() -> usize {
    1000
}
fn default_early_exaggeration() -> f64 {
    12.0
}

impl Default for ProjectionParams {
    fn default() -> Self {
        Self {
            n_components: default_n_components(),
            perplexity: default_perplexity(),
            seed: default_seed(),
            max_iterations: default_max_iterations(),
            early_exaggeration: default_early_exaggeration(),
        }
    }
}

/// Perplexity actually used for `n_samples` points.
///
/// The requested value must stay below `n_samples - 1`; otherwise it is
/// replaced by `max(5, (n_samples - 1) / 2)`.
#[must_use]
pub fn effective_perplexity(n_samples: usize, requested: f64) -> f64 {
    let max_perplexity = n_samples.saturating_sub(1);
    if requested >= max_perplexity as f64 {
        (max_perplexity / 2).max(5) as f64
    } else {
        requested
    }
}

/// Projects `matrix` rows to `params.n_components` dimensions.
///
/// Returns one coordinate tuple per input row; an empty input yields an
/// empty output.
pub fn apply_tsne(matrix: &[Vec<f64>], params: &ProjectionParams) -> VectorResult<Vec<Vec<f64>>> {
    ensure_uniform_dimension(matrix)?;
    let n = matrix.len();
    let components = params.n_components.max(1);
    if n == 0 {
        return Ok(Vec::new());
    }
    if n == 1 {
        return Ok(vec![vec![0.0; components]]);
    }

    let perplexity = effective_perplexity(n, params.perplexity);
    if perplexity != params.perplexity {
        tracing::debug!(
            "Perplexity {} too large for {n} samples; using {perplexity}",
            params.perplexity
        );
    }

    let p = joint_probabilities(matrix, perplexity);
    let mut y = pca_initialization(matrix, components, params.seed);

    let learning_rate = (n as f64 / params.early_exaggeration / 4.0).max(50.0);
    let mut update = vec![vec![0.0; components]; n];
    let mut gains = vec![vec![1.0_f64; components]; n];

    for iteration in 0..params.max_iterations {
        let (exaggeration, momentum) = if iteration < EXPLORATION_ITERATIONS {
            (params.early_exaggeration, 0.5)
        } else {
            (1.0, 0.8)
        };

        let gradient = kl_gradient(&p, &y, exaggeration);

        for i in 0..n {
            for d in 0..components {
                let g = gradient[i][d];
                let gain = &mut gains[i][d];
                if update[i][d] * g < 0.0 {
                    *gain += 0.2;
                } else {
                    *gain *= 0.8;
                }
                *gain = gain.max(MIN_GAIN);

                update[i][d] = momentum * update[i][d] - learning_rate * *gain * g;
                y[i][d] += update[i][d];
            }
        }
    }

    Ok(y)
}

/// Symmetrized input affinities `P = (P_cond + P_cond^T) / 2n`.
fn joint_probabilities(matrix: &[Vec<f64>], perplexity: f64) -> Vec<Vec<f64>> {
    let n = matrix.len();
    let distances: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| squared_euclidean(&matrix[i], &matrix[j])).collect())
        .collect();

    let conditional: Vec<Vec<f64>> = (0..n)
        .map(|i| conditional_row(&distances[i], i, perplexity))
        .collect();

    let total = 2.0 * n as f64;
    (0..n)
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        0.0
                    } else {
                        ((conditional[i][j] + conditional[j][i]) / total).max(MACHINE_EPSILON)
                    }
                })
                .collect()
        })
        .collect()
}

/// Binary search over the Gaussian precision of row `i` so that the
/// entropy of the conditional distribution matches `ln(perplexity)`.
fn conditional_row(distances: &[f64], i: usize, perplexity: f64) -> Vec<f64> {
    let desired_entropy = perplexity.ln();
    let mut beta = 1.0;
    let mut beta_min = f64::NEG_INFINITY;
    let mut beta_max = f64::INFINITY;
    let mut row = vec![0.0; distances.len()];

    for _ in 0..PERPLEXITY_STEPS {
        let mut sum = 0.0;
        for (j, &d) in distances.iter().enumerate() {
            row[j] = if j == i { 0.0 } else { (-d * beta).exp() };
            sum += row[j];
        }
        if sum == 0.0 {
            sum = MACHINE_EPSILON;
        }

        let mut weighted_distance = 0.0;
        for (p, &d) in row.iter_mut().zip(distances) {
            *p /= sum;
            weighted_distance += d * *p;
        }
        let entropy = sum.ln() + beta * weighted_distance;
        let diff = entropy - desired_entropy;

        if diff.abs() <= PERPLEXITY_TOLERANCE {
            break;
        }
        if diff > 0.0 {
            beta_min = beta;
            beta = if beta_max == f64::INFINITY {
                beta * 2.0
            } else {
                (beta + beta_max) / 2.0
            };
        } else {
            beta_max = beta;
            beta = if beta_min == f64::NEG_INFINITY {
                beta / 2.0
            } else {
                (beta + beta_min) / 2.0
            };
        }
    }

    row
}

/// Gradient of KL(P || Q) with respect to the embedding.
fn kl_gradient(p: &[Vec<f64>], y: &[Vec<f64>], exaggeration: f64) -> Vec<Vec<f64>> {
    let n = y.len();
    let components = y[0].len();

    let mut kernel = vec![vec![0.0; n]; n];
    let mut kernel_sum = 0.0;
    for i in 0..n {
        for j in (i + 1)..n {
            let value = 1.0 / (1.0 + squared_euclidean(&y[i], &y[j]));
            kernel[i][j] = value;
            kernel[j][i] = value;
            kernel_sum += 2.0 * value;
        }
    }
    let kernel_sum = kernel_sum.max(MACHINE_EPSILON);

    let mut gradient = vec![vec![0.0; components]; n];
    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }
            let q = (kernel[i][j] / kernel_sum).max(MACHINE_EPSILON);
            let coefficient = 4.0 * (exaggeration * p[i][j] - q) * kernel[i][j];
            for d in 0..components {
                gradient[i][d] += coefficient * (y[i][d] - y[j][d]);
            }
        }
    }
    gradient
}

/// Principal-component initialization, rescaled so the first component
/// has standard deviation 1e-4.
///
/// Components come from power iteration on the centered data with
/// deflation; the starting vectors are drawn from the seeded generator.
fn pca_initialization(matrix: &[Vec<f64>], components: usize, seed: u64) -> Vec<Vec<f64>> {
    let n = matrix.len();
    let dimension = matrix[0].len();
    let mut rng = StdRng::seed_from_u64(seed);

    let mut centered: Vec<Vec<f64>> = matrix.to_vec();
    for d in 0..dimension {
        let mean = centered.iter().map(|r| r[d]).sum::<f64>() / n as f64;
        for row in &mut centered {
            row[d] -= mean;
        }
    }

    let mut scores = vec![vec![0.0; components]; n];
    let mut residual = centered;

    for c in 0..components {
        let mut axis: Vec<f64> = (0..dimension).map(|_| rng.random::<f64>() - 0.5).collect();
        normalize(&mut axis);

        for _ in 0..POWER_ITERATIONS {
            // axis <- X^T (X axis)
            let projected: Vec<f64> = residual.iter().map(|r| dot(r, &axis)).collect();
            let mut next = vec![0.0; dimension];
            for (row, &s) in residual.iter().zip(&projected) {
                for (acc, &x) in next.iter_mut().zip(row) {
                    *acc += s * x;
                }
            }
            if !normalize(&mut next) {
                break;
            }
            axis = next;
        }

        for (i, row) in residual.iter_mut().enumerate() {
            let s = dot(row, &axis);
            scores[i][c] = s;
            for (x, &a) in row.iter_mut().zip(&axis) {
                *x -= s * a;
            }
        }
    }

    let first_std = {
        let mean = scores.iter().map(|s| s[0]).sum::<f64>() / n as f64;
        (scores.iter().map(|s| (s[0] - mean).powi(2)).sum::<f64>() / n as f64).sqrt()
    };

    if first_std > MACHINE_EPSILON {
        let scale = 1e-4 / first_std;
        for row in &mut scores {
            for value in row.iter_mut() {
                *value *= scale;
            }
        }
        scores
    } else {
        // Degenerate input (all points coincide): small random layout
        (0..n)
            .map(|_| {
                (0..components)
                    .map(|_| (rng.random::<f64>() - 0.5) * 1e-4)
                    .collect()
            })
            .collect()
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f64]) -> bool {
    let norm = dot(v, v).sqrt();
    if norm <= MACHINE_EPSILON {
        return false;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
    true
}
