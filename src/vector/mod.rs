//! Numeric analysis over the embedding matrix.
//!
//! Clustering, pairwise similarity and low-dimensional projection all take
//! the matrix as a slice of equally long `f64` rows and return results
//! positionally aligned with those rows. None of these stages perform I/O.

mod clustering;
mod projection;
mod similarity;
mod types;

// Re-export core types for public API
pub use clustering::{
    ClusteringParams, KMeansResult, cluster_documents, cosine_similarity, dbscan_clustering,
    default_cluster_count, kmeans_clustering, nearest_centroid, squared_euclidean, standardize,
};
pub use projection::{ProjectionParams, apply_tsne, effective_perplexity};
pub use similarity::{
    SimilarityMatrix, compute_similarity_matrix, euclidean_distance, pearson_correlation,
};
pub use types::{
    ClusterLabel, ClusteringMethod, NOISE_LABEL, SimilarityMetric, VectorError, VectorResult,
};
