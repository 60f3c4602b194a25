/// The main library module for corpusmap
pub mod analysis;
pub mod config;
pub mod corpus;
pub mod display;
pub mod error;
pub mod io;
pub mod narration;
pub mod network;
pub mod report;
pub mod vector;

// Explicit exports for better API clarity
pub use analysis::{AnalysisOptions, AnalysisResult, AnalysisRun, DocumentReference, PostProcessor};
pub use config::Settings;
pub use corpus::{DocumentVector, EmbeddingMatrix, load_document_vectors};
pub use error::{AnalysisError, ErrorContext, RunResult};
pub use narration::{ClusterNarrator, OllamaClient, TextGenerator};
pub use network::{DocumentGraph, build_network_graph};
pub use report::{create_visualization_html, save_analysis_results};
pub use vector::{
    ClusterLabel, ClusteringMethod, SimilarityMatrix, SimilarityMetric, VectorError, VectorResult,
};
