//! End-to-end analysis of a document vector directory.
//!
//! [`PostProcessor::run_full_analysis`] loads the records, builds the
//! embedding matrix, clusters, narrates each cluster, computes the
//! similarity network and the 2-D projection, then writes the JSON report
//! and the HTML page. Data-quality problems are logged and recovered
//! where they occur; only misconfiguration (an unsupported method or
//! metric) and unreadable input directories fail the run.

use crate::config::Settings;
use crate::corpus::{DocumentVector, EmbeddingMatrix, load_document_vectors};
use crate::error::RunResult;
use crate::narration::{
    ClusterNarration, ClusterNarrator, DEFAULT_PROMPT_CHAR_BUDGET, TextGenerator, WordCloudParams,
};
use crate::network::{DocumentGraph, build_network_graph};
use crate::report::{create_visualization_html, save_analysis_results};
use crate::vector::{
    ClusterLabel, ClusteringMethod, ClusteringParams, ProjectionParams, SimilarityMatrix,
    SimilarityMetric, apply_tsne, cluster_documents, compute_similarity_matrix,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::{info, warn};

/// Identity of one analysed document, aligned with the matrix rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReference {
    pub document_id: String,
    pub title: String,
    pub author: String,
}

impl From<&DocumentVector> for DocumentReference {
    fn from(doc: &DocumentVector) -> Self {
        Self {
            document_id: doc.document_id.clone(),
            title: doc.metadata.title.clone(),
            author: doc.metadata.author.clone(),
        }
    }
}

/// Everything one analysis run produced.
///
/// `cluster_labels`, `similarity_matrix`, `network_graph` nodes,
/// `tsne_coordinates` and `document_metadata` are all positionally
/// aligned with the embedding matrix rows. `n_documents` counts every
/// loaded record, including those without a usable embedding.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisResult {
    pub n_documents: usize,
    pub embedding_dimension: usize,
    /// Distinct labels, noise included
    pub n_clusters: usize,
    pub cluster_labels: Vec<ClusterLabel>,
    pub cluster_summaries: BTreeMap<ClusterLabel, String>,
    /// Word-cloud image path per cluster
    pub cluster_wordclouds: BTreeMap<ClusterLabel, String>,
    pub similarity_matrix: SimilarityMatrix,
    pub network_graph: DocumentGraph,
    pub tsne_coordinates: Vec<Vec<f64>>,
    pub document_metadata: Vec<DocumentReference>,
}

impl AnalysisResult {
    /// Number of documents per label, ascending by label.
    #[must_use]
    pub fn cluster_sizes(&self) -> BTreeMap<ClusterLabel, usize> {
        let mut sizes = BTreeMap::new();
        for label in &self.cluster_labels {
            *sizes.entry(*label).or_insert(0) += 1;
        }
        sizes
    }
}

/// Outcome of [`PostProcessor::run_full_analysis`].
#[derive(Debug, Clone, Default)]
pub struct AnalysisRun {
    /// `None` when the directory held no documents or no usable embeddings
    pub result: Option<AnalysisResult>,
    /// Per-cluster narration outcomes, including skipped steps
    pub narrations: Vec<ClusterNarration>,
    pub json_saved: bool,
    pub html_saved: bool,
}

impl AnalysisRun {
    /// True when every requested output was written.
    #[must_use]
    pub fn outputs_saved(&self) -> bool {
        self.result.is_none() || (self.json_saved && self.html_saved)
    }
}

/// Inputs, outputs and stage parameters for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisOptions {
    pub input_dir: PathBuf,
    pub output_json: PathBuf,
    pub output_html: PathBuf,
    pub output_dir: PathBuf,
    pub n_clusters: Option<usize>,
    pub clustering_method: ClusteringMethod,
    pub similarity_metric: SimilarityMetric,
    pub network_threshold: f64,
    pub clustering: ClusteringParams,
    pub projection: ProjectionParams,
    pub wordcloud: WordCloudParams,
    pub prompt_char_budget: usize,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./production"),
            output_json: PathBuf::from("analysis_results.json"),
            output_html: PathBuf::from("visualization.html"),
            output_dir: PathBuf::from("."),
            n_clusters: None,
            clustering_method: ClusteringMethod::default(),
            similarity_metric: SimilarityMetric::default(),
            network_threshold: 0.7,
            clustering: ClusteringParams::default(),
            projection: ProjectionParams::default(),
            wordcloud: WordCloudParams::default(),
            prompt_char_budget: DEFAULT_PROMPT_CHAR_BUDGET,
        }
    }
}

impl AnalysisOptions {
    /// Options from loaded settings.
    ///
    /// # Errors
    /// Fails with `UnsupportedMethod` / `UnsupportedMetric` when the
    /// configured names are unknown.
    pub fn from_settings(settings: &Settings) -> RunResult<Self> {
        let analysis = &settings.analysis;
        Ok(Self {
            input_dir: analysis.input_dir.clone(),
            output_json: analysis.output_json.clone(),
            output_html: analysis.output_html.clone(),
            output_dir: analysis.output_dir.clone(),
            n_clusters: analysis.n_clusters,
            clustering_method: analysis.clustering_method.parse()?,
            similarity_metric: analysis.similarity_metric.parse()?,
            network_threshold: analysis.network_threshold,
            clustering: settings.clustering.clone(),
            projection: settings.projection.clone(),
            wordcloud: settings.wordcloud.clone(),
            prompt_char_budget: settings.llm.prompt_char_budget,
        })
    }
}

/// Runs the analysis pipeline over one vector directory.
pub struct PostProcessor<'a> {
    options: AnalysisOptions,
    generator: Option<&'a dyn TextGenerator>,
}

impl<'a> PostProcessor<'a> {
    /// Processor without an LLM; cluster descriptions are skipped.
    #[must_use]
    pub fn new(options: AnalysisOptions) -> Self {
        Self {
            options,
            generator: None,
        }
    }

    /// Uses `generator` for cluster descriptions.
    #[must_use]
    pub fn with_generator(mut self, generator: &'a dyn TextGenerator) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Runs every stage and writes the JSON report and HTML page.
    ///
    /// An empty directory, or one without usable embeddings, yields a run
    /// with no result and writes nothing.
    ///
    /// # Errors
    /// Fails when the input directory cannot be listed or a numeric stage
    /// rejects its input.
    pub fn run_full_analysis(&self) -> RunResult<AnalysisRun> {
        info!("Starting post-processing analysis...");
        info!("Loading document vectors from {}", self.options.input_dir.display());
        let records = load_document_vectors(&self.options.input_dir)?;
        info!("Loaded {} documents", records.len());

        let Some((result, narrations)) = self.analyze(&records)? else {
            return Ok(AnalysisRun::default());
        };

        let json_saved = save_analysis_results(&self.options.output_json, Some(&result));
        if json_saved {
            info!("Saved analysis results to {}", self.options.output_json.display());
        }
        let html_saved = create_visualization_html(&result, &self.options.output_html);
        if html_saved {
            info!("Saved visualization to {}", self.options.output_html.display());
        }

        info!("Analysis complete");
        Ok(AnalysisRun {
            result: Some(result),
            narrations,
            json_saved,
            html_saved,
        })
    }

    /// Runs the in-memory stages over already loaded records.
    ///
    /// Returns `None` for an empty corpus. Word clouds are still written
    /// to the output directory.
    ///
    /// # Errors
    /// Fails when a numeric stage rejects its input.
    pub fn analyze(
        &self,
        records: &[DocumentVector],
    ) -> RunResult<Option<(AnalysisResult, Vec<ClusterNarration>)>> {
        if records.is_empty() {
            info!("No documents found. Exiting.");
            return Ok(None);
        }

        let matrix = EmbeddingMatrix::from_records(records);
        info!(
            "Embedding matrix shape: ({}, {})",
            matrix.len(),
            matrix.dimension()
        );
        if matrix.missing_embeddings() > 0 {
            warn!(
                "{} documents have no embedding and are excluded",
                matrix.missing_embeddings()
            );
        }
        if matrix.is_empty() {
            info!("No valid embeddings found. Exiting.");
            return Ok(None);
        }

        let options = &self.options;
        info!("Clustering documents using {}...", options.clustering_method);
        let labels = cluster_documents(
            matrix.rows(),
            options.n_clusters,
            options.clustering_method,
            &options.clustering,
        )?;
        let n_clusters = labels.iter().collect::<BTreeSet<_>>().len();
        info!("Found {n_clusters} clusters");

        self.ensure_output_dir();
        let narrator = ClusterNarrator::new(self.generator, options.output_dir.clone())
            .with_wordcloud_params(options.wordcloud.clone())
            .with_prompt_char_budget(options.prompt_char_budget);
        let narrations = narrator.narrate_all(&matrix, &labels);

        info!("Computing similarity matrix ({})...", options.similarity_metric);
        let similarity = compute_similarity_matrix(matrix.rows(), options.similarity_metric)?;

        info!("Creating network graph...");
        let doc_ids: Vec<String> = matrix
            .documents()
            .iter()
            .map(|doc| doc.document_id.clone())
            .collect();
        let graph = build_network_graph(&similarity, &doc_ids, options.network_threshold)?;
        info!(
            "Network has {} nodes and {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        info!("Applying t-SNE dimensionality reduction...");
        let tsne_coordinates = apply_tsne(matrix.rows(), &options.projection)?;

        let cluster_summaries = narrations
            .iter()
            .filter_map(|n| n.summary.produced().map(|text| (n.label, text.clone())))
            .collect();
        let cluster_wordclouds = narrations
            .iter()
            .filter_map(|n| {
                n.wordcloud
                    .produced()
                    .map(|path| (n.label, path.to_string_lossy().into_owned()))
            })
            .collect();

        let result = AnalysisResult {
            n_documents: records.len(),
            embedding_dimension: matrix.dimension(),
            n_clusters,
            cluster_labels: labels,
            cluster_summaries,
            cluster_wordclouds,
            similarity_matrix: similarity,
            network_graph: graph,
            tsne_coordinates,
            document_metadata: matrix.documents().iter().map(DocumentReference::from).collect(),
        };

        Ok(Some((result, narrations)))
    }

    fn ensure_output_dir(&self) {
        let dir = &self.options.output_dir;
        if dir.as_os_str().is_empty() || dir.is_dir() {
            return;
        }
        if let Err(e) = std::fs::create_dir_all(dir) {
            warn!("Cannot create output directory {}: {e}", dir.display());
        }
    }
}
