//! Cluster narration: an LLM-written theme description and a word cloud
//! per cluster.
//!
//! Both products are best effort. Each one comes back as a
//! [`NarrationOutcome`] that says whether it was produced or why it was
//! skipped, and no failure here ever aborts an analysis run. Noise
//! documents (label `-1`) are never narrated.

mod glyphs;
mod ollama;
mod prompt;
mod wordcloud;

pub use ollama::{LlmError, OllamaClient, TextGenerator};
pub use prompt::{DEFAULT_PROMPT_CHAR_BUDGET, build_cluster_prompt, combined_cluster_text};
pub use wordcloud::{
    PlacedWord, WordCloudError, WordCloudParams, render_wordcloud, word_frequencies,
    write_wordcloud,
};

use crate::corpus::{DocumentVector, EmbeddingMatrix};
use crate::vector::ClusterLabel;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of one best-effort narration step.
#[derive(Debug, Clone, PartialEq)]
pub enum NarrationOutcome<T> {
    Produced(T),
    Skipped(SkipReason),
}

impl<T> NarrationOutcome<T> {
    #[must_use]
    pub fn produced(&self) -> Option<&T> {
        match self {
            Self::Produced(value) => Some(value),
            Self::Skipped(_) => None,
        }
    }

    #[must_use]
    pub fn is_produced(&self) -> bool {
        matches!(self, Self::Produced(_))
    }
}

/// Why a narration step produced nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    /// No text generator configured for this run
    Disabled,
    /// Cluster members carry no usable text
    EmptyText,
    /// The step was attempted and failed
    Failed(String),
}

/// Narration products for one cluster.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterNarration {
    pub label: ClusterLabel,
    pub size: usize,
    pub summary: NarrationOutcome<String>,
    pub wordcloud: NarrationOutcome<PathBuf>,
}

/// File name of a cluster's word-cloud image.
#[must_use]
pub fn wordcloud_file_name(label: ClusterLabel) -> String {
    format!("cluster_{label}_wordcloud.png")
}

/// Produces per-cluster descriptions and word clouds.
pub struct ClusterNarrator<'a> {
    generator: Option<&'a dyn TextGenerator>,
    output_dir: PathBuf,
    wordcloud: WordCloudParams,
    prompt_char_budget: usize,
}

impl<'a> ClusterNarrator<'a> {
    /// Narrator writing word clouds into `output_dir`.
    ///
    /// With no generator every summary is skipped as
    /// [`SkipReason::Disabled`]; word clouds are still drawn.
    #[must_use]
    pub fn new(generator: Option<&'a dyn TextGenerator>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            generator,
            output_dir: output_dir.into(),
            wordcloud: WordCloudParams::default(),
            prompt_char_budget: DEFAULT_PROMPT_CHAR_BUDGET,
        }
    }

    #[must_use]
    pub fn with_wordcloud_params(mut self, params: WordCloudParams) -> Self {
        self.wordcloud = params;
        self
    }

    #[must_use]
    pub fn with_prompt_char_budget(mut self, budget: usize) -> Self {
        self.prompt_char_budget = budget;
        self
    }

    /// Where the word cloud for `label` is written.
    ///
    /// A bare file name when the output directory is the working directory.
    #[must_use]
    pub fn wordcloud_path(&self, label: ClusterLabel) -> PathBuf {
        let name = wordcloud_file_name(label);
        if self.output_dir.as_os_str().is_empty() || self.output_dir == Path::new(".") {
            PathBuf::from(name)
        } else {
            self.output_dir.join(name)
        }
    }

    /// Narrates every non-noise cluster in ascending label order.
    ///
    /// `labels[i]` belongs to `matrix.documents()[i]`.
    pub fn narrate_all(
        &self,
        matrix: &EmbeddingMatrix,
        labels: &[ClusterLabel],
    ) -> Vec<ClusterNarration> {
        let clusters: BTreeSet<ClusterLabel> =
            labels.iter().copied().filter(|l| !l.is_noise()).collect();

        clusters
            .into_iter()
            .map(|label| {
                let members: Vec<&DocumentVector> = matrix
                    .documents()
                    .iter()
                    .zip(labels)
                    .filter(|(_, l)| **l == label)
                    .map(|(doc, _)| doc)
                    .collect();
                info!("Processing cluster {label} ({} documents)", members.len());
                self.narrate_cluster(label, &members)
            })
            .collect()
    }

    /// Draws the word cloud and requests the description for one cluster.
    pub fn narrate_cluster(
        &self,
        label: ClusterLabel,
        members: &[&DocumentVector],
    ) -> ClusterNarration {
        let titles: Vec<&str> = members.iter().map(|d| d.metadata.title.as_str()).collect();
        let summaries: Vec<&str> = members
            .iter()
            .map(|d| d.metadata.summary.as_str())
            .collect();

        let wordcloud = self.draw_wordcloud(label, &summaries.join(" "));
        let summary = self.describe(label, &titles, &summaries);

        ClusterNarration {
            label,
            size: members.len(),
            summary,
            wordcloud,
        }
    }

    fn draw_wordcloud(&self, label: ClusterLabel, text: &str) -> NarrationOutcome<PathBuf> {
        if text.trim().is_empty() {
            debug!("Cluster {label} has no summary text for a word cloud");
            return NarrationOutcome::Skipped(SkipReason::EmptyText);
        }

        let path = self.wordcloud_path(label);
        match write_wordcloud(text, &path, &self.wordcloud) {
            Ok(()) => {
                info!("  Generated word cloud: {}", path.display());
                NarrationOutcome::Produced(path)
            }
            Err(WordCloudError::EmptyText | WordCloudError::NoWords) => {
                debug!("Cluster {label} has no words for a word cloud");
                NarrationOutcome::Skipped(SkipReason::EmptyText)
            }
            Err(e) => {
                warn!("Failed to generate word cloud for cluster {label}: {e}");
                NarrationOutcome::Skipped(SkipReason::Failed(e.to_string()))
            }
        }
    }

    fn describe(
        &self,
        label: ClusterLabel,
        titles: &[&str],
        summaries: &[&str],
    ) -> NarrationOutcome<String> {
        let Some(generator) = self.generator else {
            return NarrationOutcome::Skipped(SkipReason::Disabled);
        };

        let prompt = build_cluster_prompt(titles, summaries, self.prompt_char_budget);
        match generator.generate(&prompt) {
            Ok(text) if !text.trim().is_empty() => {
                let text = text.trim().to_string();
                let preview: String = text.chars().take(100).collect();
                info!("  LLM summary: {preview}...");
                NarrationOutcome::Produced(text)
            }
            Ok(_) => {
                warn!("LLM returned an empty summary for cluster {label}");
                NarrationOutcome::Skipped(SkipReason::Failed("empty response".to_string()))
            }
            Err(e) => {
                warn!("LLM cluster summary failed for cluster {label}: {e}");
                NarrationOutcome::Skipped(SkipReason::Failed(e.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::{DocumentMetadata, VectorPayload};
    use std::cell::RefCell;
    use tempfile::TempDir;

    struct Canned(&'static str);

    impl TextGenerator for Canned {
        fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Ok(self.0.to_string())
        }
    }

    struct Failing;

    impl TextGenerator for Failing {
        fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::Status {
                status: 500,
                body: "model not loaded".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct Recording {
        prompts: RefCell<Vec<String>>,
    }

    impl TextGenerator for Recording {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            Ok(" Theme. ".to_string())
        }
    }

    fn doc(id: &str, title: &str, summary: &str, embedding: Vec<f64>) -> DocumentVector {
        DocumentVector {
            document_id: id.to_string(),
            index: 0,
            metadata: DocumentMetadata {
                title: title.to_string(),
                summary: summary.to_string(),
                ..DocumentMetadata::default()
            },
            text_data: Default::default(),
            vector: VectorPayload {
                embedding: Some(serde_json::json!(embedding)),
                ..VectorPayload::default()
            },
        }
    }

    fn corpus() -> EmbeddingMatrix {
        EmbeddingMatrix::from_records(&[
            doc("a", "Graph Learning", "graph neural networks", vec![1.0, 0.0]),
            doc("b", "Citation Graphs", "citation graph analysis", vec![0.9, 0.1]),
            doc("c", "Soil Chemistry", "soil nitrogen chemistry", vec![0.0, 1.0]),
            doc("d", "Outlier", "unrelated outlier", vec![0.5, 0.5]),
        ])
    }

    fn labels(raw: &[i32]) -> Vec<ClusterLabel> {
        raw.iter().copied().map(ClusterLabel::new).collect()
    }

    #[test]
    fn test_noise_is_not_narrated() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Canned("Graph research.");
        let narrator = ClusterNarrator::new(Some(&generator), temp_dir.path());

        let narrations = narrator.narrate_all(&corpus(), &labels(&[0, 0, 1, -1]));
        let narrated: Vec<i32> = narrations.iter().map(|n| n.label.get()).collect();
        assert_eq!(narrated, vec![0, 1]);
        assert_eq!(narrations[0].size, 2);
        assert_eq!(
            narrations[0].summary,
            NarrationOutcome::Produced("Graph research.".to_string())
        );
        let path = narrations[0].wordcloud.produced().unwrap();
        assert!(path.ends_with("cluster_0_wordcloud.png"));
        assert!(path.exists());
        assert!(!temp_dir.path().join("cluster_-1_wordcloud.png").exists());
    }

    #[test]
    fn test_failing_generator_degrades() {
        let temp_dir = TempDir::new().unwrap();
        let narrator = ClusterNarrator::new(Some(&Failing), temp_dir.path());
        let narrations = narrator.narrate_all(&corpus(), &labels(&[0, 0, 1, 1]));
        assert_eq!(narrations.len(), 2);
        for narration in &narrations {
            assert!(matches!(
                narration.summary,
                NarrationOutcome::Skipped(SkipReason::Failed(_))
            ));
            assert!(narration.wordcloud.is_produced());
        }
    }

    #[test]
    fn test_disabled_generator_and_blank_summaries() {
        let temp_dir = TempDir::new().unwrap();
        let narrator = ClusterNarrator::new(None, temp_dir.path());
        let blank = doc("x", "Untitled", "   ", vec![1.0]);
        let narration = narrator.narrate_cluster(ClusterLabel::new(3), &[&blank]);
        assert_eq!(
            narration.summary,
            NarrationOutcome::Skipped(SkipReason::Disabled)
        );
        assert_eq!(
            narration.wordcloud,
            NarrationOutcome::Skipped(SkipReason::EmptyText)
        );
    }

    #[test]
    fn test_empty_response_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Canned("   ");
        let narrator = ClusterNarrator::new(Some(&generator), temp_dir.path());
        let member = doc("x", "T", "some text here", vec![1.0]);
        let narration = narrator.narrate_cluster(ClusterLabel::new(0), &[&member]);
        assert!(!narration.summary.is_produced());
    }

    #[test]
    fn test_prompt_lists_cluster_titles_and_trims_response() {
        let temp_dir = TempDir::new().unwrap();
        let generator = Recording::default();
        let narrator =
            ClusterNarrator::new(Some(&generator), temp_dir.path()).with_prompt_char_budget(5000);
        let narrations = narrator.narrate_all(&corpus(), &labels(&[0, 0, 1, 1]));

        let prompts = generator.prompts.borrow();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].contains("- Graph Learning\n- Citation Graphs"));
        assert!(!prompts[0].contains("Soil Chemistry"));
        assert_eq!(narrations[0].summary.produced().map(String::as_str), Some("Theme."));
    }

    #[test]
    fn test_wordcloud_path_in_working_directory() {
        let narrator = ClusterNarrator::new(None, ".");
        assert_eq!(
            narrator.wordcloud_path(ClusterLabel::new(2)),
            PathBuf::from("cluster_2_wordcloud.png")
        );
        let narrator = ClusterNarrator::new(None, "out");
        assert_eq!(
            narrator.wordcloud_path(ClusterLabel::new(2)),
            PathBuf::from("out/cluster_2_wordcloud.png")
        );
    }
}
