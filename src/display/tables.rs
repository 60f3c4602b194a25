//! Table formatting utilities for analysis summaries.

use crate::analysis::{AnalysisOptions, AnalysisRun};
use crate::narration::{NarrationOutcome, SkipReason};
use comfy_table::{
    Attribute, Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

/// Descriptions longer than this are cut in the cluster table.
const SUMMARY_PREVIEW_CHARS: usize = 60;

/// Builder for creating formatted tables.
pub struct TableBuilder {
    table: Table,
}

impl Default for TableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TableBuilder {
    /// Create a new table builder.
    pub fn new() -> Self {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.apply_modifier(UTF8_ROUND_CORNERS);
        Self { table }
    }

    /// Set the table headers.
    pub fn set_headers(mut self, headers: Vec<&str>) -> Self {
        let header_cells: Vec<Cell> = headers
            .into_iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect();
        self.table.set_header(header_cells);
        self
    }

    /// Add a row to the table.
    pub fn add_row(mut self, row: Vec<String>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Add a row from prebuilt cells.
    pub fn add_cells(mut self, row: Vec<Cell>) -> Self {
        self.table.add_row(row);
        self
    }

    /// Build and return the formatted table.
    pub fn build(self) -> String {
        self.table.to_string()
    }
}

/// Headline numbers of a finished run.
pub fn create_summary_table(run: &AnalysisRun, options: &AnalysisOptions) -> String {
    let mut builder = TableBuilder::new().set_headers(vec!["Metric", "Value"]);

    let Some(result) = &run.result else {
        return builder
            .add_row(vec!["Documents".to_string(), "0".to_string()])
            .build();
    };

    let narrated = run
        .narrations
        .iter()
        .filter(|n| n.summary.is_produced())
        .count();

    builder = builder
        .add_row(vec!["Documents loaded".into(), result.n_documents.to_string()])
        .add_row(vec![
            "Documents analysed".into(),
            result.cluster_labels.len().to_string(),
        ])
        .add_row(vec![
            "Embedding dimension".into(),
            result.embedding_dimension.to_string(),
        ])
        .add_row(vec![
            "Clusters".into(),
            format!("{} ({})", result.n_clusters, options.clustering_method),
        ])
        .add_row(vec![
            "Network edges".into(),
            format!(
                "{} ({} >= {})",
                result.network_graph.edge_count(),
                options.similarity_metric,
                options.network_threshold
            ),
        ])
        .add_row(vec![
            "Narrated clusters".into(),
            format!("{narrated}/{}", run.narrations.len()),
        ])
        .add_row(vec![
            "Word clouds".into(),
            result.cluster_wordclouds.len().to_string(),
        ]);

    for (name, path, saved) in [
        ("JSON report", &options.output_json, run.json_saved),
        ("HTML page", &options.output_html, run.html_saved),
    ] {
        let (text, color) = if saved {
            (format!("✓ {}", path.display()), Color::Green)
        } else {
            (format!("✗ {} (not written)", path.display()), Color::Red)
        };
        builder = builder.add_cells(vec![Cell::new(name), Cell::new(text).fg(color)]);
    }

    builder.build()
}

/// One row per cluster: size, description status and word cloud.
pub fn create_cluster_table(run: &AnalysisRun) -> String {
    let mut builder =
        TableBuilder::new().set_headers(vec!["Cluster", "Documents", "Description", "Word cloud"]);

    let Some(result) = &run.result else {
        return builder.build();
    };

    for (label, size) in result.cluster_sizes() {
        let narration = run.narrations.iter().find(|n| n.label == label);
        let (description, cloud) = match narration {
            Some(n) => (summary_cell(&n.summary), wordcloud_cell(&n.wordcloud)),
            None => ("-".to_string(), "-".to_string()),
        };
        let name = if label.is_noise() {
            "noise".to_string()
        } else {
            label.to_string()
        };
        builder = builder.add_row(vec![name, size.to_string(), description, cloud]);
    }

    builder.build()
}

fn summary_cell(outcome: &NarrationOutcome<String>) -> String {
    match outcome {
        NarrationOutcome::Produced(text) => {
            let mut preview: String = text.chars().take(SUMMARY_PREVIEW_CHARS).collect();
            if text.chars().count() > SUMMARY_PREVIEW_CHARS {
                preview.push('…');
            }
            preview
        }
        NarrationOutcome::Skipped(reason) => skip_text(reason),
    }
}

fn wordcloud_cell(outcome: &NarrationOutcome<std::path::PathBuf>) -> String {
    match outcome {
        NarrationOutcome::Produced(path) => path.display().to_string(),
        NarrationOutcome::Skipped(reason) => skip_text(reason),
    }
}

fn skip_text(reason: &SkipReason) -> String {
    match reason {
        SkipReason::Disabled => "(disabled)".to_string(),
        SkipReason::EmptyText => "(no text)".to_string(),
        SkipReason::Failed(_) => "(failed)".to_string(),
    }
}
