//! JSON conversion of analysis results.
//!
//! Everything that reaches the report goes through [`ResultValue`], a
//! closed set of shapes: scalars, sequences, ordered mappings, numeric
//! matrices and document graphs. [`serialize`] turns a value into plain
//! JSON (matrices become nested arrays of numbers, graphs become
//! node-link objects). Values that are already JSON pass through
//! untouched.

use crate::analysis::AnalysisResult;
use crate::error::{AnalysisError, RunResult};
use crate::network::DocumentGraph;
use serde_json::{Map, Number, Value};
use std::path::Path;

/// A value that can appear in an analysis report.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Sequence(Vec<ResultValue>),
    /// Key order is preserved in the output
    Mapping(Vec<(String, ResultValue)>),
    Matrix(Vec<Vec<f64>>),
    Graph(DocumentGraph),
    /// Pre-built JSON, emitted as is
    Json(Value),
}

impl ResultValue {
    /// Builds a mapping from `(key, value)` pairs.
    pub fn mapping<K: Into<String>>(entries: impl IntoIterator<Item = (K, ResultValue)>) -> Self {
        Self::Mapping(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    fn count(n: usize) -> Self {
        Self::Int(i64::try_from(n).unwrap_or(i64::MAX))
    }
}

/// Converts `value` into plain JSON.
///
/// Non-finite floats have no JSON form and become `null`.
#[must_use]
pub fn serialize(value: &ResultValue) -> Value {
    match value {
        ResultValue::Null => Value::Null,
        ResultValue::Bool(b) => Value::Bool(*b),
        ResultValue::Int(i) => Value::Number((*i).into()),
        ResultValue::Float(f) => float(*f),
        ResultValue::Text(s) => Value::String(s.clone()),
        ResultValue::Sequence(items) => Value::Array(items.iter().map(serialize).collect()),
        ResultValue::Mapping(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), serialize(item));
            }
            Value::Object(map)
        }
        ResultValue::Matrix(rows) => Value::Array(
            rows.iter()
                .map(|row| Value::Array(row.iter().copied().map(float).collect()))
                .collect(),
        ),
        ResultValue::Graph(graph) => {
            serde_json::to_value(graph.to_node_link()).unwrap_or(Value::Null)
        }
        ResultValue::Json(json) => json.clone(),
    }
}

fn float(f: f64) -> Value {
    Number::from_f64(f).map_or(Value::Null, Value::Number)
}

impl From<&AnalysisResult> for ResultValue {
    fn from(result: &AnalysisResult) -> Self {
        let labels = result
            .cluster_labels
            .iter()
            .map(|l| ResultValue::Int(i64::from(l.get())))
            .collect();
        let summaries = result
            .cluster_summaries
            .iter()
            .map(|(label, text)| (label.to_string(), ResultValue::Text(text.clone())));
        let wordclouds = result
            .cluster_wordclouds
            .iter()
            .map(|(label, path)| (label.to_string(), ResultValue::Text(path.clone())));
        let metadata = result
            .document_metadata
            .iter()
            .map(|doc| {
                ResultValue::mapping([
                    ("document_id", ResultValue::Text(doc.document_id.clone())),
                    ("title", ResultValue::Text(doc.title.clone())),
                    ("author", ResultValue::Text(doc.author.clone())),
                ])
            })
            .collect();

        ResultValue::mapping([
            ("n_documents", ResultValue::count(result.n_documents)),
            (
                "embedding_dimension",
                ResultValue::count(result.embedding_dimension),
            ),
            ("n_clusters", ResultValue::count(result.n_clusters)),
            ("cluster_labels", ResultValue::Sequence(labels)),
            ("cluster_summaries", ResultValue::mapping(summaries)),
            ("cluster_wordclouds", ResultValue::mapping(wordclouds)),
            (
                "similarity_matrix",
                ResultValue::Matrix(result.similarity_matrix.rows().to_vec()),
            ),
            (
                "network_graph",
                ResultValue::Graph(result.network_graph.clone()),
            ),
            (
                "tsne_coordinates",
                ResultValue::Matrix(result.tsne_coordinates.clone()),
            ),
            ("document_metadata", ResultValue::Sequence(metadata)),
        ])
    }
}

/// Report JSON for `result`; `{}` when the run produced nothing.
#[must_use]
pub fn analysis_to_json(result: Option<&AnalysisResult>) -> Value {
    match result {
        Some(result) => serialize(&ResultValue::from(result)),
        None => Value::Object(Map::new()),
    }
}

/// Writes the report as pretty-printed UTF-8 JSON.
///
/// # Errors
/// Returns [`AnalysisError::FileWrite`] when the file cannot be written.
pub fn write_analysis_results(path: &Path, result: Option<&AnalysisResult>) -> RunResult<()> {
    let json = analysis_to_json(result);
    let text = serde_json::to_string_pretty(&json)
        .map_err(|e| AnalysisError::General(format!("Failed to encode analysis results: {e}")))?;
    std::fs::write(path, text).map_err(|source| AnalysisError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes the report and reports success as a flag; failures are logged.
pub fn save_analysis_results(path: &Path, result: Option<&AnalysisResult>) -> bool {
    match write_analysis_results(path, result) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Error saving analysis results: {e}");
            false
        }
    }
}
