//! Persisted per-document vector records.
//!
//! One JSON file per document, written by the production stage. Records
//! are read-only here; unknown fields are ignored and missing optional
//! sections fall back to empty values so older files still load.

use serde::{Deserialize, Deserializer, Serialize};

/// File-name suffix that marks a vector record.
pub const VECTOR_FILE_SUFFIX: &str = "_vector.json";

/// One document's metadata, extracted text and embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentVector {
    /// Stable identifier, unique within a corpus
    pub document_id: String,

    /// 1-based ordinal assigned at production time
    #[serde(default)]
    pub index: u64,

    #[serde(default)]
    pub metadata: DocumentMetadata,

    #[serde(default)]
    pub text_data: TextData,

    #[serde(default)]
    pub vector: VectorPayload,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    #[serde(default, deserialize_with = "nullable_string")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub author: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub url: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub source_urls: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub created_at: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub model_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextData {
    /// Extracted text, truncated upstream
    #[serde(default, deserialize_with = "nullable_string")]
    pub extracted_text: String,
    #[serde(default)]
    pub total_characters: u64,
    #[serde(default, deserialize_with = "nullable_string")]
    pub analysis_text: String,
    #[serde(default)]
    pub analysis_characters: u64,
}

/// Embedding section of a record.
///
/// The embedding is kept as raw JSON: absent, null, non-array and
/// non-numeric values all mean "no embedding" and are resolved by
/// [`VectorPayload::embedding_values`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VectorPayload {
    #[serde(default)]
    pub embedding: Option<serde_json::Value>,
    #[serde(default)]
    pub embedding_dimension: u64,
    #[serde(default, deserialize_with = "nullable_string")]
    pub embedding_type: String,
    #[serde(default, deserialize_with = "nullable_string")]
    pub note: String,
}

impl VectorPayload {
    /// Numeric embedding values, or `None` when the record carries no
    /// usable embedding (absent, null, not an array, empty, or holding a
    /// non-numeric element).
    #[must_use]
    pub fn embedding_values(&self) -> Option<Vec<f64>> {
        let values = self.embedding.as_ref()?.as_array()?;
        if values.is_empty() {
            return None;
        }
        values.iter().map(serde_json::Value::as_f64).collect()
    }
}

fn nullable_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}
