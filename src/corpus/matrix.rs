//! Builds the embedding matrix from loaded records.
//!
//! The matrix never exists apart from the records its rows came from:
//! documents and embedding rows are filtered together, once, and every
//! later stage reads both through the same [`EmbeddingMatrix`]. Row `i`
//! always belongs to `documents()[i]`.

use crate::corpus::record::DocumentVector;
use std::collections::BTreeSet;
use tracing::warn;

/// Documents with a usable embedding, paired with their embedding rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmbeddingMatrix {
    documents: Vec<DocumentVector>,
    rows: Vec<Vec<f64>>,
    missing_embeddings: usize,
    dropped_for_dimension: usize,
}

impl EmbeddingMatrix {
    /// Extracts embeddings from `records`, keeping load order.
    ///
    /// Records without a usable embedding contribute no row. When the
    /// remaining embeddings disagree on length, only those of the most
    /// frequent length are kept (ties go to the length seen first) and a
    /// warning names the lengths that were seen.
    #[must_use]
    pub fn from_records(records: &[DocumentVector]) -> Self {
        let mut candidates: Vec<(&DocumentVector, Vec<f64>)> = Vec::with_capacity(records.len());
        let mut missing_embeddings = 0;
        for record in records {
            match record.vector.embedding_values() {
                Some(values) => candidates.push((record, values)),
                None => missing_embeddings += 1,
            }
        }

        let Some(target) = most_common_length(candidates.iter().map(|(_, v)| v.len())) else {
            return Self {
                missing_embeddings,
                ..Self::default()
            };
        };

        let lengths: BTreeSet<usize> = candidates.iter().map(|(_, v)| v.len()).collect();
        if lengths.len() > 1 {
            warn!("Inconsistent embedding dimensions: {lengths:?}; keeping dimension {target}");
        }

        let before = candidates.len();
        let (documents, rows): (Vec<DocumentVector>, Vec<Vec<f64>>) = candidates
            .into_iter()
            .filter(|(_, values)| values.len() == target)
            .map(|(record, values)| (record.clone(), values))
            .unzip();

        Self {
            dropped_for_dimension: before - rows.len(),
            documents,
            rows,
            missing_embeddings,
        }
    }

    /// Number of rows (documents with a kept embedding).
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column count, 0 for an empty matrix.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    /// Embedding rows in load order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Records aligned with [`rows`](Self::rows).
    #[must_use]
    pub fn documents(&self) -> &[DocumentVector] {
        &self.documents
    }

    /// `(record, row)` pairs in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&DocumentVector, &[f64])> {
        self.documents
            .iter()
            .zip(self.rows.iter().map(Vec::as_slice))
    }

    /// Records skipped for lacking a usable embedding.
    #[must_use]
    pub fn missing_embeddings(&self) -> usize {
        self.missing_embeddings
    }

    /// Records skipped because their embedding length was in the minority.
    #[must_use]
    pub fn dropped_for_dimension(&self) -> usize {
        self.dropped_for_dimension
    }
}

/// Most frequent value, ties resolved in favor of the first one seen.
fn most_common_length(lengths: impl Iterator<Item = usize>) -> Option<usize> {
    let mut counts: Vec<(usize, usize)> = Vec::new();
    for length in lengths {
        match counts.iter_mut().find(|(l, _)| *l == length) {
            Some((_, count)) => *count += 1,
            None => counts.push((length, 1)),
        }
    }

    let mut best: Option<(usize, usize)> = None;
    for (length, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((length, count));
        }
    }
    best.map(|(length, _)| length)
}
