//! Thresholded document similarity network.
//!
//! A minimal owned edge list: nodes are document ids in matrix order and
//! edges reference nodes by position. Export follows the node-link shape
//! (`{nodes: [{id}], links: [{source, target, weight}]}`) that graph
//! viewers and the JSON report consume.

use crate::vector::{SimilarityMatrix, VectorError, VectorResult};
use serde::{Deserialize, Serialize};

/// Undirected weighted edge between two node positions, `source < target`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraphEdge {
    pub source: usize,
    pub target: usize,
    pub weight: f64,
}

/// Undirected document graph without self-loops or parallel edges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentGraph {
    nodes: Vec<String>,
    edges: Vec<GraphEdge>,
}

impl DocumentGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a node and returns its position.
    pub fn add_node(&mut self, id: impl Into<String>) -> usize {
        self.nodes.push(id.into());
        self.nodes.len() - 1
    }

    /// Adds an undirected edge between two existing nodes.
    ///
    /// Returns `false` without changing the graph for self-loops, unknown
    /// positions and pairs that are already connected.
    pub fn add_edge(&mut self, a: usize, b: usize, weight: f64) -> bool {
        if a == b || a >= self.nodes.len() || b >= self.nodes.len() {
            return false;
        }
        let (source, target) = if a < b { (a, b) } else { (b, a) };
        if self
            .edges
            .iter()
            .any(|e| e.source == source && e.target == target)
        {
            return false;
        }
        self.edges.push(GraphEdge {
            source,
            target,
            weight,
        });
        true
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    #[must_use]
    pub fn nodes(&self) -> &[String] {
        &self.nodes
    }

    #[must_use]
    pub fn edges(&self) -> &[GraphEdge] {
        &self.edges
    }

    /// Number of edges touching the node at `position`.
    #[must_use]
    pub fn degree(&self, position: usize) -> usize {
        self.edges
            .iter()
            .filter(|e| e.source == position || e.target == position)
            .count()
    }

    /// Node-link form with edges referencing node ids.
    #[must_use]
    pub fn to_node_link(&self) -> NodeLinkData {
        NodeLinkData {
            directed: false,
            multigraph: false,
            graph: serde_json::Map::new(),
            nodes: self
                .nodes
                .iter()
                .map(|id| NodeEntry { id: id.clone() })
                .collect(),
            links: self
                .edges
                .iter()
                .map(|e| LinkEntry {
                    source: self.nodes[e.source].clone(),
                    target: self.nodes[e.target].clone(),
                    weight: e.weight,
                })
                .collect(),
        }
    }
}

/// Serialized node-link graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeLinkData {
    #[serde(default)]
    pub directed: bool,
    #[serde(default)]
    pub multigraph: bool,
    #[serde(default)]
    pub graph: serde_json::Map<String, serde_json::Value>,
    pub nodes: Vec<NodeEntry>,
    pub links: Vec<LinkEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEntry {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkEntry {
    pub source: String,
    pub target: String,
    pub weight: f64,
}

/// Builds the similarity network for `doc_ids`.
///
/// Every id becomes a node, including ones left without edges. Each
/// unordered pair `i < j` is linked when `similarity[i][j] >= threshold`,
/// weighted by that similarity.
///
/// # Errors
/// Returns [`VectorError::DimensionMismatch`] when the id list and the
/// matrix disagree on the number of documents.
pub fn build_network_graph(
    similarity: &SimilarityMatrix,
    doc_ids: &[String],
    threshold: f64,
) -> VectorResult<DocumentGraph> {
    if similarity.len() != doc_ids.len() {
        return Err(VectorError::DimensionMismatch {
            expected: doc_ids.len(),
            actual: similarity.len(),
        });
    }

    let mut graph = DocumentGraph::new();
    for id in doc_ids {
        graph.add_node(id.as_str());
    }

    let n = doc_ids.len();
    for i in 0..n {
        for j in (i + 1)..n {
            let value = similarity.get(i, j);
            if value >= threshold {
                graph.edges.push(GraphEdge {
                    source: i,
                    target: j,
                    weight: value,
                });
            }
        }
    }

    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vector::{SimilarityMetric, compute_similarity_matrix};

    fn ids(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("doc{i}")).collect()
    }

    #[test]
    fn test_add_edge_rejects_loops_and_duplicates() {
        let mut graph = DocumentGraph::new();
        let a = graph.add_node("a");
        let b = graph.add_node("b");
        assert!(graph.add_edge(a, b, 0.9));
        assert!(!graph.add_edge(b, a, 0.9));
        assert!(!graph.add_edge(a, a, 1.0));
        assert!(!graph.add_edge(a, 7, 0.5));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.degree(a), 1);
    }

    #[test]
    fn test_isolated_nodes_are_kept() {
        let similarity = SimilarityMatrix::from_rows(vec![
            vec![1.0, 0.1, 0.2],
            vec![0.1, 1.0, 0.3],
            vec![0.2, 0.3, 1.0],
        ]);
        let graph = build_network_graph(&similarity, &ids(3), 0.9).unwrap();
        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let similarity = SimilarityMatrix::from_rows(vec![vec![1.0, 0.7], vec![0.7, 1.0]]);
        let graph = build_network_graph(&similarity, &ids(2), 0.7).unwrap();
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.edges()[0].weight, 0.7);
    }

    #[test]
    fn test_threshold_sweep_is_non_increasing() {
        let matrix: Vec<Vec<f64>> = (0..8)
            .map(|i| {
                let t = f64::from(i);
                vec![t.sin(), t.cos(), (t * 0.5).sin() + 1.0, 0.3 * t]
            })
            .collect();
        let similarity = compute_similarity_matrix(&matrix, SimilarityMetric::Cosine).unwrap();

        let mut previous = usize::MAX;
        for step in 0..=20 {
            let threshold = -1.0 + f64::from(step) * 0.1;
            let graph = build_network_graph(&similarity, &ids(8), threshold).unwrap();
            assert_eq!(graph.node_count(), 8);
            assert!(graph.edge_count() <= previous);
            previous = graph.edge_count();
        }
    }

    #[test]
    fn test_close_documents_connect_at_high_threshold() {
        let matrix = vec![
            vec![0.1, 0.2, 0.3, 0.4, 0.5],
            vec![0.15, 0.25, 0.35, 0.45, 0.55],
            vec![0.9, 0.8, 0.7, 0.6, 0.5],
        ];
        let similarity = compute_similarity_matrix(&matrix, SimilarityMetric::Cosine).unwrap();
        assert!(similarity.get(0, 1) > similarity.get(0, 2));

        let graph = build_network_graph(&similarity, &ids(3), 0.99).unwrap();
        assert_eq!(graph.edge_count(), 1);
        let edge = graph.edges()[0];
        assert_eq!((edge.source, edge.target), (0, 1));
        assert_eq!(graph.degree(2), 0);
    }

    #[test]
    fn test_node_link_export() {
        let similarity = SimilarityMatrix::from_rows(vec![vec![1.0, 0.8], vec![0.8, 1.0]]);
        let graph = build_network_graph(&similarity, &ids(2), 0.5).unwrap();
        let data = graph.to_node_link();
        assert!(!data.directed);
        assert_eq!(data.nodes.len(), 2);
        assert_eq!(data.links[0].source, "doc1");
        assert_eq!(data.links[0].target, "doc2");

        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["links"][0]["weight"], 0.8);
        assert_eq!(json["nodes"][1]["id"], "doc2");
    }

    #[test]
    fn test_mismatched_ids_are_rejected() {
        let similarity = SimilarityMatrix::from_rows(vec![vec![1.0]]);
        let result = build_network_graph(&similarity, &ids(2), 0.5);
        assert!(matches!(
            result,
            Err(VectorError::DimensionMismatch { expected: 2, actual: 1 })
        ));
    }
}
