//! Document similarity network.

mod graph;

pub use graph::{
    DocumentGraph, GraphEdge, LinkEntry, NodeEntry, NodeLinkData, build_network_graph,
};
