//! Graph node and edge model.
//!
//! Node identity is a value string: either a bare hostname or the hostname
//! followed by a cumulative path prefix. The same value string always
//! resolves to the same node; downstream importers upsert by identity.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Domain,
    Subdomain,
    Directory,
    Endpoint,
    /// Legacy leaf label kept in the vocabulary for importer compatibility.
    /// The canonical builders label extensioned terminals `Endpoint`.
    File,
    Asset,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Domain => "domain",
            NodeType::Subdomain => "subdomain",
            NodeType::Directory => "directory",
            NodeType::Endpoint => "endpoint",
            NodeType::File => "file",
            NodeType::Asset => "asset",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeType {
    Contains,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub value: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub source: String,
    pub target: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
}

/// The run's durable output: `{nodes, relationships}` for the front end and
/// the persistence importer. Both vectors are sorted by identity so repeated
/// builds from the same input serialize identically.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteGraph {
    pub nodes: Vec<Node>,
    pub relationships: Vec<Edge>,
}

impl SiteGraph {
    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }
}

/// Accumulates nodes and edges with identity-based deduplication.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: BTreeMap<String, NodeType>,
    edges: BTreeSet<(String, String)>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node unless the identity already exists; the earliest type
    /// wins, keeping merges monotonic regardless of input order.
    pub fn add_node(&mut self, value: &str, node_type: NodeType) {
        self.nodes.entry(value.to_string()).or_insert(node_type);
    }

    /// Insert a containment edge; duplicates are idempotent no-ops.
    pub fn add_edge(&mut self, source: &str, target: &str) {
        self.edges.insert((source.to_string(), target.to_string()));
    }

    pub fn finish(self) -> SiteGraph {
        SiteGraph {
            nodes: self
                .nodes
                .into_iter()
                .map(|(value, node_type)| Node {
                    id: value.clone(),
                    value,
                    node_type,
                })
                .collect(),
            relationships: self
                .edges
                .into_iter()
                .map(|(source, target)| Edge {
                    source,
                    target,
                    edge_type: EdgeType::Contains,
                })
                .collect(),
        }
    }
}
