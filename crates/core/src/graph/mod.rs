//! Call-graph data structures and the JSON build artifact

pub mod edges;
pub mod meta;
pub mod nodes;

pub use edges::{Edge, EdgeKind};
pub use meta::Meta;
pub use nodes::{Node, NodeKind};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The materialized call graph: ordered node and edge lists with dedup
/// indices, plus the absolute project root the relative IDs hang off.
///
/// Insertion order is part of the contract: it is observable through
/// queries that return unsorted results, so the vectors are the source of
/// truth and the maps only index into them.
#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    source_root: String,
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    node_index: HashMap<String, usize>,
    edge_index: HashMap<(String, String, EdgeKind), usize>,
}

impl CallGraph {
    pub fn new(source_root: impl Into<String>) -> Self {
        Self {
            source_root: source_root.into(),
            ..Default::default()
        }
    }

    /// Absolute project root, stored so editor hosts can rehydrate relative
    /// paths without changing IDs.
    pub fn source_root(&self) -> &str {
        &self.source_root
    }

    /// Insert a node unless one with the same ID already exists.
    /// Returns true when the node was newly added.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.node_index.contains_key(&node.id) {
            return false;
        }
        self.node_index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        true
    }

    /// Insert an edge, overwriting the metadata when `(from, to, kind)`
    /// already exists.
    pub fn upsert_edge(&mut self, edge: Edge) {
        let key = edge.key();
        match self.edge_index.get(&key) {
            Some(&idx) => self.edges[idx] = edge,
            None => {
                self.edge_index.insert(key, self.edges.len());
                self.edges.push(edge);
            }
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.node_index.get(id).map(|&idx| &self.nodes[idx])
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Consume the graph into the JSON interchange document.
    pub fn into_document(self) -> GraphDocument {
        GraphDocument {
            nodes: self.nodes,
            edges: self.edges,
            source_root: self.source_root,
        }
    }

    /// Rebuild a graph (with indices) from an interchange document.
    /// Later duplicates lose, matching the builder's dedup rules.
    pub fn from_document(doc: GraphDocument) -> Self {
        let mut graph = CallGraph::new(doc.source_root);
        for node in doc.nodes {
            graph.add_node(node);
        }
        for edge in doc.edges {
            graph.upsert_edge(edge);
        }
        graph
    }
}

/// The JSON build artifact exchanged between the builder and the store when
/// they live on opposite sides of a process boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphDocument {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    #[serde(rename = "sourceRoot")]
    pub source_root: String,
}

impl GraphDocument {
    pub fn load(path: &std::path::Path) -> anyhow::Result<Self> {
        use anyhow::Context;
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn save(&self, path: &std::path::Path) -> anyhow::Result<()> {
        use anyhow::Context;
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::{Position, Span};

    fn span() -> Span {
        Span::new(Position::new(1, 0), Position::new(2, 1))
    }

    #[test]
    fn add_node_is_idempotent_per_id() {
        let mut g = CallGraph::new("/repo");
        assert!(g.add_node(Node::file("a.ts")));
        assert!(!g.add_node(Node::file("a.ts")));
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn upsert_edge_overwrites_metadata_in_place() {
        let mut g = CallGraph::new("/repo");
        let e1 = Edge::new("a".into(), "b".into(), EdgeKind::Call);
        let mut e2 = Edge::new("a".into(), "b".into(), EdgeKind::Call);
        e2.meta.set("resolved", true);

        g.upsert_edge(e1);
        g.upsert_edge(e2);
        assert_eq!(g.edge_count(), 1);
        assert_eq!(g.edges()[0].meta.bool("resolved"), Some(true));
    }

    #[test]
    fn document_file_round_trip() {
        let mut g = CallGraph::new("/repo");
        g.add_node(Node::file("a.ts"));
        let doc = g.into_document();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        doc.save(&path).unwrap();
        assert_eq!(GraphDocument::load(&path).unwrap(), doc);
    }

    #[test]
    fn document_round_trip_preserves_order_and_root() {
        let mut g = CallGraph::new("/repo");
        g.add_node(Node::file("a.ts"));
        g.add_node(Node::class("a.ts", "C", &span()));
        g.upsert_edge(Edge::new(
            "file:a.ts".into(),
            "class:a.ts:C".into(),
            EdgeKind::Contains,
        ));

        let doc = g.clone().into_document();
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains("\"sourceRoot\":\"/repo\""));

        let back = CallGraph::from_document(serde_json::from_str(&json).unwrap());
        assert_eq!(back.source_root(), "/repo");
        assert_eq!(back.nodes(), g.nodes());
        assert_eq!(back.edges(), g.edges());
    }
}
