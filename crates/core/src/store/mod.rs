//! Graph storage abstraction layer
//!
//! Provides a `GraphStore` trait that decouples the query engine from the
//! underlying storage. Two implementations share one SQL dialect:
//! - [`SqliteStore`]: file-backed, writes hit disk immediately, batch
//!   writes are transactional (for server and CLI hosts)
//! - [`MemoryStore`]: RAM-backed with an explicit flush to disk on
//!   `save`/`close` (for sandboxed hosts)
//!
//! Picking a back-end is a factory choice at build time, not runtime
//! polymorphism: construct the value you need, or go through
//! [`open_store`].

pub mod memory;
mod sql;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use std::path::Path;

use crate::error::StoreError;
use crate::graph::{CallGraph, Edge, Node};

/// Abstract graph storage back-end.
///
/// The write path is [`save_graph`](GraphStore::save_graph): a full
/// schema-reset followed by upserts, committed atomically. The read path is
/// prepared-statement lookups; none of the read operations error on missing
/// nodes, they return empty results.
pub trait GraphStore {
    // -- Write path --

    /// Persist a graph: reset the schema, upsert every node and edge,
    /// commit. A failed batch rolls back and leaves the previous image
    /// intact on the native back-end.
    fn save_graph(&mut self, graph: &CallGraph) -> Result<(), StoreError>;

    // -- Read path --

    fn get_node(&self, id: &str) -> Result<Option<Node>, StoreError>;

    fn all_nodes(&self) -> Result<Vec<Node>, StoreError>;

    fn all_edges(&self) -> Result<Vec<Edge>, StoreError>;

    /// Outgoing edges of a node, in edge-insertion order.
    fn edges_from(&self, id: &str) -> Result<Vec<Edge>, StoreError>;

    /// Incoming edges of a node, in edge-insertion order.
    fn edges_to(&self, id: &str) -> Result<Vec<Edge>, StoreError>;

    /// Substring match on node ID or label (search stage one).
    fn find_by_id_or_label(&self, query: &str, limit: u32) -> Result<Vec<Node>, StoreError>;

    /// The absolute project root recorded at save time.
    fn source_root(&self) -> Result<Option<String>, StoreError>;

    /// Reconstruct the full graph (save/load round-trip).
    fn load_graph(&self) -> Result<CallGraph, StoreError>;

    // -- Lifecycle --

    /// Flush to durable storage. A no-op on the native back-end.
    fn save(&mut self) -> Result<(), StoreError>;

    /// Release the connection, flushing first where flushing is a thing.
    fn close(self: Box<Self>) -> Result<(), StoreError>;
}

/// Which back-end to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// File-backed rusqlite connection.
    Native,
    /// In-memory connection flushed to `path` on save/close.
    Memory,
}

/// Build-time factory for the two back-ends.
pub fn open_store(backend: StoreBackend, path: &Path) -> Result<Box<dyn GraphStore>, StoreError> {
    Ok(match backend {
        StoreBackend::Native => Box::new(SqliteStore::open(path)?),
        StoreBackend::Memory => Box::new(MemoryStore::open(path)?),
    })
}

/// Rebuild a [`CallGraph`] from persisted rows plus the stored root.
fn reconstruct_graph(
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    source_root: Option<String>,
) -> CallGraph {
    let mut graph = CallGraph::new(source_root.unwrap_or_default());
    for node in nodes {
        graph.add_node(node);
    }
    for edge in edges {
        graph.upsert_edge(edge);
    }
    graph
}
