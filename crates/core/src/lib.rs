//! Callmap Core - Static Call-Graph Engine
//!
//! This crate turns a JavaScript/TypeScript source tree into a queryable
//! call graph:
//! - per-file AST extraction via Tree-sitter (entities, imports/exports,
//!   instance tracking, raw call sites)
//! - cross-file call resolution to stable entity IDs
//! - deterministic graph materialization
//! - SQLite persistence with interchangeable native / in-memory back-ends
//! - a query engine: neighbors, bounded traversals, simple paths,
//!   hotspots, search, aggregate stats

pub mod builder;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod graph;
pub mod location;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod query;
pub mod resolver;
pub mod store;

pub use builder::build_graph;
pub use config::{AnalyzeConfig, CallmapConfig, FrameworkConfig, FrameworkMatcher};
pub use discovery::discover_files;
pub use error::{AnalyzerError, ExtractError, StoreError};
pub use extract::{extract_file, extract_source, FileAnalysis};
pub use graph::{CallGraph, Edge, EdgeKind, GraphDocument, Meta, Node, NodeKind};
pub use location::{Position, Span};
pub use pipeline::{Analyzer, BuildReport};
pub use progress::{CancelToken, NoopProgress, ProgressSink};
pub use project::{detect_project, Project, ProjectEntry, ProjectRegistry};
pub use query::{
    ExpandedNode, Hotspot, NodeHit, QueryEngine, QueryOptions, SemanticStats, TreeNode,
};
pub use store::{open_store, GraphStore, MemoryStore, SqliteStore, StoreBackend};

/// Callmap version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
