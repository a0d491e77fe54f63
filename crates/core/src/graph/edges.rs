//! Edge types for the call graph

use serde::{Deserialize, Serialize};

use super::Meta;

/// The kind of relationship an edge represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Lexical containment: file → class/function, class → method
    Contains,
    /// Function-level invocation
    Call,
    /// Member-call expression (`obj.m()`), carries receiver/method metadata
    MethodCall,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Contains => "contains",
            EdgeKind::Call => "call",
            EdgeKind::MethodCall => "method_call",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "contains" => Some(EdgeKind::Contains),
            "call" => Some(EdgeKind::Call),
            "method_call" => Some(EdgeKind::MethodCall),
            _ => None,
        }
    }

    /// Call-level kinds, the edge set all traversal queries follow.
    pub fn is_call(&self) -> bool {
        matches!(self, EdgeKind::Call | EdgeKind::MethodCall)
    }
}

/// A directed arc between two node IDs.
///
/// Edges are uniquely keyed by `(from, to, kind)`; re-inserting the same key
/// overwrites the metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: EdgeKind,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Edge {
    pub fn new(from: String, to: String, kind: EdgeKind) -> Self {
        Self {
            from,
            to,
            kind,
            meta: Meta::new(),
        }
    }

    pub fn with_meta(from: String, to: String, kind: EdgeKind, meta: Meta) -> Self {
        Self {
            from,
            to,
            kind,
            meta,
        }
    }

    /// The dedup key: `(from, to, kind)`.
    pub fn key(&self) -> (String, String, EdgeKind) {
        (self.from.clone(), self.to.clone(), self.kind)
    }
}
