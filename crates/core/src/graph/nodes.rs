//! Node types for the call graph

use serde::{Deserialize, Serialize};

use super::Meta;
use crate::location::{self, Span};

/// The kind of program entity a node represents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// A source file in the project
    File,
    /// A class declaration
    Class,
    /// A method of a class
    Method,
    /// Any non-method callable (declaration, expression, arrow, object method)
    Function,
    /// A foreign module referenced by import
    External,
    /// An unresolved call site
    Placeholder,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::File => "file",
            NodeKind::Class => "class",
            NodeKind::Method => "method",
            NodeKind::Function => "function",
            NodeKind::External => "external",
            NodeKind::Placeholder => "placeholder",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "file" => Some(NodeKind::File),
            "class" => Some(NodeKind::Class),
            "method" => Some(NodeKind::Method),
            "function" => Some(NodeKind::Function),
            "external" => Some(NodeKind::External),
            "placeholder" => Some(NodeKind::Placeholder),
            _ => None,
        }
    }
}

/// A vertex of the call graph: stable ID, kind tag, optional human label,
/// and an open metadata record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Meta::is_empty")]
    pub meta: Meta,
}

impl Node {
    pub fn new(id: String, kind: NodeKind, label: Option<String>, meta: Meta) -> Self {
        Self {
            id,
            kind,
            label,
            meta,
        }
    }

    pub fn file(rel_path: &str) -> Self {
        let meta = Meta::new().with("path", rel_path);
        Self::new(
            location::file_id(rel_path),
            NodeKind::File,
            Some(rel_path.to_string()),
            meta,
        )
    }

    pub fn class(rel_path: &str, name: &str, span: &Span) -> Self {
        let mut meta = Meta::new().with("file", rel_path).with("name", name);
        meta.set_span(span);
        Self::new(
            location::class_id(rel_path, name),
            NodeKind::Class,
            Some(name.to_string()),
            meta,
        )
    }

    pub fn method(rel_path: &str, class_name: &str, method_name: &str, span: &Span) -> Self {
        let mut meta = Meta::new()
            .with("file", rel_path)
            .with("className", class_name)
            .with("methodName", method_name);
        meta.set_span(span);
        Self::new(
            location::method_id(rel_path, class_name, method_name),
            NodeKind::Method,
            Some(format!("{class_name}.{method_name}")),
            meta,
        )
    }

    pub fn function(rel_path: &str, name: Option<&str>, span: &Span) -> Self {
        let mut meta = Meta::new().with("file", rel_path);
        if let Some(n) = name {
            meta.set("name", n);
        }
        meta.set_span(span);
        Self::new(
            location::function_id(rel_path, span),
            NodeKind::Function,
            name.map(|n| n.to_string()),
            meta,
        )
    }

    pub fn external(module_name: &str) -> Self {
        let meta = Meta::new().with("moduleName", module_name);
        Self::new(
            location::external_id(module_name),
            NodeKind::External,
            Some(module_name.to_string()),
            meta,
        )
    }

    /// Placeholder nodes are synthesized by the builder with call-site
    /// metadata already assembled; the ID doubles as the `placeholderId` key.
    pub fn placeholder(id: String, label: Option<String>, mut meta: Meta) -> Self {
        meta.set("placeholderId", id.clone());
        Self::new(id, NodeKind::Placeholder, label, meta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::Position;

    #[test]
    fn constructors_produce_spec_ids_and_required_meta() {
        let span = Span::new(Position::new(2, 0), Position::new(5, 1));

        let file = Node::file("src/a.ts");
        assert_eq!(file.id, "file:src/a.ts");
        assert_eq!(file.meta.str("path"), Some("src/a.ts"));

        let class = Node::class("src/a.ts", "Svc", &span);
        assert_eq!(class.id, "class:src/a.ts:Svc");
        assert_eq!(class.meta.str("name"), Some("Svc"));
        assert!(class.meta.contains("start") && class.meta.contains("end"));

        let method = Node::method("src/a.ts", "Svc", "create", &span);
        assert_eq!(method.id, "class:src/a.ts:Svc.create");
        assert_eq!(method.meta.str("className"), Some("Svc"));
        assert_eq!(method.meta.str("methodName"), Some("create"));
        assert_eq!(method.label.as_deref(), Some("Svc.create"));

        let func = Node::function("src/a.ts", None, &span);
        assert_eq!(func.id, "src/a.ts:2:0-5:1");
        assert_eq!(func.label, None);

        let ext = Node::external("jsonwebtoken");
        assert_eq!(ext.id, "external:jsonwebtoken");
        assert_eq!(ext.meta.str("moduleName"), Some("jsonwebtoken"));
    }

    #[test]
    fn node_kind_wire_names_are_snake_case() {
        assert_eq!(serde_json::to_string(&NodeKind::File).unwrap(), "\"file\"");
        assert_eq!(
            serde_json::to_string(&NodeKind::Placeholder).unwrap(),
            "\"placeholder\""
        );
        assert_eq!(NodeKind::parse("method"), Some(NodeKind::Method));
        assert_eq!(NodeKind::parse("module"), None);
    }
}
