//! Thin adapter over the tree-sitter parser.
//!
//! The rest of the crate never touches tree-sitter types directly beyond
//! [`tree_sitter::Node`]; grammar selection, position conversion and the
//! kind predicates all live here.

use std::path::Path;

use tree_sitter::{Node, Parser, Tree};

use crate::error::ExtractError;
use crate::location::{Position, Span};

/// A parsed source file: the tree plus the text it points into.
pub struct SourceTree {
    tree: Tree,
    pub source: String,
}

impl SourceTree {
    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }
}

/// Parse `source` with the grammar matching the file extension.
///
/// tree-sitter is error-tolerant, but a tree containing ERROR nodes would
/// produce silently wrong IR, so syntax errors are treated as parse
/// failures and the file is skipped upstream.
pub fn parse(source: &str, path: &Path) -> Result<SourceTree, ExtractError> {
    let language = language_for(path)?;
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| ExtractError::ParseFailed(e.to_string()))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| ExtractError::ParseFailed("parser produced no tree".to_string()))?;

    if tree.root_node().has_error() {
        return Err(ExtractError::ParseFailed("syntax error".to_string()));
    }

    Ok(SourceTree {
        tree,
        source: source.to_string(),
    })
}

fn language_for(path: &Path) -> Result<tree_sitter::Language, ExtractError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default();
    match ext {
        "ts" => Ok(tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into()),
        "tsx" => Ok(tree_sitter_typescript::LANGUAGE_TSX.into()),
        "js" | "jsx" | "mjs" | "cjs" => Ok(tree_sitter_javascript::LANGUAGE.into()),
        other => Err(ExtractError::UnsupportedExtension(other.to_string())),
    }
}

/// Source text of a node.
pub fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// 1-based start line.
pub fn line(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

/// Full span of a node (1-based lines, 0-based columns).
pub fn span(node: Node<'_>) -> Span {
    Span::new(
        Position::new(
            node.start_position().row as u32 + 1,
            node.start_position().column as u32,
        ),
        Position::new(
            node.end_position().row as u32 + 1,
            node.end_position().column as u32,
        ),
    )
}

/// Node kinds that own call sites: anything a call can be attributed to.
pub fn is_callable(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "generator_function_declaration"
            | "function_expression"
            | "generator_function"
            | "arrow_function"
            | "method_definition"
    )
}

/// Function-expression kinds that may appear as a variable initializer or
/// an export-default value.
pub fn is_function_value(kind: &str) -> bool {
    matches!(
        kind,
        "arrow_function" | "function_expression" | "generator_function"
    )
}

/// Strip the quotes off a string literal's source text.
pub fn unquote(raw: &str) -> String {
    raw.trim_matches(|c| c == '\'' || c == '"' || c == '`')
        .to_string()
}
