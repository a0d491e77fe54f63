//! Source locations and stable entity identifiers.
//!
//! Every node in the graph is addressed by a string ID derived from the
//! entity's project-relative path and, where needed, its position. IDs are
//! the only join key between the extractor, the resolver, the builder and
//! the store, so all construction goes through this module.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// A point in a source file. Lines are 1-based, columns 0-based
/// (tree-sitter rows plus one).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A half-open source range from the start of an entity to its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Normalize `path` to a project-relative, forward-slash string.
///
/// Paths outside `root` keep their full (slash-normalized) form rather than
/// being rejected; the walker never produces them in practice.
pub fn normalize(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy();
    let s = s.replace('\\', "/");
    s.trim_start_matches("./").to_string()
}

/// `file:<relative-path>`
pub fn file_id(rel_path: &str) -> String {
    format!("file:{rel_path}")
}

/// `class:<rel-path>:<class-name>`
pub fn class_id(rel_path: &str, class_name: &str) -> String {
    format!("class:{rel_path}:{class_name}")
}

/// `class:<rel-path>:<Class>.<method>`
pub fn method_id(rel_path: &str, class_name: &str, method_name: &str) -> String {
    format!("class:{rel_path}:{class_name}.{method_name}")
}

/// `<rel-path>:<startLine>:<startCol>-<endLine>:<endCol>`
///
/// Functions are keyed by position, not name: expressions and arrows are
/// often anonymous, and names may repeat within one file.
pub fn function_id(rel_path: &str, span: &Span) -> String {
    format!(
        "{}:{}:{}-{}:{}",
        rel_path, span.start.line, span.start.column, span.end.line, span.end.column
    )
}

/// `external:<module-name>`
pub fn external_id(module_name: &str) -> String {
    format!("external:{module_name}")
}

/// `placeholder::<rel-path>::<callee-name|"anonymous">::<line>`
pub fn placeholder_id(rel_path: &str, callee: Option<&str>, line: u32) -> String {
    format!(
        "placeholder::{}::{}::{}",
        rel_path,
        callee.unwrap_or("anonymous"),
        line
    )
}

/// Suffix marking a module-scope caller before the builder rewrites it to
/// the owning file node.
pub const TOPLEVEL_SUFFIX: &str = ":TOPLEVEL";

/// `<rel-path>:TOPLEVEL`, the sentinel caller ID for module-scope call sites.
pub fn toplevel_caller(rel_path: &str) -> String {
    format!("{rel_path}{TOPLEVEL_SUFFIX}")
}

/// If `caller` is a method ID, return the enclosing class name.
///
/// Method IDs look like `class:<rel>:<Class>.<method>`; the class name is the
/// segment between the last `:` and the last `.`.
pub fn enclosing_class(caller_id: &str) -> Option<&str> {
    let rest = caller_id.strip_prefix("class:")?;
    let after_path = rest.rsplit(':').next()?;
    let dot = after_path.rfind('.')?;
    Some(&after_path[..dot])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn normalize_strips_root_and_uses_forward_slashes() {
        let root = PathBuf::from("/repo");
        assert_eq!(normalize(Path::new("/repo/src/a.ts"), &root), "src/a.ts");
    }

    #[test]
    fn function_id_encodes_full_span() {
        let span = Span::new(Position::new(3, 4), Position::new(7, 1));
        assert_eq!(function_id("src/a.ts", &span), "src/a.ts:3:4-7:1");
    }

    #[test]
    fn placeholder_id_defaults_to_anonymous() {
        assert_eq!(
            placeholder_id("src/a.ts", None, 12),
            "placeholder::src/a.ts::anonymous::12"
        );
        assert_eq!(
            placeholder_id("src/a.ts", Some("jwt.sign"), 12),
            "placeholder::src/a.ts::jwt.sign::12"
        );
    }

    #[test]
    fn enclosing_class_parses_method_ids_only() {
        assert_eq!(enclosing_class("class:src/a.ts:Svc.create"), Some("Svc"));
        assert_eq!(enclosing_class("class:src/a.ts:Svc"), None);
        assert_eq!(enclosing_class("src/a.ts:3:0-4:1"), None);
        assert_eq!(enclosing_class("file:src/a.ts"), None);
    }
}
