//! Per-file extraction: one AST pass producing the file IR.
//!
//! The extractor records entity definitions (functions, classes, methods),
//! the import/export surface, a conservative variable → class instance map,
//! and every call site with a placeholder target. Nothing here looks across
//! files; the resolver (Pass 2) binds the placeholders afterwards.

pub mod ast;

use std::collections::{HashMap, HashSet};
use std::path::Path;

use tree_sitter::Node;

use crate::error::ExtractError;
use crate::location::{self, Span};

/// Sentinel prefix for exports that reference a local binding and are
/// resolved against the file's own functions after the walk (Pass 1.5).
pub const LOCAL_SENTINEL: &str = "__LOCAL__:";

/// How a name was brought into scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Named,
    Default,
    Namespace,
}

/// One imported binding: *local-name → (imported-name, source)*.
#[derive(Debug, Clone)]
pub struct ImportRecord {
    pub local: String,
    pub imported: String,
    pub source: String,
    pub kind: ImportKind,
}

impl ImportRecord {
    /// Sources starting with `.` or `/` are project files; everything else
    /// is an external module.
    pub fn is_relative(&self) -> bool {
        self.source.starts_with('.') || self.source.starts_with('/')
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSiteKind {
    Call,
    MethodCall,
}

/// A raw call site with a placeholder target, before resolution.
#[derive(Debug, Clone)]
pub struct CallSite {
    /// Caller entity ID, or `<rel>:TOPLEVEL` for module scope
    pub from: String,
    /// `placeholder::<rel>::<callee|anonymous>::<line>`
    pub to: String,
    /// `b` for `b()`, `jwt.sign` for `jwt.sign()`, `None` for computed callees
    pub callee: Option<String>,
    pub receiver: Option<String>,
    pub method: Option<String>,
    pub kind: CallSiteKind,
    pub line: u32,
}

#[derive(Debug, Clone)]
pub struct FunctionRecord {
    pub id: String,
    pub name: Option<String>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ClassRecord {
    pub id: String,
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct MethodRecord {
    pub id: String,
    pub class_name: String,
    pub method_name: String,
    pub span: Span,
}

/// Everything one file contributes to the build, in definition order.
#[derive(Debug, Default)]
pub struct FileAnalysis {
    pub rel_path: String,
    pub functions: Vec<FunctionRecord>,
    pub classes: Vec<ClassRecord>,
    pub methods: Vec<MethodRecord>,
    /// local name → import record
    pub imports: HashMap<String, ImportRecord>,
    /// exported name → entity IDs
    pub exports: HashMap<String, Vec<String>>,
    /// variable → class name, from `new C(...)` initializers only
    pub instance_map: HashMap<String, String>,
    pub calls: Vec<CallSite>,
}

/// Read and extract one file. `root` anchors the project-relative path.
pub fn extract_file(path: &Path, root: &Path) -> Result<FileAnalysis, ExtractError> {
    let source = std::fs::read_to_string(path)?;
    let rel = location::normalize(path, root);
    extract_source(&source, &rel, path)
}

/// Extract from in-memory source. `grammar_path` only selects the grammar
/// by extension; `rel_path` is what ends up in every ID.
pub fn extract_source(
    source: &str,
    rel_path: &str,
    grammar_path: &Path,
) -> Result<FileAnalysis, ExtractError> {
    let tree = ast::parse(source, grammar_path)?;
    let mut walker = Walker {
        source,
        rel: rel_path,
        analysis: FileAnalysis {
            rel_path: rel_path.to_string(),
            ..Default::default()
        },
        recorded: HashSet::new(),
    };
    walker.visit(tree.root());
    walker.resolve_local_exports();
    Ok(walker.analysis)
}

struct Walker<'a> {
    source: &'a str,
    rel: &'a str,
    analysis: FileAnalysis,
    /// Byte ranges of callables/classes already recorded; recording is
    /// exactly-once per AST node.
    recorded: HashSet<(usize, usize)>,
}

impl<'a> Walker<'a> {
    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_statement" => self.record_import(node),
            "export_statement" => self.record_export(node),
            "function_declaration" | "generator_function_declaration" => {
                let name = self.field_text(node, "name");
                self.record_function(node, name);
            }
            "method_definition" => {
                // Class methods are recorded by their class; object-literal
                // methods are plain functions named by their key.
                if self.enclosing_class_name(node).is_none() {
                    let name = self.field_text(node, "name");
                    self.record_function(node, name);
                }
            }
            "class_declaration" => {
                self.record_class(node);
            }
            "lexical_declaration" | "variable_declaration" => {
                self.record_declarators(node);
            }
            "arrow_function" | "function_expression" | "generator_function" => {
                let name = self
                    .field_text(node, "name")
                    .or_else(|| self.binding_name(node));
                self.record_function(node, name);
            }
            "call_expression" => self.record_call(node),
            _ => {}
        }

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            self.visit(child);
        }
    }

    fn field_text(&self, node: Node<'_>, field: &str) -> Option<String> {
        node.child_by_field_name(field)
            .map(|n| ast::text(n, self.source).to_string())
    }

    /// Name of the variable a function expression is bound to, if any.
    fn binding_name(&self, node: Node<'_>) -> Option<String> {
        let parent = node.parent()?;
        if parent.kind() != "variable_declarator" {
            return None;
        }
        let name = parent.child_by_field_name("name")?;
        if name.kind() != "identifier" {
            return None;
        }
        Some(ast::text(name, self.source).to_string())
    }

    /// Record a callable once per AST node and return its position ID.
    fn record_function(&mut self, node: Node<'_>, name: Option<String>) -> String {
        let span = ast::span(node);
        let id = location::function_id(self.rel, &span);
        if self.recorded.insert((node.start_byte(), node.end_byte())) {
            self.analysis.functions.push(FunctionRecord {
                id: id.clone(),
                name,
                span,
            });
        }
        id
    }

    /// Record a class declaration and its methods. Anonymous classes are
    /// skipped; their methods fall back to position-keyed functions.
    fn record_class(&mut self, node: Node<'_>) -> Option<String> {
        let name = self.field_text(node, "name")?;
        let span = ast::span(node);
        let id = location::class_id(self.rel, &name);
        if !self.recorded.insert((node.start_byte(), node.end_byte())) {
            return Some(id);
        }
        self.analysis.classes.push(ClassRecord {
            id: id.clone(),
            name: name.clone(),
            span,
        });

        if let Some(body) = node.child_by_field_name("body") {
            let mut cursor = body.walk();
            for member in body.children(&mut cursor) {
                if member.kind() != "method_definition" {
                    continue;
                }
                let Some(method_name) = self.field_text(member, "name") else {
                    continue;
                };
                self.analysis.methods.push(MethodRecord {
                    id: location::method_id(self.rel, &name, &method_name),
                    class_name: name.clone(),
                    method_name,
                    span: ast::span(member),
                });
            }
        }
        Some(id)
    }

    /// Handle `const`/`let`/`var` declarators: function bindings, `new C()`
    /// instance tracking, and CommonJS `require`.
    ///
    /// Returns `(binding-name, function-id-if-function-value)` per
    /// declarator so export handling can map names to entities.
    fn record_declarators(&mut self, node: Node<'_>) -> Vec<(String, Option<String>)> {
        let mut out = Vec::new();
        let mut cursor = node.walk();
        for decl in node.children(&mut cursor) {
            if decl.kind() != "variable_declarator" {
                continue;
            }
            let Some(name_node) = decl.child_by_field_name("name") else {
                continue;
            };
            let value = decl.child_by_field_name("value");

            if name_node.kind() == "identifier" {
                let binding = ast::text(name_node, self.source).to_string();
                match value {
                    Some(v) if ast::is_function_value(v.kind()) => {
                        let id = self.record_function(v, Some(binding.clone()));
                        out.push((binding, Some(id)));
                    }
                    Some(v) if v.kind() == "new_expression" => {
                        if let Some(ctor) = v.child_by_field_name("constructor") {
                            if ctor.kind() == "identifier" {
                                self.analysis.instance_map.insert(
                                    binding.clone(),
                                    ast::text(ctor, self.source).to_string(),
                                );
                            }
                        }
                        out.push((binding, None));
                    }
                    Some(v) if v.kind() == "call_expression" => {
                        if let Some(source) = self.require_source(v) {
                            self.analysis.imports.insert(
                                binding.clone(),
                                ImportRecord {
                                    local: binding.clone(),
                                    imported: "default".to_string(),
                                    source,
                                    kind: ImportKind::Default,
                                },
                            );
                        }
                        out.push((binding, None));
                    }
                    _ => out.push((binding, None)),
                }
            } else if name_node.kind() == "object_pattern" {
                // const { a, b: c } = require("m")
                if let Some(source) = value.and_then(|v| self.require_source(v)) {
                    self.record_destructured_require(name_node, &source);
                }
            }
        }
        out
    }

    fn record_destructured_require(&mut self, pattern: Node<'_>, source: &str) {
        let mut cursor = pattern.walk();
        for member in pattern.children(&mut cursor) {
            let (imported, local) = match member.kind() {
                "shorthand_property_identifier_pattern" => {
                    let n = ast::text(member, self.source).to_string();
                    (n.clone(), n)
                }
                "pair_pattern" => {
                    let Some(key) = member.child_by_field_name("key") else {
                        continue;
                    };
                    let Some(value) = member.child_by_field_name("value") else {
                        continue;
                    };
                    if value.kind() != "identifier" {
                        continue;
                    }
                    (
                        ast::text(key, self.source).to_string(),
                        ast::text(value, self.source).to_string(),
                    )
                }
                _ => continue,
            };
            self.analysis.imports.insert(
                local.clone(),
                ImportRecord {
                    local,
                    imported,
                    source: source.to_string(),
                    kind: ImportKind::Named,
                },
            );
        }
    }

    /// `require("m")` → `Some("m")`.
    fn require_source(&self, call: Node<'_>) -> Option<String> {
        let function = call.child_by_field_name("function")?;
        if function.kind() != "identifier" || ast::text(function, self.source) != "require" {
            return None;
        }
        let args = call.child_by_field_name("arguments")?;
        let mut cursor = args.walk();
        let first = args.named_children(&mut cursor).next()?;
        if first.kind() != "string" {
            return None;
        }
        Some(ast::unquote(ast::text(first, self.source)))
    }

    fn record_import(&mut self, node: Node<'_>) {
        let Some(source) = self
            .field_text(node, "source")
            .map(|s| ast::unquote(&s))
        else {
            return;
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "import_clause" {
                continue;
            }
            let mut clause_cursor = child.walk();
            for part in child.children(&mut clause_cursor) {
                match part.kind() {
                    "identifier" => {
                        // import Foo from "m"
                        let local = ast::text(part, self.source).to_string();
                        self.analysis.imports.insert(
                            local.clone(),
                            ImportRecord {
                                local,
                                imported: "default".to_string(),
                                source: source.clone(),
                                kind: ImportKind::Default,
                            },
                        );
                    }
                    "named_imports" => {
                        let mut spec_cursor = part.walk();
                        for spec in part.children(&mut spec_cursor) {
                            if spec.kind() != "import_specifier" {
                                continue;
                            }
                            let Some(imported) = self.field_text(spec, "name") else {
                                continue;
                            };
                            let local = self
                                .field_text(spec, "alias")
                                .unwrap_or_else(|| imported.clone());
                            self.analysis.imports.insert(
                                local.clone(),
                                ImportRecord {
                                    local,
                                    imported,
                                    source: source.clone(),
                                    kind: ImportKind::Named,
                                },
                            );
                        }
                    }
                    "namespace_import" => {
                        // import * as ns from "m"
                        let mut ns_cursor = part.walk();
                        for ns_child in part.children(&mut ns_cursor) {
                            if ns_child.kind() == "identifier" {
                                let local = ast::text(ns_child, self.source).to_string();
                                self.analysis.imports.insert(
                                    local.clone(),
                                    ImportRecord {
                                        local,
                                        imported: "*".to_string(),
                                        source: source.clone(),
                                        kind: ImportKind::Namespace,
                                    },
                                );
                            }
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    fn record_export(&mut self, node: Node<'_>) {
        let is_default = {
            let mut cursor = node.walk();
            let has_default = node.children(&mut cursor).any(|c| c.kind() == "default");
            has_default
        };

        if let Some(decl) = node.child_by_field_name("declaration") {
            match decl.kind() {
                "function_declaration" | "generator_function_declaration" => {
                    let name = self.field_text(decl, "name");
                    let id = self.record_function(decl, name.clone());
                    let export_name = if is_default {
                        Some("default".to_string())
                    } else {
                        name
                    };
                    if let Some(n) = export_name {
                        self.analysis.exports.entry(n).or_default().push(id);
                    }
                }
                "class_declaration" => {
                    let name = self.field_text(decl, "name");
                    if let Some(id) = self.record_class(decl) {
                        let export_name = if is_default {
                            Some("default".to_string())
                        } else {
                            name
                        };
                        if let Some(n) = export_name {
                            self.analysis.exports.entry(n).or_default().push(id);
                        }
                    }
                }
                "lexical_declaration" | "variable_declaration" => {
                    for (binding, fn_id) in self.record_declarators(decl) {
                        let entry = fn_id
                            .unwrap_or_else(|| format!("{LOCAL_SENTINEL}{binding}"));
                        self.analysis
                            .exports
                            .entry(binding)
                            .or_default()
                            .push(entry);
                    }
                }
                _ => {}
            }
            return;
        }

        if let Some(value) = node.child_by_field_name("value") {
            // export default <expression>
            match value.kind() {
                "identifier" => {
                    let local = ast::text(value, self.source);
                    self.analysis
                        .exports
                        .entry("default".to_string())
                        .or_default()
                        .push(format!("{LOCAL_SENTINEL}{local}"));
                }
                k if ast::is_function_value(k) => {
                    let id = self.record_function(value, None);
                    self.analysis
                        .exports
                        .entry("default".to_string())
                        .or_default()
                        .push(id);
                }
                _ => {}
            }
            return;
        }

        // export { a, b as c } [from "mod"]: always recorded as local
        // sentinels; re-exports whose name is not defined here drop out in
        // the post-walk pass.
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = child.walk();
            for spec in child.children(&mut spec_cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let Some(local) = self.field_text(spec, "name") else {
                    continue;
                };
                let exported = self.field_text(spec, "alias").unwrap_or_else(|| local.clone());
                self.analysis
                    .exports
                    .entry(exported)
                    .or_default()
                    .push(format!("{LOCAL_SENTINEL}{local}"));
            }
        }
    }

    fn record_call(&mut self, node: Node<'_>) {
        let Some(callee_node) = node.child_by_field_name("function") else {
            return;
        };

        let (kind, callee, receiver, method) = match callee_node.kind() {
            "identifier" => {
                let name = ast::text(callee_node, self.source).to_string();
                if name == "require" && self.require_source(node).is_some() {
                    return; // import machinery, not a call site
                }
                (CallSiteKind::Call, Some(name), None, None)
            }
            "member_expression" => {
                let Some(object) = callee_node.child_by_field_name("object") else {
                    return;
                };
                let Some(property) = callee_node.child_by_field_name("property") else {
                    return;
                };
                let receiver = ast::text(object, self.source).to_string();
                let method = ast::text(property, self.source).to_string();
                let callee = format!("{receiver}.{method}");
                (
                    CallSiteKind::MethodCall,
                    Some(callee),
                    Some(receiver),
                    Some(method),
                )
            }
            _ => (CallSiteKind::Call, None, None, None),
        };

        let line = ast::line(node);
        let from = self.caller_of(node);
        let to = location::placeholder_id(self.rel, callee.as_deref(), line);
        self.analysis.calls.push(CallSite {
            from,
            to,
            callee,
            receiver,
            method,
            kind,
            line,
        });
    }

    /// Attribute a call site to its nearest enclosing callable; module-scope
    /// calls get the `:TOPLEVEL` sentinel the builder rewrites.
    fn caller_of(&mut self, node: Node<'_>) -> String {
        let mut current = node.parent();
        while let Some(p) = current {
            if ast::is_callable(p.kind()) {
                if p.kind() == "method_definition" {
                    if let Some(class_name) = self.enclosing_class_name(p) {
                        if let Some(method_name) = self.field_text(p, "name") {
                            return location::method_id(self.rel, &class_name, &method_name);
                        }
                    }
                    // method of a class expression: a plain callable
                    let name = self.field_text(p, "name");
                    return self.record_function(p, name);
                }
                let name = self
                    .field_text(p, "name")
                    .or_else(|| self.binding_name(p));
                return self.record_function(p, name);
            }
            current = p.parent();
        }
        location::toplevel_caller(self.rel)
    }

    /// The name of the class declaration a method belongs to, if any.
    fn enclosing_class_name(&self, method: Node<'_>) -> Option<String> {
        let body = method.parent()?;
        if body.kind() != "class_body" {
            return None;
        }
        let class = body.parent()?;
        if class.kind() != "class_declaration" {
            return None;
        }
        self.field_text(class, "name")
    }

    /// Pass 1.5: replace each `__LOCAL__:<n>` sentinel with the ID of the
    /// first function named `n` in this file; drop sentinels with no match.
    fn resolve_local_exports(&mut self) {
        let functions = &self.analysis.functions;
        let resolve = |entry: &str| -> Option<String> {
            match entry.strip_prefix(LOCAL_SENTINEL) {
                Some(local) => functions
                    .iter()
                    .find(|f| f.name.as_deref() == Some(local))
                    .map(|f| f.id.clone()),
                None => Some(entry.to_string()),
            }
        };

        let mut resolved: HashMap<String, Vec<String>> = HashMap::new();
        for (name, entries) in self.analysis.exports.drain() {
            let kept: Vec<String> = entries.iter().filter_map(|e| resolve(e)).collect();
            if !kept.is_empty() {
                resolved.insert(name, kept);
            }
        }
        self.analysis.exports = resolved;
    }
}
