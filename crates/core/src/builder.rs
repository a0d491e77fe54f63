//! Graph materialization from the resolved IR.
//!
//! Emission order follows the fixed rule sequence so that node and edge
//! insertion order, observable through unsorted query results, is
//! deterministic for an unchanged source tree:
//!
//! 1. class nodes + file→class containment
//! 2. method nodes + class→method containment
//! 3. file nodes (idempotent with 1)
//! 4. function nodes + file→function containment
//! 5. call edges, synthesizing placeholder and external nodes on demand

use std::collections::HashMap;

use crate::config::FrameworkMatcher;
use crate::error::AnalyzerError;
use crate::extract::CallSiteKind;
use crate::graph::{CallGraph, Edge, EdgeKind, Meta, Node};
use crate::location::{self, Span, TOPLEVEL_SUFFIX};
use crate::resolver::{CallTarget, ResolvedCall, ResolvedProject};

/// Build the final graph from the resolved project.
///
/// Fails with [`AnalyzerError::IdentifierCollision`] when two distinct
/// definitions produce the same stable ID: evidence of an ID-construction
/// bug that must not be silently merged.
pub fn build_graph(
    project: &ResolvedProject,
    source_root: &str,
    framework: &FrameworkMatcher,
) -> Result<CallGraph, AnalyzerError> {
    let mut builder = Builder {
        graph: CallGraph::new(source_root),
        definitions: HashMap::new(),
        framework,
    };
    builder.run(project)?;
    Ok(builder.graph)
}

struct Builder<'a> {
    graph: CallGraph,
    /// definition ID → span, for collision diagnostics
    definitions: HashMap<String, Span>,
    framework: &'a FrameworkMatcher,
}

impl Builder<'_> {
    fn run(&mut self, project: &ResolvedProject) -> Result<(), AnalyzerError> {
        // Rules 1-2: classes, then methods, with their containment.
        for file in &project.files {
            for class in &file.classes {
                self.add_definition(
                    Node::class(&file.rel_path, &class.name, &class.span),
                    &class.span,
                )?;
                let file_node = Node::file(&file.rel_path);
                let file_id = file_node.id.clone();
                self.graph.add_node(file_node);
                self.graph
                    .upsert_edge(Edge::new(file_id, class.id.clone(), EdgeKind::Contains));
            }
            for method in &file.methods {
                self.add_definition(
                    Node::method(
                        &file.rel_path,
                        &method.class_name,
                        &method.method_name,
                        &method.span,
                    ),
                    &method.span,
                )?;
                let class_id = location::class_id(&file.rel_path, &method.class_name);
                self.graph
                    .upsert_edge(Edge::new(class_id, method.id.clone(), EdgeKind::Contains));
            }
        }

        // Rule 3: every analyzed file gets a node even when empty.
        for file in &project.files {
            self.graph.add_node(Node::file(&file.rel_path));
        }

        // Rule 4: functions with their containment.
        for file in &project.files {
            for func in &file.functions {
                self.add_definition(
                    Node::function(&file.rel_path, func.name.as_deref(), &func.span),
                    &func.span,
                )?;
                self.graph.upsert_edge(Edge::new(
                    location::file_id(&file.rel_path),
                    func.id.clone(),
                    EdgeKind::Contains,
                ));
            }
        }

        // Rule 5: calls.
        for call in &project.calls {
            self.add_call(call);
        }

        Ok(())
    }

    /// Add a definition node, failing on an ID collision between two
    /// distinct spans.
    fn add_definition(&mut self, node: Node, span: &Span) -> Result<(), AnalyzerError> {
        if let Some(existing) = self.definitions.get(&node.id) {
            if existing != span {
                return Err(AnalyzerError::IdentifierCollision {
                    id: node.id,
                    first: format!("{}:{}", existing.start.line, existing.start.column),
                    second: format!("{}:{}", span.start.line, span.start.column),
                });
            }
            return Ok(());
        }
        self.definitions.insert(node.id.clone(), *span);
        self.graph.add_node(node);
        Ok(())
    }

    fn add_call(&mut self, call: &ResolvedCall) {
        let from = self.caller_node_id(call);
        let edge_kind = match call.kind {
            CallSiteKind::Call => EdgeKind::Call,
            CallSiteKind::MethodCall => EdgeKind::MethodCall,
        };

        let is_framework = self
            .framework
            .is_framework(call.receiver.as_deref(), call.method.as_deref());

        let mut meta = Meta::new();
        if let Some(r) = &call.receiver {
            meta.set("receiver", r.as_str());
        }
        if let Some(m) = &call.method {
            meta.set("method", m.as_str());
        }
        meta.set("line", call.line);
        if is_framework {
            meta.set("isFramework", true);
        }

        let to = match &call.target {
            CallTarget::Internal(id) => {
                meta.set("resolved", true);
                // Defensive: a resolved ID should already exist; if it does
                // not, keep the edge pointing at a synthesized placeholder.
                if self.graph.contains_node(id) {
                    id.clone()
                } else {
                    self.ensure_placeholder(call, None, is_framework)
                }
            }
            CallTarget::External { module } => {
                meta.set("resolved", false);
                meta.set("external", true);
                meta.set("moduleName", module.as_str());
                self.graph.add_node(Node::external(module));
                self.ensure_placeholder(call, Some(module), is_framework)
            }
            CallTarget::Unresolved => {
                meta.set("resolved", false);
                self.ensure_placeholder(call, None, is_framework)
            }
        };

        self.graph.upsert_edge(Edge::with_meta(from, to, edge_kind, meta));
    }

    /// Module-scope callers were recorded as `<rel>:TOPLEVEL`; rewrite them
    /// to the file node so every call edge starts at a real node.
    fn caller_node_id(&mut self, call: &ResolvedCall) -> String {
        match call.from.strip_suffix(TOPLEVEL_SUFFIX) {
            Some(rel) => {
                let node = Node::file(rel);
                let id = node.id.clone();
                self.graph.add_node(node);
                id
            }
            None => call.from.clone(),
        }
    }

    /// Synthesize (or reuse) the placeholder node for an unresolved or
    /// external call site.
    fn ensure_placeholder(
        &mut self,
        call: &ResolvedCall,
        external_module: Option<&str>,
        is_framework: bool,
    ) -> String {
        let id = call.placeholder.clone();
        if self.graph.contains_node(&id) {
            return id;
        }

        let mut meta = Meta::new().with("file", call.file.as_str());
        if let Some(callee) = &call.callee {
            meta.set("calleeName", callee.as_str());
        }
        meta.set("line", call.line);
        if let Some(r) = &call.receiver {
            meta.set("receiver", r.as_str());
        }
        if let Some(m) = &call.method {
            meta.set("method", m.as_str());
        }
        if let Some(module) = external_module {
            meta.set("external", true);
            meta.set("moduleName", module);
        }
        if is_framework {
            meta.set("isFramework", true);
        }

        let label = match (&call.receiver, &call.method) {
            (Some(r), Some(m)) => Some(format!("{r}.{m}()")),
            _ => call.callee.as_ref().map(|c| format!("{c}()")),
        };

        self.graph.add_node(Node::placeholder(id.clone(), label, meta));
        id
    }
}
