//! Cross-file call resolution (Pass 2).
//!
//! After every file has been extracted, this pass rewrites each call site's
//! placeholder target into a stable entity ID where it can, and classifies
//! what it cannot: external module calls keep their module name, everything
//! else stays a placeholder. Ambiguity is never an error; an ambiguous
//! callee is simply left unresolved.
//!
//! Resolution order per call site (first rule that answers wins):
//! 1. method call through a known instance (`r.doIt()` with `r = new R()`)
//! 2. `this.m()` inside a class method
//! 3. method call on an external import (`jwt.sign()`)
//! 4. callee imported by name (external or relative source)
//! 5. same-file function by name
//! 6. globally unique function name

use std::collections::HashMap;

use crate::extract::{CallSite, CallSiteKind, FileAnalysis, ImportKind};
use crate::location;

/// Where a call site ended up pointing.
#[derive(Debug, Clone, PartialEq)]
pub enum CallTarget {
    /// Bound to an entity defined in the project.
    Internal(String),
    /// A call into a foreign module; keeps the placeholder but records the
    /// module so the builder can synthesize `external:<module>`.
    External { module: String },
    /// Still a placeholder.
    Unresolved,
}

/// A call site after Pass 2.
#[derive(Debug, Clone)]
pub struct ResolvedCall {
    pub from: String,
    pub target: CallTarget,
    /// Original placeholder ID; the builder uses it when the target stays
    /// unresolved or external.
    pub placeholder: String,
    pub callee: Option<String>,
    pub receiver: Option<String>,
    pub method: Option<String>,
    pub kind: CallSiteKind,
    pub line: u32,
    /// Relative path of the calling file.
    pub file: String,
}

/// Output of the resolver: the per-file definitions plus the bound calls.
#[derive(Debug, Default)]
pub struct ResolvedProject {
    pub files: Vec<FileAnalysis>,
    pub calls: Vec<ResolvedCall>,
}

/// Bind every call site in every file. Files are iterated in extraction
/// order, calls in source order, so the output order is deterministic.
pub fn resolve(files: Vec<FileAnalysis>) -> ResolvedProject {
    let calls = {
        let resolver = Resolver::new(&files);
        let mut calls = Vec::new();
        for file in &files {
            for call in &file.calls {
                calls.push(resolver.resolve_call(file, call));
            }
        }
        calls
    };
    ResolvedProject { files, calls }
}

#[derive(Debug, Clone)]
struct RegistryEntry {
    id: String,
    file: String,
}

/// Cross-file resolver. Builds its indices once, then binds call sites.
struct Resolver<'a> {
    files: &'a [FileAnalysis],
    /// name → functions carrying it (local or exported), insertion order
    function_registry: HashMap<String, Vec<RegistryEntry>>,
    /// "Class.method" → methods, insertion order
    method_registry: HashMap<String, Vec<RegistryEntry>>,
    /// method name → methods; fallback when the owning class lookup misses
    method_by_name: HashMap<String, Vec<RegistryEntry>>,
    /// variable → class name, union of the per-file maps (first file wins)
    global_instances: HashMap<String, String>,
    /// rel path → index into `files`
    file_index: HashMap<&'a str, usize>,
}

impl<'a> Resolver<'a> {
    fn new(files: &'a [FileAnalysis]) -> Self {
        let mut function_registry: HashMap<String, Vec<RegistryEntry>> = HashMap::new();
        let mut method_registry: HashMap<String, Vec<RegistryEntry>> = HashMap::new();
        let mut method_by_name: HashMap<String, Vec<RegistryEntry>> = HashMap::new();
        let mut global_instances: HashMap<String, String> = HashMap::new();
        let mut file_index: HashMap<&'a str, usize> = HashMap::new();

        for (idx, file) in files.iter().enumerate() {
            file_index.insert(file.rel_path.as_str(), idx);

            for func in &file.functions {
                let entry = RegistryEntry {
                    id: func.id.clone(),
                    file: file.rel_path.clone(),
                };
                if let Some(name) = &func.name {
                    function_registry
                        .entry(name.clone())
                        .or_default()
                        .push(entry.clone());
                }
                // Exported aliases register the same function under the
                // public name when it differs from the local one.
                for (export_name, ids) in &file.exports {
                    if ids.contains(&func.id) && func.name.as_deref() != Some(export_name) {
                        function_registry
                            .entry(export_name.clone())
                            .or_default()
                            .push(entry.clone());
                    }
                }
            }

            for method in &file.methods {
                let entry = RegistryEntry {
                    id: method.id.clone(),
                    file: file.rel_path.clone(),
                };
                method_registry
                    .entry(format!("{}.{}", method.class_name, method.method_name))
                    .or_default()
                    .push(entry.clone());
                method_by_name
                    .entry(method.method_name.clone())
                    .or_default()
                    .push(entry);
            }

            for (var, class) in &file.instance_map {
                global_instances
                    .entry(var.clone())
                    .or_insert_with(|| class.clone());
            }
        }

        Self {
            files,
            function_registry,
            method_registry,
            method_by_name,
            global_instances,
            file_index,
        }
    }

    fn resolve_call(&self, file: &FileAnalysis, call: &CallSite) -> ResolvedCall {
        let (target, external_module) = self.bind(file, call);
        ResolvedCall {
            from: call.from.clone(),
            target: match external_module {
                Some(module) => CallTarget::External { module },
                None => target,
            },
            placeholder: call.to.clone(),
            callee: call.callee.clone(),
            receiver: call.receiver.clone(),
            method: call.method.clone(),
            kind: call.kind,
            line: call.line,
            file: file.rel_path.clone(),
        }
    }

    fn bind(&self, file: &FileAnalysis, call: &CallSite) -> (CallTarget, Option<String>) {
        if call.kind == CallSiteKind::MethodCall {
            let receiver = call.receiver.as_deref().unwrap_or_default();
            let method = call.method.as_deref().unwrap_or_default();

            // Rule 1: receiver is a tracked instance
            let class = file
                .instance_map
                .get(receiver)
                .or_else(|| self.global_instances.get(receiver));
            if let Some(class) = class {
                if let Some(id) = self.lookup_method(class, method, &file.rel_path) {
                    return (CallTarget::Internal(id), None);
                }
            }

            // Rule 2: this.m() inside a class method. When the enclosing
            // class does not define the method (inheritance), fall back to
            // the bare-name registry.
            if receiver == "this" {
                if let Some(class) = location::enclosing_class(&call.from) {
                    if let Some(id) = self
                        .lookup_method(class, method, &file.rel_path)
                        .or_else(|| self.lookup_method_by_name(method, &file.rel_path))
                    {
                        return (CallTarget::Internal(id), None);
                    }
                }
            }

            // Rule 3: receiver imported from an external module
            if let Some(import) = file.imports.get(receiver) {
                if !import.is_relative() {
                    return (CallTarget::Unresolved, Some(import.source.clone()));
                }
            }

            return (CallTarget::Unresolved, None);
        }

        let Some(callee) = call.callee.as_deref() else {
            return (CallTarget::Unresolved, None);
        };

        // Rule 4: callee imported by name
        if let Some(import) = file.imports.get(callee) {
            if !import.is_relative() {
                return (CallTarget::Unresolved, Some(import.source.clone()));
            }
            if let Some(idx) = self.locate_relative(&file.rel_path, &import.source) {
                let target = &self.files[idx];
                let bound = match import.kind {
                    ImportKind::Named => target
                        .exports
                        .get(&import.imported)
                        .and_then(|ids| ids.first().cloned())
                        .or_else(|| first_function_named(target, &import.imported)),
                    ImportKind::Default => target
                        .exports
                        .get("default")
                        .and_then(|ids| ids.first().cloned())
                        .or_else(|| first_function_named(target, "default")),
                    ImportKind::Namespace => None,
                };
                if let Some(id) = bound {
                    return (CallTarget::Internal(id), None);
                }
            }
            return (CallTarget::Unresolved, None);
        }

        // Rule 5: same-file function by name
        if let Some(id) = first_function_named(file, callee) {
            return (CallTarget::Internal(id), None);
        }

        // Rule 6: globally unique name. More than one distinct candidate is
        // ambiguous and stays a placeholder.
        if let Some(candidates) = self.function_registry.get(callee) {
            let mut ids: Vec<&str> = candidates.iter().map(|e| e.id.as_str()).collect();
            ids.dedup();
            if ids.len() == 1 {
                return (CallTarget::Internal(ids[0].to_string()), None);
            }
        }

        (CallTarget::Unresolved, None)
    }

    /// `Class.method` lookup. Tie-break: same file first, then first
    /// candidate in insertion order.
    fn lookup_method(&self, class: &str, method: &str, caller_file: &str) -> Option<String> {
        let key = format!("{class}.{method}");
        pick(self.method_registry.get(&key)?, caller_file)
    }

    /// Bare method-name lookup, same tie-break.
    fn lookup_method_by_name(&self, method: &str, caller_file: &str) -> Option<String> {
        pick(self.method_by_name.get(method)?, caller_file)
    }

    /// Locate the file a relative import points at, probing
    /// `<src>`, `<src>.{ts,tsx,js,jsx}`, `<src>/index.{ts,tsx,js,jsx}`.
    fn locate_relative(&self, importer: &str, source: &str) -> Option<usize> {
        let base = join_relative(importer, source);
        if let Some(&idx) = self.file_index.get(base.as_str()) {
            return Some(idx);
        }
        for ext in ["ts", "tsx", "js", "jsx"] {
            if let Some(&idx) = self.file_index.get(format!("{base}.{ext}").as_str()) {
                return Some(idx);
            }
        }
        for ext in ["ts", "tsx", "js", "jsx"] {
            if let Some(&idx) = self.file_index.get(format!("{base}/index.{ext}").as_str()) {
                return Some(idx);
            }
        }
        None
    }
}

fn pick(candidates: &[RegistryEntry], caller_file: &str) -> Option<String> {
    candidates
        .iter()
        .find(|c| c.file == caller_file)
        .or_else(|| candidates.first())
        .map(|c| c.id.clone())
}

/// First function in the file with the given name (definition order).
fn first_function_named(file: &FileAnalysis, name: &str) -> Option<String> {
    file.functions
        .iter()
        .find(|f| f.name.as_deref() == Some(name))
        .map(|f| f.id.clone())
}

/// Resolve `source` against the directory of `importer`, folding `.` and
/// `..` segments into a normalized project-relative path.
fn join_relative(importer: &str, source: &str) -> String {
    let mut segments: Vec<&str> = importer.split('/').collect();
    segments.pop(); // drop the file name

    let source = match source.strip_prefix('/') {
        Some(rest) => {
            segments.clear();
            rest
        }
        None => source,
    };

    for part in source.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_relative_folds_dot_segments() {
        assert_eq!(join_relative("src/a.ts", "./b"), "src/b");
        assert_eq!(join_relative("src/deep/a.ts", "../util/c"), "src/util/c");
        assert_eq!(join_relative("a.ts", "./b"), "b");
        assert_eq!(join_relative("src/a.ts", "/lib/x"), "lib/x");
    }
}
