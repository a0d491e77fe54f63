//! Tests for cross-file call resolution: each rule of the resolution
//! order, the tie-breaks, and the external/unresolved classifications.

use std::path::Path;

use callmap_core::extract::extract_source;
use callmap_core::resolver::{resolve, CallTarget, ResolvedCall};
use callmap_core::FileAnalysis;

fn file(source: &str, rel: &str) -> FileAnalysis {
    extract_source(source, rel, Path::new(rel)).expect("extraction failed")
}

fn calls_of<'a>(project: &'a callmap_core::resolver::ResolvedProject, rel: &str) -> Vec<&'a ResolvedCall> {
    project.calls.iter().filter(|c| c.file == rel).collect()
}

// ── Rule 1: instance map ────────────────────────────────────────────────────

#[test]
fn instance_method_calls_resolve_through_the_instance_map() {
    let project = resolve(vec![
        file("const r = new R();\nr.doIt();\n", "e.js"),
        file("export class R {\n  doIt() {}\n}\n", "r.js"),
    ]);

    let call = &calls_of(&project, "e.js")[0];
    assert_eq!(
        call.target,
        CallTarget::Internal("class:r.js:R.doIt".to_string())
    );
}

#[test]
fn instance_resolution_prefers_same_file_candidates() {
    // R.doIt exists in both files; the caller's own file wins
    let local = file(
        "class R {\n  doIt() {}\n}\nconst r = new R();\nr.doIt();\n",
        "local.js",
    );
    let remote = file("export class R {\n  doIt() {}\n}\n", "remote.js");
    let project = resolve(vec![remote, local]);

    let call = &calls_of(&project, "local.js")[0];
    assert_eq!(
        call.target,
        CallTarget::Internal("class:local.js:R.doIt".to_string())
    );
}

#[test]
fn instance_resolution_falls_back_to_insertion_order() {
    // neither candidate is in the calling file; first extracted file wins
    let project = resolve(vec![
        file("export class R {\n  doIt() {}\n}\n", "first.js"),
        file("export class R {\n  doIt() {}\n}\n", "second.js"),
        file("const r = new R();\nr.doIt();\n", "caller.js"),
    ]);

    let call = &calls_of(&project, "caller.js")[0];
    assert_eq!(
        call.target,
        CallTarget::Internal("class:first.js:R.doIt".to_string())
    );
}

// ── Rule 2: this-qualified ──────────────────────────────────────────────────

#[test]
fn this_calls_resolve_within_the_enclosing_class() {
    let project = resolve(vec![file(
        "class Svc {\n  create(x) {\n    this.save(x);\n  }\n  save(x) {}\n}\n",
        "d.js",
    )]);

    let call = &calls_of(&project, "d.js")[0];
    assert_eq!(
        call.target,
        CallTarget::Internal("class:d.js:Svc.save".to_string())
    );
}

// ── Rule 3: external method calls ───────────────────────────────────────────

#[test]
fn method_calls_on_external_imports_are_classified_external() {
    let project = resolve(vec![file(
        "import jwt from \"jsonwebtoken\";\nfunction sign(x) {\n  jwt.sign(x);\n}\n",
        "c.js",
    )]);

    let call = &calls_of(&project, "c.js")[0];
    assert_eq!(
        call.target,
        CallTarget::External {
            module: "jsonwebtoken".to_string()
        }
    );
    assert_eq!(call.receiver.as_deref(), Some("jwt"));
    assert_eq!(call.method.as_deref(), Some("sign"));
}

// ── Rule 4: imports ─────────────────────────────────────────────────────────

#[test]
fn named_imports_resolve_to_the_exported_function() {
    let a = file("export function a() {}\n", "a.js");
    let b = file("import { a } from \"./a\";\nexport function b() {\n  a();\n}\n", "b.js");
    let a_id = a.functions[0].id.clone();
    let project = resolve(vec![a, b]);

    let call = &calls_of(&project, "b.js")[0];
    assert_eq!(call.target, CallTarget::Internal(a_id));
}

#[test]
fn default_imports_resolve_through_the_default_export() {
    let util = file("export default function run() {}\n", "util.js");
    let main = file("import run from \"./util\";\nrun();\n", "main.js");
    let run_id = util.functions[0].id.clone();
    let project = resolve(vec![util, main]);

    let call = &calls_of(&project, "main.js")[0];
    assert_eq!(call.target, CallTarget::Internal(run_id));
}

#[test]
fn import_resolution_probes_index_files() {
    let index = file("export function setup() {}\n", "lib/index.js");
    let main = file("import { setup } from \"./lib\";\nsetup();\n", "main.js");
    let setup_id = index.functions[0].id.clone();
    let project = resolve(vec![index, main]);

    let call = &calls_of(&project, "main.js")[0];
    assert_eq!(call.target, CallTarget::Internal(setup_id));
}

#[test]
fn external_function_imports_are_classified_external() {
    let project = resolve(vec![file(
        "import { sign } from \"jsonwebtoken\";\nsign();\n",
        "a.js",
    )]);
    let call = &calls_of(&project, "a.js")[0];
    assert_eq!(
        call.target,
        CallTarget::External {
            module: "jsonwebtoken".to_string()
        }
    );
}

#[test]
fn namespace_imports_stay_unresolved() {
    let util = file("export function helper() {}\n", "util.js");
    let main = file("import * as ns from \"./util\";\nns.helper();\n", "main.js");
    let project = resolve(vec![util, main]);

    let call = &calls_of(&project, "main.js")[0];
    assert_eq!(call.target, CallTarget::Unresolved);
}

// ── Rules 5 and 6: local, then global-unique ────────────────────────────────

#[test]
fn local_functions_win_over_other_files() {
    let caller = file("function work() {}\nfunction go() {\n  work();\n}\n", "caller.js");
    let other = file("export function work() {}\n", "other.js");
    let local_id = caller.functions[0].id.clone();
    let project = resolve(vec![caller, other]);

    let call = &calls_of(&project, "caller.js")[0];
    assert_eq!(call.target, CallTarget::Internal(local_id));
}

#[test]
fn globally_unique_names_resolve_without_an_import() {
    let lib = file("function helper() {}\n", "lib.js");
    let main = file("helper();\n", "main.js");
    let helper_id = lib.functions[0].id.clone();
    let project = resolve(vec![lib, main]);

    let call = &calls_of(&project, "main.js")[0];
    assert_eq!(call.target, CallTarget::Internal(helper_id));
}

#[test]
fn ambiguous_global_names_stay_unresolved() {
    let project = resolve(vec![
        file("function helper() {}\n", "one.js"),
        file("function helper() {}\n", "two.js"),
        file("helper();\n", "main.js"),
    ]);

    let call = &calls_of(&project, "main.js")[0];
    assert_eq!(call.target, CallTarget::Unresolved);
}

#[test]
fn unknown_callees_keep_their_placeholder() {
    let project = resolve(vec![file("function f() {\n  mystery();\n}\n", "a.js")]);
    let call = &calls_of(&project, "a.js")[0];
    assert_eq!(call.target, CallTarget::Unresolved);
    assert_eq!(call.placeholder, "placeholder::a.js::mystery::2");
}
