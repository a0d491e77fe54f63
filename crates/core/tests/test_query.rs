//! Query engine tests: neighbors, traversal laws, paths, hotspots, search
//! staging, filtering, and boundary behavior on missing nodes.

use std::collections::HashSet;

use callmap_core::{
    CallGraph, Edge, EdgeKind, GraphStore, MemoryStore, Meta, Node, NodeHit, NodeKind,
    QueryEngine, QueryOptions, TreeNode,
};

/// Call graph used across the cases:
///
/// ```text
/// fn:a ⇄ fn:b → fn:c      (cycle between a and b)
/// fn:a → fn:c             (second path for chains)
/// method:m → fn:a         (method_call, receiver "svc")
/// file:app.js contains a, b, c, class:K; class:K contains method:m
/// ```
fn sample_store() -> MemoryStore {
    let mut graph = CallGraph::new("/repo");

    graph.add_node(Node::new(
        "file:app.js".into(),
        NodeKind::File,
        Some("app.js".into()),
        Meta::new().with("path", "app.js"),
    ));
    for name in ["a", "b", "c"] {
        graph.add_node(Node::new(
            format!("fn:{name}"),
            NodeKind::Function,
            Some(name.into()),
            Meta::new().with("file", "app.js").with("name", name),
        ));
    }
    graph.add_node(Node::new(
        "class:K".into(),
        NodeKind::Class,
        Some("K".into()),
        Meta::new().with("file", "app.js").with("name", "K"),
    ));
    graph.add_node(Node::new(
        "method:m".into(),
        NodeKind::Method,
        Some("K.m".into()),
        Meta::new().with("file", "app.js").with("methodName", "m"),
    ));
    // picked up by search stage two only (no matching id or label)
    graph.add_node(Node::new(
        "fn:x".into(),
        NodeKind::Function,
        None,
        Meta::new().with("file", "app.js").with("name", "tokenHelper"),
    ));

    for target in ["fn:a", "fn:b", "fn:c", "class:K"] {
        graph.upsert_edge(Edge::new("file:app.js".into(), target.into(), EdgeKind::Contains));
    }
    graph.upsert_edge(Edge::new("class:K".into(), "method:m".into(), EdgeKind::Contains));

    graph.upsert_edge(Edge::new("fn:a".into(), "fn:b".into(), EdgeKind::Call));
    graph.upsert_edge(Edge::new("fn:b".into(), "fn:a".into(), EdgeKind::Call));
    graph.upsert_edge(Edge::new("fn:b".into(), "fn:c".into(), EdgeKind::Call));
    graph.upsert_edge(Edge::new("fn:a".into(), "fn:c".into(), EdgeKind::Call));

    let mut mc = Edge::new("method:m".into(), "fn:a".into(), EdgeKind::MethodCall);
    mc.meta.set("receiver", "svc");
    mc.meta.set("method", "a");
    mc.meta.set("resolved", true);
    mc.meta.set("isFramework", true);
    graph.upsert_edge(mc);

    let mut store = MemoryStore::new().unwrap();
    store.save_graph(&graph).unwrap();
    store
}

fn ids(hits: &[NodeHit]) -> Vec<&str> {
    hits.iter().map(|h| h.id()).collect()
}

fn tree_ids(tree: &TreeNode, out: &mut HashSet<String>) {
    out.insert(tree.node_id.clone());
    for child in &tree.children {
        tree_ids(child, out);
    }
}

// ── Direct neighbors ────────────────────────────────────────────────────────

#[test]
fn callers_and_callees_are_one_hop() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let callers = engine.get_callers("fn:a", &QueryOptions::default()).unwrap();
    assert_eq!(ids(&callers), vec!["fn:b", "method:m"]);

    let callees = engine.get_callees("fn:a", &QueryOptions::default()).unwrap();
    assert_eq!(ids(&callees), vec!["fn:b", "fn:c"]);
}

#[test]
fn expanded_hits_carry_lifted_metadata() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let callees = engine.get_callees("fn:a", &QueryOptions::default()).unwrap();
    let NodeHit::Expanded(node) = &callees[0] else {
        panic!("expected an expanded node");
    };
    assert_eq!(node.id, "fn:b");
    assert_eq!(node.name.as_deref(), Some("b"));
    assert_eq!(node.file.as_deref(), Some("app.js"));

    let raw = engine
        .get_callees(
            "fn:a",
            &QueryOptions {
                expanded: false,
                ..Default::default()
            },
        )
        .unwrap();
    assert!(matches!(raw[0], NodeHit::Id(_)));
}

#[test]
fn functions_in_file_follow_contains_edges() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let all = engine
        .get_functions_in_file("file:app.js", &QueryOptions::default())
        .unwrap();
    assert_eq!(ids(&all), vec!["fn:a", "fn:b", "fn:c", "class:K"]);

    let classes_only = engine
        .get_functions_in_file(
            "file:app.js",
            &QueryOptions {
                include_types: Some(vec![NodeKind::Class]),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(ids(&classes_only), vec!["class:K"]);

    // methods of a class use the same operation
    let methods = engine
        .get_functions_in_file("class:K", &QueryOptions::default())
        .unwrap();
    assert_eq!(ids(&methods), vec!["method:m"]);
}

// ── Transitive traversal ────────────────────────────────────────────────────

#[test]
fn flat_bfs_excludes_the_start_and_survives_cycles() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let callees = engine
        .transitive_callees_flat("fn:a", &QueryOptions::default())
        .unwrap();
    let set: HashSet<&str> = ids(&callees).into_iter().collect();
    assert_eq!(set, HashSet::from(["fn:b", "fn:c"]));
}

#[test]
fn flat_bfs_honors_max_depth() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let depth_one = engine
        .transitive_callees_flat(
            "fn:b",
            &QueryOptions {
                max_depth: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    let set: HashSet<&str> = ids(&depth_one).into_iter().collect();
    assert_eq!(set, HashSet::from(["fn:a", "fn:c"]));

    let depth_zero = engine
        .transitive_callees_flat(
            "fn:b",
            &QueryOptions {
                max_depth: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(depth_zero.is_empty());
}

#[test]
fn tree_traversal_turns_back_edges_into_leaves() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let tree = engine
        .transitive_callees_tree("fn:a", &QueryOptions::default())
        .unwrap();
    assert_eq!(tree.node_id, "fn:a");

    let b = tree.children.iter().find(|c| c.node_id == "fn:b").unwrap();
    let back_edge = b.children.iter().find(|c| c.node_id == "fn:a").unwrap();
    assert!(back_edge.children.is_empty(), "back-edge must be a leaf");
}

#[test]
fn tree_with_max_depth_zero_is_root_only() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let tree = engine
        .transitive_callees_tree(
            "fn:a",
            &QueryOptions {
                max_depth: Some(0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(tree.node_id, "fn:a");
    assert!(tree.children.is_empty());
}

#[test]
fn flat_and_tree_traversals_agree_on_membership() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);
    let opts = QueryOptions::default();

    let flat: HashSet<String> = engine
        .transitive_callees_flat("fn:a", &opts)
        .unwrap()
        .iter()
        .map(|h| h.id().to_string())
        .collect();

    let tree = engine.transitive_callees_tree("fn:a", &opts).unwrap();
    let mut from_tree = HashSet::new();
    tree_ids(&tree, &mut from_tree);
    from_tree.remove("fn:a");

    assert_eq!(flat, from_tree);
}

// ── Simple paths ────────────────────────────────────────────────────────────

#[test]
fn call_chains_enumerate_simple_paths_in_edge_order() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let chains = engine
        .all_call_chains("fn:a", "fn:c", &QueryOptions::default())
        .unwrap();
    let paths: Vec<Vec<&str>> = chains.iter().map(|p| ids(p)).collect();
    // a→b inserted before a→c, so the b-route is discovered first
    assert_eq!(
        paths,
        vec![vec!["fn:a", "fn:b", "fn:c"], vec!["fn:a", "fn:c"]]
    );
}

#[test]
fn call_chains_honor_depth_limit_and_max_paths() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let short = engine
        .all_call_chains(
            "fn:a",
            "fn:c",
            &QueryOptions {
                depth_limit: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(short.len(), 1);
    assert_eq!(ids(&short[0]), vec!["fn:a", "fn:c"]);

    let capped = engine
        .all_call_chains(
            "fn:a",
            "fn:c",
            &QueryOptions {
                max_paths: Some(1),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(capped.len(), 1);
}

#[test]
fn call_chain_to_self_is_the_zero_length_path() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let chains = engine
        .all_call_chains("fn:a", "fn:a", &QueryOptions::default())
        .unwrap();
    assert_eq!(chains.len(), 1);
    assert_eq!(ids(&chains[0]), vec!["fn:a"]);
}

#[test]
fn paths_are_sound() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);
    let opts = QueryOptions {
        depth_limit: Some(5),
        ..Default::default()
    };

    for path in engine.all_call_chains("fn:a", "fn:c", &opts).unwrap() {
        let path_ids = ids(&path);
        assert_eq!(*path_ids.first().unwrap(), "fn:a");
        assert_eq!(*path_ids.last().unwrap(), "fn:c");
        assert!(path_ids.len() - 1 <= 5, "length within depth_limit");
        let unique: HashSet<&&str> = path_ids.iter().collect();
        assert_eq!(unique.len(), path_ids.len(), "no repeated node");
    }
}

// ── Hotspots ────────────────────────────────────────────────────────────────

#[test]
fn hotspots_rank_by_fan_in_times_fan_out() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let hotspots = engine.hotspots(&QueryOptions::default()).unwrap();
    // fn:a: in {b→a, m→a} = 2, out {a→b, a→c} = 2, score 4
    assert_eq!(hotspots[0].node.id(), "fn:a");
    assert_eq!(hotspots[0].incoming, 2);
    assert_eq!(hotspots[0].outgoing, 2);
    assert_eq!(hotspots[0].score, 4);
    // fn:b: in 1, out 2, score 2
    assert_eq!(hotspots[1].node.id(), "fn:b");
    assert_eq!(hotspots[1].score, 2);
    // everything after has score 0, ordered by id ascending
    let zeros: Vec<&str> = hotspots[2..].iter().map(|h| h.node.id()).collect();
    let mut sorted = zeros.clone();
    sorted.sort();
    assert_eq!(zeros, sorted);
}

#[test]
fn hotspots_respect_top_and_type_filters() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let top_one = engine
        .hotspots(&QueryOptions {
            top: Some(1),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(top_one.len(), 1);

    let functions_only = engine
        .hotspots(&QueryOptions {
            include_types: Some(vec![NodeKind::Function]),
            ..Default::default()
        })
        .unwrap();
    assert!(functions_only
        .iter()
        .all(|h| h.node.id().starts_with("fn:")));
}

// ── Search ──────────────────────────────────────────────────────────────────

#[test]
fn search_stage_one_matches_ids_and_labels() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let hits = engine.search_nodes("K.m", &QueryOptions::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "method:m");
}

#[test]
fn search_stage_two_matches_meta_names_case_insensitively() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let hits = engine
        .search_nodes("tokenhelper", &QueryOptions::default())
        .unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "fn:x");
}

#[test]
fn search_stage_three_matches_edge_aliases() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    // "svc" appears only as a receiver on the method_call edge; the hit is
    // the edge's target
    let hits = engine.search_nodes("svc", &QueryOptions::default()).unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "fn:a");
}

#[test]
fn search_applies_type_filters_last() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let hits = engine
        .search_nodes(
            "fn:",
            &QueryOptions {
                exclude_types: Some(vec![NodeKind::Function]),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(hits.is_empty());
}

// ── Filtering semantics ─────────────────────────────────────────────────────

#[test]
fn exclude_wins_over_include() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let hits = engine
        .get_callees(
            "fn:a",
            &QueryOptions {
                include_types: Some(vec![NodeKind::Function]),
                exclude_types: Some(vec![NodeKind::Function]),
                ..Default::default()
            },
        )
        .unwrap();
    assert!(hits.is_empty());
}

// ── Stats and boundary behavior ─────────────────────────────────────────────

#[test]
fn semantic_stats_count_kinds_and_edge_types() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);

    let stats = engine.semantic_stats().unwrap();
    assert_eq!(stats.total_nodes, 7);
    assert_eq!(stats.files, 1);
    assert_eq!(stats.functions, 4);
    assert_eq!(stats.classes, 1);
    assert_eq!(stats.methods, 1);
    assert_eq!(stats.function_calls, 4);
    assert_eq!(stats.method_calls, 1);
    assert_eq!(stats.framework_calls, 1);
}

#[test]
fn missing_nodes_yield_empty_results_not_errors() {
    let store = sample_store();
    let engine = QueryEngine::new(&store);
    let opts = QueryOptions::default();

    assert!(engine.get_node("ghost").unwrap().is_none());
    assert!(engine.get_callers("ghost", &opts).unwrap().is_empty());
    assert!(engine.get_callees("ghost", &opts).unwrap().is_empty());
    assert!(engine
        .transitive_callees_flat("ghost", &opts)
        .unwrap()
        .is_empty());
    let tree = engine.transitive_callees_tree("ghost", &opts).unwrap();
    assert!(tree.children.is_empty());
    assert!(engine
        .all_call_chains("ghost", "fn:a", &opts)
        .unwrap()
        .is_empty());
}
