//! Query engine over a graph store.
//!
//! Every operation takes a [`QueryOptions`] record and runs read-only
//! against a [`GraphStore`]. Missing nodes are never errors: lookups return
//! `None` and traversals return empty results. Traversals follow `call` and
//! `method_call` edges only; `contains` edges are served by
//! [`QueryEngine::get_functions_in_file`].

use std::collections::{HashMap, HashSet, VecDeque};

use serde::Serialize;

use crate::error::StoreError;
use crate::graph::{Edge, EdgeKind, Meta, Node, NodeKind};
use crate::location::Position;
use crate::store::GraphStore;

/// Depth bound for flat BFS traversals.
pub const DEFAULT_FLAT_DEPTH: u32 = 200;
/// Depth bound for tree-shaped DFS traversals.
pub const DEFAULT_TREE_DEPTH: u32 = 50;
/// Depth bound for simple-path enumeration.
pub const DEFAULT_PATH_DEPTH: u32 = 20;
/// Cap on enumerated paths.
pub const DEFAULT_MAX_PATHS: u32 = 1000;
/// Default and maximum hotspot result sizes.
pub const DEFAULT_HOTSPOT_TOP: u32 = 20;
pub const MAX_HOTSPOT_TOP: u32 = 100;
/// Cap on search results.
pub const SEARCH_CAP: usize = 100;

/// Options shared by every query operation. Unknown combinations are
/// ignored by operations that do not use them.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    /// Resolve raw IDs into [`ExpandedNode`] records (default true).
    pub expanded: bool,
    /// Restrict results to these node kinds.
    pub include_types: Option<Vec<NodeKind>>,
    /// Drop results of these node kinds; applied before `include_types`.
    pub exclude_types: Option<Vec<NodeKind>>,
    /// Traversal bound; defaults depend on the operation.
    pub max_depth: Option<u32>,
    /// DFS depth for path enumeration.
    pub depth_limit: Option<u32>,
    /// Result cap for path enumeration.
    pub max_paths: Option<u32>,
    /// Result size for hotspots.
    pub top: Option<u32>,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            expanded: true,
            include_types: None,
            exclude_types: None,
            max_depth: None,
            depth_limit: None,
            max_paths: None,
            top: None,
        }
    }
}

/// A node reference in a query result: a bare ID, or the expanded record.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum NodeHit {
    Id(String),
    Expanded(Box<ExpandedNode>),
}

impl NodeHit {
    pub fn id(&self) -> &str {
        match self {
            NodeHit::Id(id) => id,
            NodeHit::Expanded(node) => &node.id,
        }
    }
}

/// A node with its common metadata lifted out of the open map.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExpandedNode {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Position>,
    pub meta: Meta,
}

impl From<Node> for ExpandedNode {
    fn from(node: Node) -> Self {
        let file = node
            .meta
            .str("file")
            .or_else(|| node.meta.str("path"))
            .map(String::from);
        let name = node
            .meta
            .str("name")
            .or_else(|| node.meta.str("methodName"))
            .map(String::from);
        let start = node.meta.position("start");
        let end = node.meta.position("end");
        Self {
            id: node.id,
            kind: node.kind,
            label: node.label,
            file,
            name,
            start,
            end,
            meta: node.meta,
        }
    }
}

/// One level of a tree-shaped traversal. Previously-visited nodes and nodes
/// beyond the depth bound appear as leaves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    pub node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<ExpandedNode>,
    pub children: Vec<TreeNode>,
}

/// One hotspot entry: coupling score = incoming × outgoing call edges.
#[derive(Debug, Clone, Serialize)]
pub struct Hotspot {
    pub node: NodeHit,
    #[serde(rename = "in")]
    pub incoming: u64,
    #[serde(rename = "out")]
    pub outgoing: u64,
    pub score: u64,
}

/// Aggregate graph counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticStats {
    pub total_nodes: usize,
    pub total_edges: usize,
    pub classes: usize,
    pub methods: usize,
    pub functions: usize,
    pub files: usize,
    pub function_calls: usize,
    pub method_calls: usize,
    pub framework_calls: usize,
}

/// Read-only query surface over a store.
pub struct QueryEngine<'a> {
    store: &'a dyn GraphStore,
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a dyn GraphStore) -> Self {
        Self { store }
    }

    pub fn get_node(&self, id: &str) -> Result<Option<Node>, StoreError> {
        self.store.get_node(id)
    }

    /// Four-stage union search, first occurrence wins, capped at
    /// [`SEARCH_CAP`]:
    /// 1. substring on ID or label (SQL LIKE)
    /// 2. substring on `meta.moduleName` / `meta.name` (case-insensitive)
    /// 3. edge-metadata alias match (receiver / moduleName) → edge targets
    /// 4. include/exclude type filter
    pub fn search_nodes(&self, query: &str, opts: &QueryOptions) -> Result<Vec<Node>, StoreError> {
        let mut out: Vec<Node> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        for node in self.store.find_by_id_or_label(query, SEARCH_CAP as u32)? {
            if seen.insert(node.id.clone()) {
                out.push(node);
            }
        }

        let needle = query.to_lowercase();
        if out.len() < SEARCH_CAP {
            for node in self.store.all_nodes()? {
                if out.len() >= SEARCH_CAP {
                    break;
                }
                if seen.contains(&node.id) {
                    continue;
                }
                let matched = [node.meta.str("moduleName"), node.meta.str("name")]
                    .into_iter()
                    .flatten()
                    .any(|v| v.to_lowercase().contains(&needle));
                if matched {
                    seen.insert(node.id.clone());
                    out.push(node);
                }
            }
        }

        if out.len() < SEARCH_CAP {
            for edge in self.store.all_edges()? {
                if out.len() >= SEARCH_CAP {
                    break;
                }
                let matched = [edge.meta.str("receiver"), edge.meta.str("moduleName")]
                    .into_iter()
                    .flatten()
                    .any(|v| v.to_lowercase().contains(&needle));
                if !matched || seen.contains(&edge.to) {
                    continue;
                }
                if let Some(node) = self.store.get_node(&edge.to)? {
                    seen.insert(node.id.clone());
                    out.push(node);
                }
            }
        }

        out.retain(|n| passes(n.kind, opts));
        out.truncate(SEARCH_CAP);
        Ok(out)
    }

    pub fn get_all_nodes(&self, opts: &QueryOptions) -> Result<Vec<Node>, StoreError> {
        let mut nodes = self.store.all_nodes()?;
        nodes.retain(|n| passes(n.kind, opts));
        Ok(nodes)
    }

    pub fn get_all_edges(&self) -> Result<Vec<Edge>, StoreError> {
        self.store.all_edges()
    }

    /// Direct callers: sources of incoming call/method_call edges.
    pub fn get_callers(&self, id: &str, opts: &QueryOptions) -> Result<Vec<NodeHit>, StoreError> {
        let ids = self.call_neighbors(id, Direction::Reverse)?;
        self.collect_hits(ids, opts)
    }

    /// Direct callees: targets of outgoing call/method_call edges.
    pub fn get_callees(&self, id: &str, opts: &QueryOptions) -> Result<Vec<NodeHit>, StoreError> {
        let ids = self.call_neighbors(id, Direction::Forward)?;
        self.collect_hits(ids, opts)
    }

    /// Entities contained in a file (or methods of a class): targets of
    /// outgoing `contains` edges. Narrow with `include_types`.
    pub fn get_functions_in_file(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<NodeHit>, StoreError> {
        let ids: Vec<String> = self
            .store
            .edges_from(id)?
            .into_iter()
            .filter(|e| e.kind == EdgeKind::Contains)
            .map(|e| e.to)
            .collect();
        self.collect_hits(ids, opts)
    }

    pub fn transitive_callers_flat(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<NodeHit>, StoreError> {
        self.traverse_flat(id, Direction::Reverse, opts)
    }

    pub fn transitive_callees_flat(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<NodeHit>, StoreError> {
        self.traverse_flat(id, Direction::Forward, opts)
    }

    pub fn transitive_callers_tree(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<TreeNode, StoreError> {
        self.traverse_tree(id, Direction::Reverse, opts)
    }

    pub fn transitive_callees_tree(
        &self,
        id: &str,
        opts: &QueryOptions,
    ) -> Result<TreeNode, StoreError> {
        self.traverse_tree(id, Direction::Forward, opts)
    }

    /// Enumerate simple paths from `start` to `target` along call edges, in
    /// edge-insertion order, bounded by `depth_limit` edges and capped at
    /// `max_paths`. `start == target` yields the zero-length path
    /// `[start]`.
    pub fn all_call_chains(
        &self,
        start: &str,
        target: &str,
        opts: &QueryOptions,
    ) -> Result<Vec<Vec<NodeHit>>, StoreError> {
        let depth_limit = opts.depth_limit.unwrap_or(DEFAULT_PATH_DEPTH) as usize;
        let max_paths = opts.max_paths.unwrap_or(DEFAULT_MAX_PATHS) as usize;

        let mut paths: Vec<Vec<String>> = Vec::new();
        let mut path = vec![start.to_string()];
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        self.dfs_paths(start, target, depth_limit, max_paths, &mut path, &mut visited, &mut paths)?;

        paths
            .into_iter()
            .map(|p| {
                p.into_iter()
                    .map(|id| self.resolve_hit(&id, opts))
                    .collect()
            })
            .collect()
    }

    /// Rank nodes by `incoming × outgoing` call edges, descending, ties
    /// broken by ID ascending.
    pub fn hotspots(&self, opts: &QueryOptions) -> Result<Vec<Hotspot>, StoreError> {
        let mut incoming: HashMap<String, u64> = HashMap::new();
        let mut outgoing: HashMap<String, u64> = HashMap::new();
        for edge in self.store.all_edges()? {
            if !edge.kind.is_call() {
                continue;
            }
            *outgoing.entry(edge.from).or_default() += 1;
            *incoming.entry(edge.to).or_default() += 1;
        }

        let mut entries: Vec<(Node, u64, u64, u64)> = Vec::new();
        for node in self.store.all_nodes()? {
            if !passes(node.kind, opts) {
                continue;
            }
            let fan_in = incoming.get(&node.id).copied().unwrap_or(0);
            let fan_out = outgoing.get(&node.id).copied().unwrap_or(0);
            entries.push((node, fan_in, fan_out, fan_in * fan_out));
        }
        entries.sort_by(|a, b| b.3.cmp(&a.3).then_with(|| a.0.id.cmp(&b.0.id)));

        let top = opts
            .top
            .unwrap_or(DEFAULT_HOTSPOT_TOP)
            .min(MAX_HOTSPOT_TOP) as usize;
        entries.truncate(top);

        Ok(entries
            .into_iter()
            .map(|(node, fan_in, fan_out, score)| Hotspot {
                node: if opts.expanded {
                    NodeHit::Expanded(Box::new(ExpandedNode::from(node)))
                } else {
                    NodeHit::Id(node.id)
                },
                incoming: fan_in,
                outgoing: fan_out,
                score,
            })
            .collect())
    }

    pub fn semantic_stats(&self) -> Result<SemanticStats, StoreError> {
        let nodes = self.store.all_nodes()?;
        let edges = self.store.all_edges()?;

        let mut stats = SemanticStats {
            total_nodes: nodes.len(),
            total_edges: edges.len(),
            ..Default::default()
        };
        for node in &nodes {
            match node.kind {
                NodeKind::Class => stats.classes += 1,
                NodeKind::Method => stats.methods += 1,
                NodeKind::Function => stats.functions += 1,
                NodeKind::File => stats.files += 1,
                _ => {}
            }
        }
        for edge in &edges {
            match edge.kind {
                EdgeKind::Call => stats.function_calls += 1,
                EdgeKind::MethodCall => stats.method_calls += 1,
                EdgeKind::Contains => {}
            }
            if edge.meta.bool("isFramework") == Some(true) {
                stats.framework_calls += 1;
            }
        }
        Ok(stats)
    }

    // ── Internals ────────────────────────────────────────────────────────

    /// Neighbor IDs along call edges, deduplicated, edge-insertion order.
    fn call_neighbors(&self, id: &str, direction: Direction) -> Result<Vec<String>, StoreError> {
        let edges = match direction {
            Direction::Forward => self.store.edges_from(id)?,
            Direction::Reverse => self.store.edges_to(id)?,
        };
        let mut seen = HashSet::new();
        Ok(edges
            .into_iter()
            .filter(|e| e.kind.is_call())
            .map(|e| match direction {
                Direction::Forward => e.to,
                Direction::Reverse => e.from,
            })
            .filter(|id| seen.insert(id.clone()))
            .collect())
    }

    /// BFS over call edges. The start node is excluded from the result;
    /// filters affect membership, not reachability.
    fn traverse_flat(
        &self,
        start: &str,
        direction: Direction,
        opts: &QueryOptions,
    ) -> Result<Vec<NodeHit>, StoreError> {
        let max_depth = opts.max_depth.unwrap_or(DEFAULT_FLAT_DEPTH);
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        let mut queue: VecDeque<(String, u32)> = VecDeque::new();
        queue.push_back((start.to_string(), 0));
        let mut out = Vec::new();

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= max_depth {
                continue;
            }
            for next in self.call_neighbors(&current, direction)? {
                if !visited.insert(next.clone()) {
                    continue;
                }
                let node = self.store.get_node(&next)?;
                if node.as_ref().map_or(true, |n| passes(n.kind, opts)) {
                    out.push(make_hit(&next, node, opts.expanded));
                }
                queue.push_back((next, depth + 1));
            }
        }
        Ok(out)
    }

    /// DFS producing a rooted tree; back-edges and depth overflow become
    /// leaves, filtered nodes are pruned with their subtree.
    fn traverse_tree(
        &self,
        start: &str,
        direction: Direction,
        opts: &QueryOptions,
    ) -> Result<TreeNode, StoreError> {
        let max_depth = opts.max_depth.unwrap_or(DEFAULT_TREE_DEPTH);
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(start.to_string());
        self.tree_from(start, direction, 0, max_depth, &mut visited, opts)
    }

    fn tree_from(
        &self,
        id: &str,
        direction: Direction,
        depth: u32,
        max_depth: u32,
        visited: &mut HashSet<String>,
        opts: &QueryOptions,
    ) -> Result<TreeNode, StoreError> {
        let mut tree = TreeNode {
            node_id: id.to_string(),
            node: self.expanded_of(id, opts)?,
            children: Vec::new(),
        };
        if depth >= max_depth {
            return Ok(tree);
        }

        for next in self.call_neighbors(id, direction)? {
            if visited.contains(&next) {
                // cycle or reconvergence: show the node, stop the branch
                let node = self.store.get_node(&next)?;
                if node.as_ref().map_or(true, |n| passes(n.kind, opts)) {
                    tree.children.push(TreeNode {
                        node_id: next.clone(),
                        node: self.expanded_of(&next, opts)?,
                        children: Vec::new(),
                    });
                }
                continue;
            }
            let node = self.store.get_node(&next)?;
            if !node.as_ref().map_or(true, |n| passes(n.kind, opts)) {
                continue; // pruned with its subtree
            }
            visited.insert(next.clone());
            tree.children
                .push(self.tree_from(&next, direction, depth + 1, max_depth, visited, opts)?);
        }
        Ok(tree)
    }

    #[allow(clippy::too_many_arguments)]
    fn dfs_paths(
        &self,
        current: &str,
        target: &str,
        depth_limit: usize,
        max_paths: usize,
        path: &mut Vec<String>,
        visited: &mut HashSet<String>,
        paths: &mut Vec<Vec<String>>,
    ) -> Result<(), StoreError> {
        if paths.len() >= max_paths {
            return Ok(());
        }
        if current == target {
            paths.push(path.clone());
            return Ok(());
        }
        // path holds nodes; edges used so far = len - 1
        if path.len() > depth_limit {
            return Ok(());
        }
        for next in self.call_neighbors(current, Direction::Forward)? {
            if paths.len() >= max_paths {
                break;
            }
            if visited.contains(&next) {
                continue;
            }
            visited.insert(next.clone());
            path.push(next.clone());
            self.dfs_paths(&next, target, depth_limit, max_paths, path, visited, paths)?;
            path.pop();
            visited.remove(&next);
        }
        Ok(())
    }

    fn collect_hits(
        &self,
        ids: Vec<String>,
        opts: &QueryOptions,
    ) -> Result<Vec<NodeHit>, StoreError> {
        let mut out = Vec::new();
        for id in ids {
            let node = self.store.get_node(&id)?;
            if node.as_ref().map_or(true, |n| passes(n.kind, opts)) {
                out.push(make_hit(&id, node, opts.expanded));
            }
        }
        Ok(out)
    }

    fn resolve_hit(&self, id: &str, opts: &QueryOptions) -> Result<NodeHit, StoreError> {
        let node = self.store.get_node(id)?;
        Ok(make_hit(id, node, opts.expanded))
    }

    fn expanded_of(&self, id: &str, opts: &QueryOptions) -> Result<Option<ExpandedNode>, StoreError> {
        if !opts.expanded {
            return Ok(None);
        }
        Ok(self.store.get_node(id)?.map(ExpandedNode::from))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Reverse,
}

/// `exclude_types` is applied before `include_types`.
fn passes(kind: NodeKind, opts: &QueryOptions) -> bool {
    if let Some(excluded) = &opts.exclude_types {
        if excluded.contains(&kind) {
            return false;
        }
    }
    if let Some(included) = &opts.include_types {
        if !included.contains(&kind) {
            return false;
        }
    }
    true
}

fn make_hit(id: &str, node: Option<Node>, expanded: bool) -> NodeHit {
    match node {
        Some(n) if expanded => NodeHit::Expanded(Box::new(ExpandedNode::from(n))),
        _ => NodeHit::Id(id.to_string()),
    }
}
