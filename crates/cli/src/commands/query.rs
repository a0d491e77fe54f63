//! `callmap query`: one operation per invocation, JSON out.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use serde_json::json;

use callmap_core::{
    detect_project, NodeKind, ProjectRegistry, QueryEngine, QueryOptions, SqliteStore,
};

#[derive(Subcommand)]
pub enum QueryOp {
    /// Fetch one node by ID
    Node { id: String },

    /// Fuzzy search over IDs, labels and metadata
    Search {
        q: String,
        #[arg(long, value_parser = parse_kind, value_delimiter = ',')]
        include: Option<Vec<NodeKind>>,
        #[arg(long, value_parser = parse_kind, value_delimiter = ',')]
        exclude: Option<Vec<NodeKind>>,
    },

    /// Direct callers of a node
    Callers { id: String },

    /// Direct callees of a node
    Callees { id: String },

    /// Entities contained in a file (or methods of a class)
    Functions {
        id: String,
        #[arg(long, value_parser = parse_kind, value_delimiter = ',')]
        include: Option<Vec<NodeKind>>,
    },

    /// Transitive callers (flat, or --tree)
    TransitiveCallers {
        id: String,
        #[arg(long)]
        tree: bool,
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// Transitive callees (flat, or --tree)
    TransitiveCallees {
        id: String,
        #[arg(long)]
        tree: bool,
        #[arg(long)]
        max_depth: Option<u32>,
    },

    /// All simple call paths between two nodes
    Chains {
        start: String,
        target: String,
        #[arg(long)]
        depth_limit: Option<u32>,
        #[arg(long)]
        max_paths: Option<u32>,
    },

    /// Nodes ranked by fan-in × fan-out
    Hotspots {
        #[arg(long)]
        top: Option<u32>,
    },

    /// Aggregate graph counts
    Stats,

    /// Dump all nodes
    Nodes,

    /// Dump all edges
    Edges,
}

fn parse_kind(s: &str) -> Result<NodeKind, String> {
    NodeKind::parse(s).ok_or_else(|| format!("unknown node type `{s}`"))
}

pub fn run(
    registry: &mut ProjectRegistry,
    op: QueryOp,
    project: Option<PathBuf>,
    pretty: bool,
) -> Result<()> {
    let start = match project {
        Some(p) => p,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };
    let detected = detect_project(&start);
    let Some(entry) = registry.get(&detected.root).cloned() else {
        bail!(
            "project {} has not been analyzed yet; run `callmap analyze` first",
            detected.root.display()
        );
    };
    registry.register(&detected)?; // refresh last_used
    if !entry.db_path.exists() {
        bail!("graph database missing: {}", entry.db_path.display());
    }

    let store = SqliteStore::open(&entry.db_path)?;
    let engine = QueryEngine::new(&store);

    let value = match op {
        QueryOp::Node { id } => json!(engine.get_node(&id)?),
        QueryOp::Search {
            q,
            include,
            exclude,
        } => {
            let opts = QueryOptions {
                include_types: include,
                exclude_types: exclude,
                ..Default::default()
            };
            json!(engine.search_nodes(&q, &opts)?)
        }
        QueryOp::Callers { id } => json!(engine.get_callers(&id, &QueryOptions::default())?),
        QueryOp::Callees { id } => json!(engine.get_callees(&id, &QueryOptions::default())?),
        QueryOp::Functions { id, include } => {
            let opts = QueryOptions {
                include_types: include,
                ..Default::default()
            };
            json!(engine.get_functions_in_file(&id, &opts)?)
        }
        QueryOp::TransitiveCallers {
            id,
            tree,
            max_depth,
        } => {
            let opts = QueryOptions {
                max_depth,
                ..Default::default()
            };
            if tree {
                json!(engine.transitive_callers_tree(&id, &opts)?)
            } else {
                json!(engine.transitive_callers_flat(&id, &opts)?)
            }
        }
        QueryOp::TransitiveCallees {
            id,
            tree,
            max_depth,
        } => {
            let opts = QueryOptions {
                max_depth,
                ..Default::default()
            };
            if tree {
                json!(engine.transitive_callees_tree(&id, &opts)?)
            } else {
                json!(engine.transitive_callees_flat(&id, &opts)?)
            }
        }
        QueryOp::Chains {
            start,
            target,
            depth_limit,
            max_paths,
        } => {
            let opts = QueryOptions {
                depth_limit,
                max_paths,
                ..Default::default()
            };
            json!(engine.all_call_chains(&start, &target, &opts)?)
        }
        QueryOp::Hotspots { top } => {
            let opts = QueryOptions {
                top,
                ..Default::default()
            };
            json!(engine.hotspots(&opts)?)
        }
        QueryOp::Stats => json!(engine.semantic_stats()?),
        QueryOp::Nodes => json!(engine.get_all_nodes(&QueryOptions::default())?),
        QueryOp::Edges => json!(engine.get_all_edges()?),
    };

    let rendered = if pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        serde_json::to_string(&value)?
    };
    println!("{rendered}");
    Ok(())
}
