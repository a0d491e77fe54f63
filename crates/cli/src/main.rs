//! Callmap CLI - build driver and query front-end

mod commands;
mod progress;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;

use callmap_core::{CallmapConfig, ProjectRegistry};

#[derive(Parser)]
#[command(name = "callmap")]
#[command(about = "Static call-graph analysis for JavaScript/TypeScript", long_about = None)]
#[command(version = callmap_core::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Registry storage root (default: the platform data directory)
    #[arg(long, global = true)]
    storage_root: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a project and persist its call graph
    Analyze {
        /// Path inside the project (default: current directory)
        path: Option<PathBuf>,

        /// Build against the in-memory back-end and flush once at the end
        #[arg(long)]
        in_memory: bool,

        /// Also write the graph as a JSON document
        #[arg(long, value_name = "FILE")]
        emit_json: Option<PathBuf>,
    },

    /// Run one query operation against an analyzed project
    Query {
        #[command(subcommand)]
        op: commands::query::QueryOp,

        /// Path inside the project (default: current directory)
        #[arg(long)]
        project: Option<PathBuf>,

        /// Pretty-print the JSON result
        #[arg(long)]
        pretty: bool,
    },

    /// List analyzed projects
    Projects,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("{} {e:#}", "error:".red().bold());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let storage_root = resolve_storage_root(&cli)?;
    let mut registry = ProjectRegistry::open(&storage_root)?;

    match cli.command {
        Commands::Analyze {
            path,
            in_memory,
            emit_json,
        } => commands::analyze::run(&mut registry, path, in_memory, emit_json),
        Commands::Query {
            op,
            project,
            pretty,
        } => commands::query::run(&mut registry, op, project, pretty),
        Commands::Projects => commands::projects::run(&registry),
    }
}

fn resolve_storage_root(cli: &Cli) -> Result<PathBuf> {
    if let Some(root) = &cli.storage_root {
        return Ok(root.clone());
    }
    // A project-local callmap.toml may pin the storage root.
    let cwd = std::env::current_dir().context("cannot determine working directory")?;
    let config = CallmapConfig::load(&cwd)?;
    if let Some(root) = config.registry.storage_root {
        return Ok(PathBuf::from(root));
    }
    Ok(dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("callmap"))
}
