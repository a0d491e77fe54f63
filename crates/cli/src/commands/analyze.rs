//! `callmap analyze`: run the pipeline and persist the graph.

use std::path::PathBuf;

use anyhow::{Context, Result};
use colored::Colorize;

use callmap_core::{
    detect_project, open_store, Analyzer, CallmapConfig, CancelToken, ProgressSink,
    ProjectRegistry, QueryEngine, StoreBackend,
};

use crate::progress::SpinnerProgress;

pub fn run(
    registry: &mut ProjectRegistry,
    path: Option<PathBuf>,
    in_memory: bool,
    emit_json: Option<PathBuf>,
) -> Result<()> {
    let start = match path {
        Some(p) => p,
        None => std::env::current_dir().context("cannot determine working directory")?,
    };
    let project = detect_project(&start);
    let config = CallmapConfig::load(&project.root)?;
    let entry = registry.register(&project)?;

    println!(
        "{} {} {}",
        "analyzing".green().bold(),
        project.name.bold(),
        format!("({})", project.root.display()).dimmed()
    );

    let cancel = CancelToken::new();
    {
        let handler_token = cancel.clone();
        ctrlc::set_handler(move || handler_token.cancel())
            .context("failed to install interrupt handler")?;
    }

    let backend = if in_memory {
        StoreBackend::Memory
    } else {
        StoreBackend::Native
    };
    let mut store = open_store(backend, &entry.db_path)?;

    let analyzer = Analyzer::new(&project.root, config);
    let progress = SpinnerProgress::new("starting");
    let (graph, report) = analyzer.analyze(&progress, &cancel)?;
    progress.report("saving graph", 0);
    store.save_graph(&graph)?;
    if let Some(json_path) = &emit_json {
        graph.into_document().save(json_path)?;
    }
    progress.finish("analysis complete");

    registry.mark_analyzed(&project.root)?;

    for (file, reason) in &report.files_skipped {
        eprintln!(
            "{} skipped {}: {}",
            "warning:".yellow().bold(),
            file.display(),
            reason
        );
    }

    let engine = QueryEngine::new(store.as_ref());
    let stats = engine.semantic_stats()?;
    println!(
        "  {} files, {} functions, {} classes, {} methods",
        stats.files, stats.functions, stats.classes, stats.methods
    );
    println!(
        "  {} nodes, {} edges ({} calls, {} method calls)",
        stats.total_nodes, stats.total_edges, stats.function_calls, stats.method_calls
    );
    println!("  {} {}", "graph:".dimmed(), entry.db_path.display());

    store.close()?;
    Ok(())
}
