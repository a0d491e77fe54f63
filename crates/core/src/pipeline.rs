//! The build pipeline: discover → extract → resolve → build.
//!
//! Single-threaded and cooperative: the cancellation token is checked
//! between files and between phases, progress goes to the caller-supplied
//! sink, and per-file extraction failures are collected as data rather than
//! logged; the host decides how to render them.

use std::path::{Path, PathBuf};

use crate::builder::build_graph;
use crate::config::CallmapConfig;
use crate::discovery::discover_files;
use crate::error::AnalyzerError;
use crate::extract::{extract_file, FileAnalysis};
use crate::graph::CallGraph;
use crate::progress::{CancelToken, ProgressSink};
use crate::resolver;
use crate::store::GraphStore;

/// What a build did, beyond the graph itself.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub files_analyzed: usize,
    /// `(path, reason)` for every file that failed to read or parse.
    pub files_skipped: Vec<(PathBuf, String)>,
    pub node_count: usize,
    pub edge_count: usize,
}

/// Drives the full analysis of one source tree.
pub struct Analyzer {
    root: PathBuf,
    config: CallmapConfig,
}

impl Analyzer {
    pub fn new(root: impl Into<PathBuf>, config: CallmapConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run the pipeline and return the graph plus the build report.
    pub fn analyze(
        &self,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<(CallGraph, BuildReport), AnalyzerError> {
        // Discovery returns canonical paths; normalize against the same
        // canonical root or relative IDs would silently go absolute.
        let root = self
            .root
            .canonicalize()
            .map_err(|_| AnalyzerError::InvalidPath(self.root.clone()))?;
        let files = discover_files(&root, &self.config.analyze)?;
        progress.report(&format!("discovered {} files", files.len()), 0);

        let mut report = BuildReport::default();
        let mut analyses: Vec<FileAnalysis> = Vec::with_capacity(files.len());

        for file in &files {
            if cancel.is_cancelled() {
                return Err(AnalyzerError::Cancelled);
            }
            match extract_file(file, &root) {
                Ok(analysis) => {
                    report.files_analyzed += 1;
                    analyses.push(analysis);
                }
                Err(e) => {
                    report.files_skipped.push((file.clone(), e.to_string()));
                }
            }
            progress.report(&format!("extracted {}", file.display()), 1);
        }

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        progress.report("resolving call sites", 0);
        let resolved = resolver::resolve(analyses);

        if cancel.is_cancelled() {
            return Err(AnalyzerError::Cancelled);
        }
        progress.report("building graph", 0);
        let root_str = root.to_string_lossy().replace('\\', "/");
        let graph = build_graph(&resolved, &root_str, &self.config.framework.matcher())?;

        report.node_count = graph.node_count();
        report.edge_count = graph.edge_count();
        Ok((graph, report))
    }

    /// Run the pipeline and persist the result through the store's write
    /// workflow.
    pub fn analyze_into(
        &self,
        store: &mut dyn GraphStore,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<BuildReport, AnalyzerError> {
        let (graph, report) = self.analyze(progress, cancel)?;
        progress.report("saving graph", 0);
        store.save_graph(&graph)?;
        Ok(report)
    }
}
