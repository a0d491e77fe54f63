//! Source-tree discovery with gitignore-aware filtering
//!
//! Uses the `ignore` crate (from ripgrep) to respect `.gitignore`,
//! `.ignore`, and `.git/info/exclude`, on top of the analyzer's own
//! directory deny-list and extension allow-list.

use std::path::{Path, PathBuf};

use ignore::WalkBuilder;

use crate::config::AnalyzeConfig;
use crate::error::AnalyzerError;

/// Discover source files under `root`, respecting the configured directory
/// deny-list and extension allow-list.
///
/// Returns absolute paths sorted lexicographically so that every downstream
/// pass (and therefore edge insertion order) is deterministic for an
/// unchanged tree.
pub fn discover_files(root: &Path, config: &AnalyzeConfig) -> Result<Vec<PathBuf>, AnalyzerError> {
    if !root.is_dir() {
        return Err(AnalyzerError::InvalidPath(root.to_path_buf()));
    }
    let root = root
        .canonicalize()
        .map_err(|_| AnalyzerError::InvalidPath(root.to_path_buf()))?;

    let ignore_dirs = config.ignore_dirs.clone();
    let mut builder = WalkBuilder::new(&root);
    builder
        .hidden(true)
        .git_ignore(true)
        .git_global(true)
        .git_exclude(true)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            if !is_dir {
                return true;
            }
            match entry.file_name().to_str() {
                Some(name) => !ignore_dirs.iter().any(|d| d == name),
                None => true,
            }
        });

    let mut files = Vec::new();
    for entry in builder.build() {
        let entry = match entry {
            Ok(e) => e,
            Err(_) => continue, // unreadable entries are skipped, not fatal
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let path = entry.into_path();
        if has_supported_extension(&path, &config.extensions) {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    let ext = match path.extension().and_then(|e| e.to_str()) {
        Some(e) => e,
        None => return false,
    };
    let with_dot = format!(".{ext}");
    extensions.iter().any(|e| e == &with_dot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_check_requires_leading_dot_entries() {
        let exts = vec![".ts".to_string(), ".js".to_string()];
        assert!(has_supported_extension(Path::new("a/b.ts"), &exts));
        assert!(!has_supported_extension(Path::new("a/b.rs"), &exts));
        assert!(!has_supported_extension(Path::new("a/b"), &exts));
    }
}
