//! Project detection and the analyzed-project registry.
//!
//! A project root is the nearest ancestor directory carrying a recognized
//! manifest. The registry remembers every analyzed project, keyed by root
//! path, and derives each project's database file from a hash of that path
//! so repeated analyses land in the same place. The registry is an owned
//! value the host constructs with a storage root and passes around; there
//! is no process-wide singleton.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Manifest files that mark a project root, in probe order.
const ROOT_MARKERS: &[&str] = &[
    "package.json",
    "requirements.txt",
    "pyproject.toml",
    "go.mod",
    "Cargo.toml",
];

/// A detected project: its root directory and display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    pub name: String,
    pub root: PathBuf,
}

/// Walk upward from `start` looking for the nearest ancestor containing a
/// root marker. Falls back to `start` itself (its basename as the name)
/// when no marker exists.
pub fn detect_project(start: &Path) -> Project {
    let start = start.canonicalize().unwrap_or_else(|_| start.to_path_buf());
    let mut current = Some(start.as_path());
    while let Some(dir) = current {
        if ROOT_MARKERS.iter().any(|m| dir.join(m).exists()) {
            return Project {
                name: dir_name(dir),
                root: dir.to_path_buf(),
            };
        }
        current = dir.parent();
    }
    Project {
        name: dir_name(&start),
        root: start,
    }
}

fn dir_name(dir: &Path) -> String {
    dir.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "project".to_string())
}

/// One registry row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectEntry {
    pub name: String,
    pub root_path: PathBuf,
    pub db_path: PathBuf,
    pub last_analyzed: Option<SystemTime>,
    pub last_used: Option<SystemTime>,
}

/// Persistent registry of analyzed projects.
///
/// Every mutation writes the registry file; readers always see the latest
/// state even across host restarts.
pub struct ProjectRegistry {
    storage_root: PathBuf,
    entries: HashMap<PathBuf, ProjectEntry>,
}

impl ProjectRegistry {
    /// Open (or initialize) the registry under `storage_root`.
    pub fn open(storage_root: impl Into<PathBuf>) -> Result<Self> {
        let storage_root = storage_root.into();
        std::fs::create_dir_all(&storage_root)
            .with_context(|| format!("failed to create {}", storage_root.display()))?;

        let path = storage_root.join("projects.json");
        let entries = if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?
        } else {
            HashMap::new()
        };

        Ok(Self {
            storage_root,
            entries,
        })
    }

    /// Register (or refresh) a project and return its entry. Persists.
    pub fn register(&mut self, project: &Project) -> Result<ProjectEntry> {
        let db_path = self.db_path_for(&project.root);
        let entry = self
            .entries
            .entry(project.root.clone())
            .or_insert_with(|| ProjectEntry {
                name: project.name.clone(),
                root_path: project.root.clone(),
                db_path,
                last_analyzed: None,
                last_used: None,
            });
        entry.last_used = Some(SystemTime::now());
        let entry = entry.clone();
        self.persist()?;
        Ok(entry)
    }

    /// Stamp a completed analysis. Persists.
    pub fn mark_analyzed(&mut self, root: &Path) -> Result<()> {
        if let Some(entry) = self.entries.get_mut(root) {
            entry.last_analyzed = Some(SystemTime::now());
            self.persist()?;
        }
        Ok(())
    }

    pub fn get(&self, root: &Path) -> Option<&ProjectEntry> {
        self.entries.get(root)
    }

    /// All entries, sorted by root path for stable listings.
    pub fn entries(&self) -> Vec<&ProjectEntry> {
        let mut all: Vec<&ProjectEntry> = self.entries.values().collect();
        all.sort_by(|a, b| a.root_path.cmp(&b.root_path));
        all
    }

    /// Remove a project. Persists. Returns the removed entry, if any.
    pub fn remove(&mut self, root: &Path) -> Result<Option<ProjectEntry>> {
        let removed = self.entries.remove(root);
        if removed.is_some() {
            self.persist()?;
        }
        Ok(removed)
    }

    /// `<storage_root>/graphs/<sha256(root)[..16]>.db`, stable per root on
    /// this machine, which is all the derivation needs to be.
    pub fn db_path_for(&self, root: &Path) -> PathBuf {
        let digest = Sha256::digest(root.to_string_lossy().as_bytes());
        let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
        self.storage_root.join("graphs").join(format!("{}.db", &hex[..16]))
    }

    fn persist(&self) -> Result<()> {
        let path = self.storage_root.join("projects.json");
        let contents = serde_json::to_string_pretty(&self.entries)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
