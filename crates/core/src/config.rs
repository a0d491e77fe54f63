//! Configuration file parsing for callmap.toml

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Main configuration structure for callmap.toml
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallmapConfig {
    #[serde(default)]
    pub analyze: AnalyzeConfig,

    #[serde(default)]
    pub framework: FrameworkConfig,

    #[serde(default)]
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeConfig {
    /// File extensions included in the walk (with leading dot)
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Directory names pruned from the walk
    #[serde(default = "default_ignore_dirs")]
    pub ignore_dirs: Vec<String>,
}

impl Default for AnalyzeConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_dirs: default_ignore_dirs(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    [".js", ".jsx", ".ts", ".tsx", ".mjs", ".cjs"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_ignore_dirs() -> Vec<String> {
    [
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        "__pycache__",
        ".venv",
        "target",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Receiver and method names that mark a call as framework interaction
/// rather than project code. All three sets are overridable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameworkConfig {
    /// Receivers that always mark a call as framework (`res.json(...)`)
    #[serde(default = "default_framework_receivers")]
    pub receivers: Vec<String>,

    /// Method names that mark a call as framework when paired with a
    /// receiver from `method_receivers`
    #[serde(default = "default_framework_methods")]
    pub methods: Vec<String>,

    /// Receivers the method rule applies to
    #[serde(default = "default_method_receivers")]
    pub method_receivers: Vec<String>,
}

impl Default for FrameworkConfig {
    fn default() -> Self {
        Self {
            receivers: default_framework_receivers(),
            methods: default_framework_methods(),
            method_receivers: default_method_receivers(),
        }
    }
}

impl FrameworkConfig {
    /// Precompute lookup sets for the builder.
    pub fn matcher(&self) -> FrameworkMatcher {
        FrameworkMatcher {
            receivers: self.receivers.iter().cloned().collect(),
            methods: self.methods.iter().cloned().collect(),
            method_receivers: self.method_receivers.iter().cloned().collect(),
        }
    }
}

fn default_framework_receivers() -> Vec<String> {
    ["res", "req", "app", "next", "router"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_framework_methods() -> Vec<String> {
    [
        "json",
        "send",
        "status",
        "render",
        "redirect",
        "listen",
        "use",
        "get",
        "post",
        "put",
        "delete",
        "patch",
        "route",
        "sendStatus",
        "end",
        "set",
        "header",
        "cookie",
        "all",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_method_receivers() -> Vec<String> {
    ["res", "req", "app", "router"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Hash-set view of [`FrameworkConfig`] used on the hot tagging path.
#[derive(Debug, Clone)]
pub struct FrameworkMatcher {
    receivers: HashSet<String>,
    methods: HashSet<String>,
    method_receivers: HashSet<String>,
}

impl FrameworkMatcher {
    pub fn is_framework(&self, receiver: Option<&str>, method: Option<&str>) -> bool {
        if let Some(r) = receiver {
            if self.receivers.contains(r) {
                return true;
            }
            if let Some(m) = method {
                if self.methods.contains(m) && self.method_receivers.contains(r) {
                    return true;
                }
            }
        }
        false
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Override for the registry storage root (defaults to the host's
    /// data directory)
    #[serde(default)]
    pub storage_root: Option<String>,
}

impl CallmapConfig {
    /// Load `callmap.toml` from the given directory, falling back to
    /// defaults when the file does not exist.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join("callmap.toml");
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_framework_sets() {
        let m = FrameworkConfig::default().matcher();
        assert!(m.is_framework(Some("res"), Some("json")));
        assert!(m.is_framework(Some("next"), None));
        assert!(m.is_framework(Some("router"), Some("get")));
        assert!(!m.is_framework(Some("db"), Some("get")));
        assert!(!m.is_framework(None, Some("json")));
    }

    #[test]
    fn custom_sets_replace_defaults() {
        let toml_src = r#"
            [framework]
            receivers = ["ctx"]
            methods = ["reply"]
            method_receivers = ["ctx"]
        "#;
        let config: CallmapConfig = toml::from_str(toml_src).unwrap();
        let m = config.framework.matcher();
        assert!(m.is_framework(Some("ctx"), Some("reply")));
        assert!(!m.is_framework(Some("res"), Some("json")));
    }
}
