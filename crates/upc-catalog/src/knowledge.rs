//! On-disk knowledge base
//!
//! Layout: `<root>/<component>/<version>/defaults.json`. Release directories
//! may be named with or without the leading `v`.

use crate::error::{CatalogError, CatalogResult};
use crate::types::KbSnapshot;
use std::path::{Path, PathBuf};

/// File name of a snapshot inside its release directory
pub const DEFAULTS_FILE: &str = "defaults.json";

/// Source of per-release default snapshots
#[cfg_attr(test, mockall::automock)]
pub trait KnowledgeSource: Send + Sync {
    /// Snapshot for `component` at `version`, `None` when not recorded
    fn snapshot(&self, component: &str, version: &str) -> CatalogResult<Option<KbSnapshot>>;
}

/// Directory-backed [`KnowledgeSource`]
#[derive(Debug, Clone)]
pub struct KnowledgeStore {
    root: PathBuf,
}

impl KnowledgeStore {
    /// Create a store rooted at `root`
    #[inline]
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store root
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Canonical path for a snapshot (version as given)
    #[must_use]
    pub fn path_for(&self, component: &str, version: &str) -> PathBuf {
        self.root.join(component).join(version.trim()).join(DEFAULTS_FILE)
    }

    fn candidates(&self, component: &str, version: &str) -> Vec<PathBuf> {
        let version = version.trim();
        let alternate = match version.strip_prefix('v') {
            Some(bare) => bare.to_string(),
            None => format!("v{version}"),
        };
        vec![
            self.path_for(component, version),
            self.path_for(component, &alternate),
        ]
    }

    /// Load a snapshot, trying the version with and without the `v` prefix
    pub fn load(&self, component: &str, version: &str) -> CatalogResult<Option<KbSnapshot>> {
        let Some(path) = self
            .candidates(component, version)
            .into_iter()
            .find(|p| p.is_file())
        else {
            tracing::debug!(component, version, "no knowledge base snapshot");
            return Ok(None);
        };
        read_snapshot(&path).map(Some)
    }

    /// Write a snapshot to its canonical path
    pub fn save(&self, snapshot: &KbSnapshot) -> CatalogResult<PathBuf> {
        let path = self.path_for(&snapshot.component, &snapshot.version);
        write_snapshot(&path, snapshot)?;
        Ok(path)
    }
}

impl KnowledgeSource for KnowledgeStore {
    fn snapshot(&self, component: &str, version: &str) -> CatalogResult<Option<KbSnapshot>> {
        self.load(component, version)
    }
}

/// Read one snapshot document
pub fn read_snapshot(path: &Path) -> CatalogResult<KbSnapshot> {
    let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io_error(path, e))?;
    serde_json::from_str(&text).map_err(|e| CatalogError::json_error(path.display().to_string(), e))
}

/// Write one snapshot document, creating parent directories
pub fn write_snapshot(path: &Path, snapshot: &KbSnapshot) -> CatalogResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| CatalogError::io_error(parent, e))?;
    }
    let json = serde_json::to_string_pretty(snapshot)
        .map_err(|e| CatalogError::json_error(path.display().to_string(), e))?;
    std::fs::write(path, json).map_err(|e| CatalogError::io_error(path, e))
}
