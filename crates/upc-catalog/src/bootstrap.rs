//! Release string → bootstrap revision map
//!
//! Built from `upgrade_logic.json` documents, each carrying
//! `metadata.target_version` and `metadata.bootstrap_version`. A copy of the
//! known releases is compiled into the binary and loaded once per process.

use crate::error::BootstrapMapError;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

const UPGRADE_LOGIC_FILE: &str = "upgrade_logic.json";

const BUNDLED_DOCUMENTS: &[(&str, &str)] = &[
    (
        "tidb/v6.5.0",
        include_str!("../knowledge/tidb/v6.5.0/upgrade_logic.json"),
    ),
    (
        "tidb/v7.1.0",
        include_str!("../knowledge/tidb/v7.1.0/upgrade_logic.json"),
    ),
    (
        "tidb/v7.5.0",
        include_str!("../knowledge/tidb/v7.5.0/upgrade_logic.json"),
    ),
    (
        "tidb/v8.1.0",
        include_str!("../knowledge/tidb/v8.1.0/upgrade_logic.json"),
    ),
    (
        "tidb/v8.5.0",
        include_str!("../knowledge/tidb/v8.5.0/upgrade_logic.json"),
    ),
];

static BUNDLED: OnceCell<Result<BootstrapVersionMap, BootstrapMapError>> = OnceCell::new();

#[derive(Deserialize)]
struct UpgradeLogicDocument {
    metadata: UpgradeLogicMetadata,
}

#[derive(Deserialize)]
struct UpgradeLogicMetadata {
    #[serde(default)]
    target_version: String,
    #[serde(default)]
    bootstrap_version: i64,
}

/// Resolve a release string to its bootstrap revision
///
/// `Ok(None)` means the release is unknown. `Err` is reserved for a map that
/// could not be built.
pub trait BootstrapLookup: Send + Sync + Debug {
    /// Look up `release`
    fn lookup(&self, release: &str) -> Result<Option<i64>, BootstrapMapError>;
}

/// Release → bootstrap revision
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapVersionMap {
    entries: BTreeMap<String, i64>,
}

#[inline]
fn normalize(release: &str) -> String {
    release.trim().to_lowercase()
}

impl BootstrapVersionMap {
    /// Build from `(release, revision)` pairs
    #[must_use]
    pub fn from_entries<S: AsRef<str>>(entries: impl IntoIterator<Item = (S, i64)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(release, revision)| (normalize(release.as_ref()), revision))
                .filter(|(release, _)| !release.is_empty())
                .collect(),
        }
    }

    /// Build from `(label, json)` documents
    ///
    /// Documents with an empty target are skipped; later documents win.
    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Result<Self, BootstrapMapError> {
        let mut entries = BTreeMap::new();
        for (label, text) in documents {
            let doc: UpgradeLogicDocument = serde_json::from_str(text)
                .map_err(|e| BootstrapMapError::malformed(label, e))?;
            let target = normalize(&doc.metadata.target_version);
            if target.is_empty() {
                tracing::trace!(document = label, "upgrade logic document without target skipped");
                continue;
            }
            entries.insert(target, doc.metadata.bootstrap_version);
        }
        Ok(Self { entries })
    }

    /// Load every `*/*/upgrade_logic.json` under `root`, in sorted path order
    pub fn load_dir(root: &Path) -> Result<Self, BootstrapMapError> {
        let mut files = Vec::new();
        for component in sorted_subdirs(root)? {
            for release in sorted_subdirs(&component)? {
                let file = release.join(UPGRADE_LOGIC_FILE);
                if file.is_file() {
                    files.push(file);
                }
            }
        }

        let mut documents = Vec::with_capacity(files.len());
        for file in &files {
            let text =
                std::fs::read_to_string(file).map_err(|e| BootstrapMapError::io_error(file, &e))?;
            documents.push((file.display().to_string(), text));
        }
        let map = Self::from_documents(documents.iter().map(|(l, t)| (l.as_str(), t.as_str())))?;
        tracing::debug!(root = %root.display(), releases = map.len(), "loaded bootstrap version map");
        Ok(map)
    }

    /// Process-wide map built from the documents compiled into the binary
    ///
    /// Built on first use. A build failure is cached and returned to every
    /// caller.
    pub fn bundled() -> Result<&'static Self, BootstrapMapError> {
        BUNDLED
            .get_or_init(|| Self::from_documents(BUNDLED_DOCUMENTS.iter().copied()))
            .as_ref()
            .map_err(Clone::clone)
    }

    /// Revision for `release`, if known
    #[must_use]
    pub fn get(&self, release: &str) -> Option<i64> {
        self.entries.get(&normalize(release)).copied()
    }

    /// Number of releases
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate `(release, revision)` in release order
    pub fn iter(&self) -> impl Iterator<Item = (&str, i64)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl BootstrapLookup for BootstrapVersionMap {
    fn lookup(&self, release: &str) -> Result<Option<i64>, BootstrapMapError> {
        Ok(self.get(release))
    }
}

/// Lookup backed by [`BootstrapVersionMap::bundled`]
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledVersions;

impl BootstrapLookup for BundledVersions {
    fn lookup(&self, release: &str) -> Result<Option<i64>, BootstrapMapError> {
        Ok(BootstrapVersionMap::bundled()?.get(release))
    }
}

fn sorted_subdirs(dir: &Path) -> Result<Vec<PathBuf>, BootstrapMapError> {
    let mut dirs = Vec::new();
    let entries = std::fs::read_dir(dir).map_err(|e| BootstrapMapError::io_error(dir, &e))?;
    for entry in entries {
        let entry = entry.map_err(|e| BootstrapMapError::io_error(dir, &e))?;
        let path = entry.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_map_knows_shipped_releases() {
        let map = BootstrapVersionMap::bundled().unwrap();
        assert_eq!(map.len(), BUNDLED_DOCUMENTS.len());
        for release in ["v6.5.0", "v7.1.0", "v7.5.0", "v8.1.0", "v8.5.0"] {
            assert!(map.get(release).is_some(), "{release} missing");
        }
        assert_eq!(map.get(" V7.5.0 "), map.get("v7.5.0"));
        assert_eq!(map.get("v9.9.9"), None);
    }

    #[test]
    fn bundled_revisions_increase_with_release() {
        let map = BootstrapVersionMap::bundled().unwrap();
        let ordered: Vec<i64> = ["v6.5.0", "v7.1.0", "v7.5.0", "v8.1.0", "v8.5.0"]
            .iter()
            .filter_map(|r| map.get(r))
            .collect();
        assert!(ordered.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn documents_without_target_are_skipped() {
        let map = BootstrapVersionMap::from_documents([
            ("a", r#"{"metadata": {"target_version": " V7.5.0 ", "bootstrap_version": 180}}"#),
            ("b", r#"{"metadata": {"target_version": "", "bootstrap_version": 1}}"#),
        ])
        .unwrap();
        assert_eq!(map.iter().collect::<Vec<_>>(), vec![("v7.5.0", 180)]);
    }

    #[test]
    fn malformed_document_is_an_error() {
        let err = BootstrapVersionMap::from_documents([("broken", r#"{"metadata": 3}"#)]).unwrap_err();
        assert!(matches!(err, BootstrapMapError::Malformed { ref document, .. } if document == "broken"));
    }

    #[test]
    fn bundled_lookup_matches_map() {
        let expected = BootstrapVersionMap::bundled().unwrap().get("v8.1.0");
        assert_eq!(BundledVersions.lookup("v8.1.0").unwrap(), expected);
    }
}
