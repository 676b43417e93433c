//! Change-list documents
//!
//! Two accepted shapes: a flat array of changes, or a versions document
//! grouping changes by bootstrap revision.

use crate::error::{CatalogError, CatalogResult};
use crate::types::{null_as_default, Change};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Changes introduced at one bootstrap revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionBucket {
    /// Bootstrap revision
    pub version: i64,
    /// Changes at this revision
    #[serde(default, deserialize_with = "null_as_default")]
    pub changes: Vec<Change>,
}

#[derive(Deserialize)]
struct VersionsBody {
    #[serde(default, deserialize_with = "null_as_default")]
    versions: Vec<VersionBucket>,
}

/// A persisted change list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChangeDocument {
    /// `[Change, ...]`
    Flat(Vec<Change>),
    /// `{"versions": [{"version": N, "changes": [...]}]}`
    Versions {
        /// Buckets, usually ascending
        versions: Vec<VersionBucket>,
    },
}

impl ChangeDocument {
    /// Group changes into a versions document, ascending by `to_version`
    #[must_use]
    pub fn grouped(changes: impl IntoIterator<Item = Change>) -> Self {
        let mut buckets: BTreeMap<i64, Vec<Change>> = BTreeMap::new();
        for change in changes {
            buckets.entry(change.to_version).or_default().push(change);
        }
        Self::Versions {
            versions: buckets
                .into_iter()
                .map(|(version, changes)| VersionBucket { version, changes })
                .collect(),
        }
    }

    /// Total number of changes
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Flat(changes) => changes.len(),
            Self::Versions { versions } => versions.iter().map(|b| b.changes.len()).sum(),
        }
    }

    /// Check if the document holds no changes
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Parse from JSON; `origin` labels errors
    ///
    /// The shape is chosen from the first token, so field errors keep their
    /// position instead of collapsing into an untagged mismatch.
    pub fn from_json(text: &str, origin: &str) -> CatalogResult<Self> {
        let parsed = if text.trim_start().starts_with('[') {
            serde_json::from_str(text).map(Self::Flat)
        } else {
            serde_json::from_str::<VersionsBody>(text).map(|body| Self::Versions {
                versions: body.versions,
            })
        };
        parsed.map_err(|e| CatalogError::json_error(origin, e))
    }

    /// Read a document from disk
    pub fn read(path: &Path) -> CatalogResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io_error(path, e))?;
        Self::from_json(&text, &path.display().to_string())
    }

    /// Pretty JSON rendering
    pub fn to_json_pretty(&self) -> CatalogResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| CatalogError::json_error("change document", e))
    }

    /// Write a document to disk, creating parent directories
    pub fn write(&self, path: &Path) -> CatalogResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| CatalogError::io_error(parent, e))?;
        }
        std::fs::write(path, self.to_json_pretty()?).map_err(|e| CatalogError::io_error(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChangeScope;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_both_shapes() {
        let flat = ChangeDocument::from_json(
            r#"[{"to_version": 66, "target": "tidb_foo", "default_value": "ON", "force": true}]"#,
            "inline",
        )
        .unwrap();
        assert!(matches!(flat, ChangeDocument::Flat(ref c) if c.len() == 1));

        let versions = ChangeDocument::from_json(
            r#"{"versions": [{"version": 66, "changes": [{"target": "tidb_foo", "scope": "GLOBAL"}]}]}"#,
            "inline",
        )
        .unwrap();
        let ChangeDocument::Versions { versions } = versions else {
            panic!("expected versions document");
        };
        assert_eq!(versions[0].version, 66);
        assert_eq!(versions[0].changes[0].scope, ChangeScope::Global);
    }

    #[test]
    fn empty_array_is_flat() {
        let doc = ChangeDocument::from_json("[]", "inline").unwrap();
        assert_eq!(doc, ChangeDocument::Flat(vec![]));
        assert!(doc.is_empty());
    }

    #[test]
    fn grouped_orders_buckets() {
        let doc = ChangeDocument::grouped(vec![
            Change::sysvar("b", "1", 90),
            Change::sysvar("a", "1", 70),
            Change::sysvar("c", "1", 90),
        ]);
        let ChangeDocument::Versions { versions } = &doc else {
            panic!("expected versions document");
        };
        let shape: Vec<_> = versions.iter().map(|b| (b.version, b.changes.len())).collect();
        assert_eq!(shape, vec![(70, 1), (90, 2)]);
        assert_eq!(doc.len(), 3);
    }

    #[test]
    fn null_slices_read_as_empty() {
        let doc = ChangeDocument::from_json(
            r#"{"versions": [
                {"version": 66, "changes": [{"target": "tidb_foo", "default_value": "ON", "force": true, "optional_hints": null}]},
                {"version": 67, "changes": null}
            ]}"#,
            "go-written.json",
        )
        .unwrap();
        let ChangeDocument::Versions { versions } = &doc else {
            panic!("expected versions document");
        };
        assert!(versions[0].changes[0].optional_hints.is_empty());
        assert!(versions[1].changes.is_empty());
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn field_errors_keep_their_cause() {
        let err = ChangeDocument::from_json(
            r#"{"versions": [{"version": 66, "changes": [{"target": "tidb_foo", "force": "yes"}]}]}"#,
            "bad.json",
        )
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.json"));
        assert!(message.contains("invalid type"), "{message}");
        assert!(!message.contains("untagged"));
    }

    #[test]
    fn rejects_malformed_json() {
        let err = ChangeDocument::from_json(r#"{"versions": 3}"#, "bad.json").unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }
}
