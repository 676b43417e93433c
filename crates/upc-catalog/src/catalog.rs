//! Revision-indexed change catalog

use crate::document::ChangeDocument;
use crate::error::CatalogResult;
use crate::types::{Change, ChangeKind};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::Path;

/// Changes grouped by the bootstrap revision that introduces them
///
/// Built once, then only read. Iteration over revisions is ascending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    by_version: BTreeMap<i64, Vec<Change>>,
}

impl Catalog {
    /// Build from a flat change list, grouping by `to_version`
    #[must_use]
    pub fn from_changes(changes: impl IntoIterator<Item = Change>) -> Self {
        let mut by_version: BTreeMap<i64, Vec<Change>> = BTreeMap::new();
        for change in changes {
            if change.to_version <= 0 {
                tracing::warn!(target_name = %change.target, "change without to_version skipped");
                continue;
            }
            by_version.entry(change.to_version).or_default().push(change);
        }
        Self { by_version }
    }

    /// Build from either document shape
    #[must_use]
    pub fn from_document(document: ChangeDocument) -> Self {
        match document {
            ChangeDocument::Flat(changes) => Self::from_changes(changes),
            ChangeDocument::Versions { versions } => {
                let mut by_version: BTreeMap<i64, Vec<Change>> = BTreeMap::new();
                for bucket in versions {
                    if bucket.version == 0 {
                        tracing::warn!(changes = bucket.changes.len(), "bucket with version 0 skipped");
                        continue;
                    }
                    by_version.entry(bucket.version).or_default().extend(bucket.changes);
                }
                Self { by_version }
            }
        }
    }

    /// Load a change document from disk
    pub fn load(path: &Path) -> CatalogResult<Self> {
        let catalog = Self::from_document(ChangeDocument::read(path)?);
        tracing::info!(
            path = %path.display(),
            versions = catalog.by_version.len(),
            changes = catalog.len(),
            "loaded upgrade change catalog"
        );
        Ok(catalog)
    }

    /// Known revisions, ascending
    pub fn versions(&self) -> impl Iterator<Item = i64> + '_ {
        self.by_version.keys().copied()
    }

    /// Changes recorded at exactly `version`
    #[must_use]
    pub fn changes_at(&self, version: i64) -> &[Change] {
        self.by_version.get(&version).map_or(&[], Vec::as_slice)
    }

    /// Total number of changes
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_version.values().map(Vec::len).sum()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_version.is_empty()
    }

    /// Forced global sysvar changes with `from < revision <= to`
    ///
    /// Returned changes have versions defaulted against their bucket.
    #[must_use]
    pub fn forced_sysvar_changes(&self, from: i64, to: i64) -> Vec<Change> {
        if to <= from {
            return Vec::new();
        }
        self.by_version
            .range((Bound::Excluded(from), Bound::Included(to)))
            .flat_map(|(&version, changes)| {
                changes
                    .iter()
                    .filter(|c| {
                        c.force && c.kind == ChangeKind::Sysvar && c.scope.is_global_or_unspecified()
                    })
                    .map(move |c| c.normalized(version))
            })
            .collect()
    }

    /// Value of every global sysvar as of `up_to`, keyed by lower-cased name
    ///
    /// Replays changes in ascending revision order; the last write wins.
    #[must_use]
    pub fn latest_global_sysvar_values(&self, up_to: i64) -> BTreeMap<String, Change> {
        let mut latest = BTreeMap::new();
        if up_to <= 0 {
            return latest;
        }
        for (&version, changes) in self.by_version.range(..=up_to) {
            for change in changes {
                if change.kind != ChangeKind::Sysvar || !change.scope.is_global_or_unspecified() {
                    continue;
                }
                latest.insert(change.target.trim().to_lowercase(), change.normalized(version));
            }
        }
        latest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::VersionBucket;
    use crate::types::ChangeScope;

    fn catalog() -> Catalog {
        Catalog::from_changes(vec![
            Change::sysvar("tidb_enable_clustered_index", "INT_ONLY", 50),
            Change::sysvar("tidb_enable_clustered_index", "ON", 66).with_force(true),
            Change::sysvar("TiDB_Session_Only", "1", 67)
                .with_force(true)
                .with_scope(ChangeScope::Session),
            Change::sysvar("max_connections", "151", 40),
        ])
    }

    #[test]
    fn forced_changes_respect_half_open_range() {
        let c = catalog();
        assert_eq!(c.forced_sysvar_changes(65, 66).len(), 1);
        assert!(c.forced_sysvar_changes(66, 80).is_empty());
        assert!(c.forced_sysvar_changes(66, 66).is_empty());
        assert!(c.forced_sysvar_changes(80, 10).is_empty());
    }

    #[test]
    fn latest_values_replay_in_order() {
        let c = catalog();
        let at_60 = c.latest_global_sysvar_values(60);
        assert_eq!(at_60["tidb_enable_clustered_index"].default_value, "INT_ONLY");
        assert_eq!(at_60["max_connections"].default_value, "151");

        let at_70 = c.latest_global_sysvar_values(70);
        assert_eq!(at_70["tidb_enable_clustered_index"].default_value, "ON");
        assert!(!at_70.contains_key("tidb_session_only"));
        assert!(c.latest_global_sysvar_values(0).is_empty());
    }

    #[test]
    fn versions_document_defaults_bucket_versions() {
        let doc = ChangeDocument::Versions {
            versions: vec![
                VersionBucket {
                    version: 0,
                    changes: vec![Change::sysvar("ignored", "x", 0).with_force(true)],
                },
                VersionBucket {
                    version: 99,
                    changes: vec![Change {
                        from_version: 0,
                        to_version: 0,
                        ..Change::sysvar("TiDB_Foo", "ON", 0).with_force(true)
                    }],
                },
            ],
        };
        let c = Catalog::from_document(doc);
        assert_eq!(c.versions().collect::<Vec<_>>(), vec![99]);
        let forced = c.forced_sysvar_changes(0, 100);
        assert_eq!((forced[0].from_version, forced[0].to_version), (98, 99));
        assert!(c.latest_global_sysvar_values(99).contains_key("tidb_foo"));
    }

    #[test]
    fn flat_entries_without_version_are_skipped() {
        let c = Catalog::from_changes(vec![Change {
            to_version: 0,
            ..Change::sysvar("x", "1", 0)
        }]);
        assert!(c.is_empty());
    }
}
