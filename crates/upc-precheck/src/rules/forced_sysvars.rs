//! Global variables the upgrade itself rewrites

use super::{collapse, revision};
use crate::engine::Rule;
use crate::error::RuleError;
use crate::report::ReportItem;
use crate::snapshot::Snapshot;
use std::sync::Arc;
use upc_catalog::{BootstrapLookup, Catalog};

/// Rule identifier
pub const NAME: &str = "core.forced-global-sysvars";

/// Reports every forced global variable change between the two bootstrap revisions
#[derive(Debug, Clone)]
pub struct ForcedGlobalSysvars {
    catalog: Arc<Catalog>,
    bootstrap: Arc<dyn BootstrapLookup>,
}

impl ForcedGlobalSysvars {
    /// Create the rule over shared catalog and version map handles
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, bootstrap: Arc<dyn BootstrapLookup>) -> Self {
        Self { catalog, bootstrap }
    }
}

impl Rule for ForcedGlobalSysvars {
    fn name(&self) -> &str {
        NAME
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<ReportItem>, RuleError> {
        let target = snapshot.target_version.trim();
        if target.is_empty() {
            return Ok(vec![ReportItem::warning(
                "Target version is missing; unable to evaluate forced global variable changes",
            )
            .with_rule(NAME)
            .with_suggestion("Provide a valid target version for snapshot.target_version")]);
        }

        let Some(target_rev) = revision(self.bootstrap.as_ref(), target)? else {
            return Ok(vec![ReportItem::info(format!(
                "No bootstrap version found for target {target}; skipping global variable checks"
            ))
            .with_rule(NAME)
            .with_suggestion("Update the knowledge base or specify a fully qualified target version")]);
        };

        let source = snapshot.source_version.trim();
        let source_rev = if source.is_empty() {
            0
        } else {
            match revision(self.bootstrap.as_ref(), source)? {
                Some(rev) => rev,
                None => {
                    return Ok(vec![ReportItem::info(format!(
                        "No bootstrap version found for source {source}; skipping global variable checks"
                    ))
                    .with_rule(NAME)
                    .with_suggestion(
                        "Update the knowledge base or specify a fully qualified source version",
                    )]);
                }
            }
        };

        if source_rev >= target_rev {
            return Ok(Vec::new());
        }

        let changes = collapse(self.catalog.forced_sysvar_changes(source_rev, target_rev));
        tracing::debug!(source_rev, target_rev, forced = changes.len(), "forced sysvar changes");

        Ok(changes
            .into_iter()
            .map(|change| {
                let details = if change.details.is_empty() {
                    change.summary.clone()
                } else {
                    change.details.clone()
                };
                ReportItem::warning(format!(
                    "Upgrading to bootstrap {} forces TiDB to set global variable {} to \"{}\"",
                    change.to_version, change.target, change.default_value
                ))
                .with_rule(NAME)
                .with_detail(details)
                .with_suggestions(change.optional_hints.iter().cloned())
                .with_metadata("target", change.target.as_str())
                .with_metadata("default_value", change.default_value.as_str())
                .with_metadata("to_version", change.to_version)
                .with_metadata("summary", change.summary.as_str())
                .with_metadata("details", change.details.as_str())
                .with_metadata("force", change.force)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use pretty_assertions::assert_eq;
    use upc_catalog::{BootstrapMapError, BootstrapVersionMap, Change};

    fn rule(changes: Vec<Change>) -> ForcedGlobalSysvars {
        let map = BootstrapVersionMap::from_entries([("v6.5.0", 60), ("v7.5.0", 70), ("v8.1.0", 80)]);
        ForcedGlobalSysvars::new(Arc::new(Catalog::from_changes(changes)), Arc::new(map))
    }

    #[test]
    fn reports_collapsed_forced_changes_in_order() {
        let rule = rule(vec![
            Change::sysvar("tidb_b", "1", 75).with_force(true).with_summary("first"),
            Change::sysvar("tidb_a", "ON", 72).with_force(true).with_details("set by upgradeToVer72"),
            Change::sysvar("tidb_b", "2", 78)
                .with_force(true)
                .with_summary("second")
                .with_hint("check workloads"),
            Change::sysvar("tidb_not_forced", "x", 74),
            Change::sysvar("tidb_too_late", "y", 85).with_force(true),
        ]);
        let items = rule.evaluate(&Snapshot::new("v7.5.0", "v8.1.0")).unwrap();

        let messages: Vec<_> = items.iter().map(|i| i.message.as_str()).collect();
        assert_eq!(
            messages,
            vec![
                "Upgrading to bootstrap 72 forces TiDB to set global variable tidb_a to \"ON\"",
                "Upgrading to bootstrap 78 forces TiDB to set global variable tidb_b to \"2\"",
            ]
        );
        assert!(items.iter().all(|i| i.severity == Severity::Warning));
        assert_eq!(items[0].details, vec!["set by upgradeToVer72".to_string()]);
        assert_eq!(items[1].details, vec!["second".to_string()]);
        assert_eq!(items[1].suggestions, vec!["check workloads".to_string()]);
        assert_eq!(items[1].metadata["to_version"], 78);
        assert_eq!(items[1].metadata["force"], true);
    }

    #[test]
    fn empty_source_starts_from_revision_zero() {
        let rule = rule(vec![Change::sysvar("tidb_a", "ON", 5).with_force(true)]);
        let items = rule.evaluate(&Snapshot::new("", "v6.5.0")).unwrap();
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn guard_cases() {
        let rule = rule(vec![Change::sysvar("tidb_a", "ON", 72).with_force(true)]);

        let items = rule.evaluate(&Snapshot::new("v7.5.0", "")).unwrap();
        assert_eq!(items[0].severity, Severity::Warning);

        let items = rule.evaluate(&Snapshot::new("v7.5.0", "v9.9.9")).unwrap();
        assert_eq!(items[0].severity, Severity::Info);
        assert!(items[0].message.contains("target v9.9.9"));

        let items = rule.evaluate(&Snapshot::new("v1.0.0", "v8.1.0")).unwrap();
        assert!(items[0].message.contains("source v1.0.0"));

        assert!(rule.evaluate(&Snapshot::new("v8.1.0", "v7.5.0")).unwrap().is_empty());
        assert!(rule.evaluate(&Snapshot::new("v8.1.0", "v8.1.0")).unwrap().is_empty());
    }

    #[derive(Debug)]
    struct BrokenMap;

    impl BootstrapLookup for BrokenMap {
        fn lookup(&self, _: &str) -> Result<Option<i64>, BootstrapMapError> {
            Err(BootstrapMapError::malformed("bundled", "truncated"))
        }
    }

    #[test]
    fn malformed_map_is_a_rule_error() {
        let rule = ForcedGlobalSysvars::new(Arc::new(Catalog::default()), Arc::new(BrokenMap));
        let err = rule.evaluate(&Snapshot::new("v7.5.0", "v8.1.0")).unwrap_err();
        assert!(matches!(err, RuleError::Bootstrap(_)));
    }
}
