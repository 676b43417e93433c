//! Live global variables against catalog baselines
//!
//! Classification per variable, first match wins:
//!
//! 1. customized and a forced change exists: warning, the value will be overridden
//! 2. customized, nothing forced: info, noting whether the target default moves
//! 3. not customized, target default differs, nothing forced: info
//! 4. anything else: no finding
//!
//! A forced change on an uncustomized variable is left to
//! [`ForcedGlobalSysvars`](super::ForcedGlobalSysvars).

use super::{collapse, revision, same_value};
use crate::engine::Rule;
use crate::error::RuleError;
use crate::report::ReportItem;
use crate::snapshot::Snapshot;
use std::collections::BTreeMap;
use std::sync::Arc;
use upc_catalog::{BootstrapLookup, Catalog, Change};

/// Rule identifier
pub const NAME: &str = "core.configured-global-sysvars";

/// Highlights user-configured global variables and changing defaults
#[derive(Debug, Clone)]
pub struct ConfiguredGlobalSysvars {
    catalog: Arc<Catalog>,
    bootstrap: Arc<dyn BootstrapLookup>,
}

impl ConfiguredGlobalSysvars {
    /// Create the rule over shared catalog and version map handles
    #[must_use]
    pub fn new(catalog: Arc<Catalog>, bootstrap: Arc<dyn BootstrapLookup>) -> Self {
        Self { catalog, bootstrap }
    }

    fn skipped(which: &str, release: &str) -> Vec<ReportItem> {
        let message = if release.is_empty() {
            format!("{which} version is missing; unable to evaluate configured global variables")
        } else {
            format!(
                "No bootstrap version mapping found for {} {release}; skipping configured variable checks",
                which.to_lowercase()
            )
        };
        vec![ReportItem::info(message)
            .with_rule(NAME)
            .with_suggestion("Update the knowledge base or specify a full version string")]
    }
}

impl Rule for ConfiguredGlobalSysvars {
    fn name(&self) -> &str {
        NAME
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<ReportItem>, RuleError> {
        if snapshot.global_sysvars.is_empty() {
            return Ok(Vec::new());
        }

        let source = snapshot.source_version.trim();
        let target = snapshot.target_version.trim();
        let source_rev = match (source.is_empty(), revision(self.bootstrap.as_ref(), source)?) {
            (false, Some(rev)) => rev,
            _ => return Ok(Self::skipped("Source", source)),
        };
        let target_rev = match (target.is_empty(), revision(self.bootstrap.as_ref(), target)?) {
            (false, Some(rev)) => rev,
            _ => return Ok(Self::skipped("Target", target)),
        };

        let source_baseline = self.catalog.latest_global_sysvar_values(source_rev);
        let target_baseline = self.catalog.latest_global_sysvar_values(target_rev);
        let forced: BTreeMap<String, Change> =
            collapse(self.catalog.forced_sysvar_changes(source_rev, target_rev))
                .into_iter()
                .map(|c| (c.target.trim().to_lowercase(), c))
                .collect();

        let mut items = Vec::new();
        for (name, current) in &snapshot.global_sysvars {
            let key = name.trim().to_lowercase();
            let current = current.trim();
            let Some(baseline) = source_baseline.get(&key) else {
                continue;
            };
            let expected = baseline.default_value.trim();
            let next = target_baseline.get(&key).map(|c| c.default_value.trim());
            let customized = !same_value(current, expected);

            let item = match (customized, forced.get(&key)) {
                (true, Some(change)) => overridden(name, current, baseline, change),
                (true, None) => customized_item(name, current, baseline, next),
                (false, None) => match next {
                    Some(next) if !same_value(expected, next) => default_moves(name, baseline, next),
                    _ => continue,
                },
                (false, Some(_)) => continue,
            };
            items.push((key, item));
        }

        items.sort_by(|a, b| a.0.cmp(&b.0));
        tracing::debug!(source_rev, target_rev, items = items.len(), "configured sysvars checked");
        Ok(items.into_iter().map(|(_, item)| item).collect())
    }
}

fn overridden(name: &str, current: &str, baseline: &Change, forced: &Change) -> ReportItem {
    ReportItem::warning(format!(
        "Global variable {name} is customized as \"{current}\" and will be overridden to \"{}\" at bootstrap {}",
        forced.default_value, forced.to_version
    ))
    .with_rule(NAME)
    .with_detail(if forced.details.is_empty() {
        forced.summary.clone()
    } else {
        forced.details.clone()
    })
    .with_suggestion("Plan to re-apply or revisit this customization after the upgrade overrides it")
    .with_metadata("target", name)
    .with_metadata("current_value", current)
    .with_metadata("baseline_value", baseline.default_value.as_str())
    .with_metadata("baseline_version", baseline.to_version)
    .with_metadata("forced_value", forced.default_value.as_str())
    .with_metadata("forced_version", forced.to_version)
}

fn customized_item(name: &str, current: &str, baseline: &Change, next: Option<&str>) -> ReportItem {
    let expected = baseline.default_value.trim();
    let outlook = match next {
        Some(next) if !same_value(expected, next) => {
            format!("The default also changes to \"{next}\" in the target release")
        }
        _ => "The default is unchanged in the target release".to_string(),
    };
    let mut item = ReportItem::info(format!(
        "Global variable {name} is configured as \"{current}\", which differs from the bootstrap {} default \"{expected}\"",
        baseline.to_version
    ))
    .with_rule(NAME)
    .with_detail(outlook)
    .with_suggestion("Confirm whether this customized value still satisfies business requirements")
    .with_metadata("target", name)
    .with_metadata("current_value", current)
    .with_metadata("baseline_value", expected)
    .with_metadata("baseline_version", baseline.to_version);
    if let Some(next) = next {
        item = item.with_metadata("target_value", next);
    }
    item
}

fn default_moves(name: &str, baseline: &Change, next: &str) -> ReportItem {
    let expected = baseline.default_value.trim();
    ReportItem::info(format!(
        "Default of global variable {name} changes from \"{expected}\" to \"{next}\""
    ))
    .with_rule(NAME)
    .with_suggestion("Review whether the new default suits the workload")
    .with_metadata("target", name)
    .with_metadata("current_value", expected)
    .with_metadata("baseline_value", expected)
    .with_metadata("target_value", next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use pretty_assertions::assert_eq;
    use upc_catalog::BootstrapVersionMap;

    fn rule() -> ConfiguredGlobalSysvars {
        let catalog = Catalog::from_changes(vec![
            Change::sysvar("tidb_enable_clustered_index", "INT_ONLY", 50),
            Change::sysvar("tidb_enable_clustered_index", "ON", 66).with_force(true),
            Change::sysvar("max_connections", "151", 40),
            Change::sysvar("tidb_txn_mode", "optimistic", 45),
            Change::sysvar("tidb_txn_mode", "pessimistic", 68),
        ]);
        let map = BootstrapVersionMap::from_entries([("v6.1.0", 60), ("v7.5.0", 70)]);
        ConfiguredGlobalSysvars::new(Arc::new(catalog), Arc::new(map))
    }

    fn run(vars: &[(&str, &str)]) -> Vec<ReportItem> {
        let snapshot = vars
            .iter()
            .fold(Snapshot::new("v6.1.0", "v7.5.0"), |s, (k, v)| s.with_sysvar(*k, *v));
        rule().evaluate(&snapshot).unwrap()
    }

    #[test]
    fn uncustomized_forced_variable_is_left_alone() {
        assert!(run(&[("tidb_enable_clustered_index", "INT_ONLY")]).is_empty());
    }

    #[test]
    fn customized_forced_variable_warns() {
        let items = run(&[("tidb_enable_clustered_index", "OFF")]);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].severity, Severity::Warning);
        assert!(items[0].message.contains("overridden to \"ON\" at bootstrap 66"));
        assert_eq!(items[0].metadata["forced_version"], 66);
    }

    #[test]
    fn unchanged_default_is_silent() {
        assert!(run(&[("max_connections", "151")]).is_empty());
        assert!(run(&[("MAX_CONNECTIONS", " 151 ")]).is_empty());
    }

    #[test]
    fn customized_and_moving_defaults_are_info() {
        let items = run(&[("max_connections", "500"), ("tidb_txn_mode", "OPTIMISTIC"), ("unknown", "1")]);
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].severity, Severity::Info);
        assert!(items[0].message.starts_with("Global variable max_connections is configured as \"500\""));
        assert_eq!(items[0].details, vec!["The default is unchanged in the target release".to_string()]);

        assert_eq!(items[1].severity, Severity::Info);
        assert_eq!(
            items[1].message,
            "Default of global variable tidb_txn_mode changes from \"optimistic\" to \"pessimistic\""
        );
    }

    #[test]
    fn customized_with_moving_default_mentions_target() {
        let items = run(&[("tidb_txn_mode", "custom")]);
        assert_eq!(
            items[0].details,
            vec!["The default also changes to \"pessimistic\" in the target release".to_string()]
        );
    }

    #[test]
    fn output_sorted_case_insensitively() {
        let items = run(&[("Tidb_Txn_Mode", "x"), ("max_connections", "1")]);
        let targets: Vec<_> = items.iter().map(|i| i.metadata["target"].clone()).collect();
        assert_eq!(targets, vec!["max_connections", "Tidb_Txn_Mode"]);
    }

    #[test]
    fn missing_mapping_skips() {
        let snapshot = Snapshot::new("v5.0.0", "v7.5.0").with_sysvar("max_connections", "1");
        let items = rule().evaluate(&snapshot).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].severity, Severity::Info);
        assert!(items[0].message.contains("source v5.0.0"));

        let snapshot = Snapshot::new("", "v7.5.0").with_sysvar("max_connections", "1");
        assert!(rule().evaluate(&snapshot).unwrap()[0].message.starts_with("Source version is missing"));
    }
}
