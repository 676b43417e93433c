//! Built-in rules
//!
//! | Rule | Looks at |
//! |---|---|
//! | [`TargetVersionOrder`] | source and target release strings |
//! | [`ForcedGlobalSysvars`] | catalog changes forced between the two bootstrap revisions |
//! | [`ConfiguredGlobalSysvars`] | live global variables against catalog baselines |
//! | [`ConfigDefaultDrift`] | live component config against knowledge base defaults |

pub mod config_defaults;
pub mod configured_sysvars;
pub mod forced_sysvars;
pub mod target_version;

pub use config_defaults::ConfigDefaultDrift;
pub use configured_sysvars::ConfiguredGlobalSysvars;
pub use forced_sysvars::ForcedGlobalSysvars;
pub use target_version::TargetVersionOrder;

use crate::engine::Engine;
use crate::error::RuleError;
use std::collections::BTreeMap;
use std::sync::Arc;
use upc_catalog::{BootstrapLookup, Catalog, Change, KnowledgeSource};

/// Identifiers of every built-in rule, in default run order
pub const RULE_NAMES: &[&str] = &[
    target_version::NAME,
    forced_sysvars::NAME,
    configured_sysvars::NAME,
    config_defaults::NAME,
];

/// Engine with every built-in rule registered in default order
#[must_use]
pub fn default_engine(
    catalog: Arc<Catalog>,
    bootstrap: Arc<dyn BootstrapLookup>,
    knowledge: Arc<dyn KnowledgeSource>,
) -> Engine {
    Engine::new()
        .with_rule(TargetVersionOrder::new())
        .with_rule(ForcedGlobalSysvars::new(Arc::clone(&catalog), Arc::clone(&bootstrap)))
        .with_rule(ConfiguredGlobalSysvars::new(catalog, bootstrap))
        .with_rule(ConfigDefaultDrift::new(knowledge))
}

/// Bootstrap revision of a trimmed release string
fn revision(lookup: &dyn BootstrapLookup, release: &str) -> Result<Option<i64>, RuleError> {
    Ok(lookup.lookup(release.trim())?)
}

/// Keep the highest revision per lower-cased target, ordered by `(to_version, target)`
///
/// On equal revisions the first change seen is kept.
fn collapse(changes: Vec<Change>) -> Vec<Change> {
    let mut latest: BTreeMap<String, Change> = BTreeMap::new();
    for change in changes {
        let key = change.target.trim().to_lowercase();
        if key.is_empty() {
            continue;
        }
        match latest.get(&key) {
            Some(existing) if existing.to_version >= change.to_version => {}
            _ => {
                latest.insert(key, change);
            }
        }
    }
    let mut out: Vec<Change> = latest.into_values().collect();
    out.sort_by(|a, b| {
        a.to_version
            .cmp(&b.to_version)
            .then_with(|| a.target.cmp(&b.target))
    });
    out
}

/// Case-insensitive comparison of trimmed values
fn same_value(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collapse_keeps_highest_revision() {
        let changes = vec![
            Change::sysvar("tidb_b", "1", 70),
            Change::sysvar("tidb_a", "OFF", 66),
            Change::sysvar("TIDB_A", "ON", 80),
            Change::sysvar("tidb_b", "2", 70),
            Change::sysvar("", "x", 90),
        ];
        let out = collapse(changes);
        let seen: Vec<_> = out
            .iter()
            .map(|c| (c.to_version, c.target.as_str(), c.default_value.as_str()))
            .collect();
        assert_eq!(seen, vec![(70, "tidb_b", "1"), (80, "TIDB_A", "ON")]);
    }

    #[test]
    fn values_compare_loosely() {
        assert!(same_value(" ON", "on "));
        assert!(!same_value("ON", "OFF"));
    }

    #[test]
    fn default_engine_registers_all_rules() {
        #[derive(Debug)]
        struct NoVersions;
        impl BootstrapLookup for NoVersions {
            fn lookup(&self, _: &str) -> Result<Option<i64>, upc_catalog::BootstrapMapError> {
                Ok(None)
            }
        }
        let engine = default_engine(
            Arc::new(Catalog::default()),
            Arc::new(NoVersions),
            Arc::new(upc_catalog::KnowledgeStore::new("/nonexistent")),
        );
        assert_eq!(engine.rule_names(), RULE_NAMES.to_vec());
    }
}
