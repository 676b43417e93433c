//! Range-query properties of the change catalog

use proptest::prelude::*;
use std::collections::BTreeMap;
use upc_catalog::{Catalog, Change, ChangeScope};

const NAMES: &[&str] = &["tidb_a", "TiDB_A", "tidb_b", "tidb_c", "max_connections"];

fn change_strategy() -> impl Strategy<Value = Change> {
    (0..NAMES.len(), 0u8..4, 1i64..60, any::<bool>(), 0u8..3).prop_map(
        |(name, value, to, force, scope)| {
            let scope = match scope {
                0 => ChangeScope::Global,
                1 => ChangeScope::Unspecified,
                _ => ChangeScope::Session,
            };
            Change::sysvar(NAMES[name], value.to_string(), to)
                .with_force(force)
                .with_scope(scope)
        },
    )
}

proptest! {
    #[test]
    fn prop_forced_changes_stay_in_range(
        changes in prop::collection::vec(change_strategy(), 0..40),
        from in 0i64..70,
        to in 0i64..70,
    ) {
        let catalog = Catalog::from_changes(changes);
        let forced = catalog.forced_sysvar_changes(from, to);
        if to <= from {
            prop_assert!(forced.is_empty());
        }
        for change in &forced {
            prop_assert!(change.force);
            prop_assert!(change.to_version > from && change.to_version <= to);
            prop_assert!(change.scope.is_global_or_unspecified());
        }
        let versions: Vec<i64> = forced.iter().map(|c| c.to_version).collect();
        prop_assert!(versions.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn prop_forced_ranges_compose(
        changes in prop::collection::vec(change_strategy(), 0..40),
        mut bounds in prop::collection::vec(0i64..70, 3),
    ) {
        bounds.sort_unstable();
        let (a, b, c) = (bounds[0], bounds[1], bounds[2]);
        let catalog = Catalog::from_changes(changes);
        let mut split = catalog.forced_sysvar_changes(a, b);
        split.extend(catalog.forced_sysvar_changes(b, c));
        prop_assert_eq!(split, catalog.forced_sysvar_changes(a, c));
    }

    #[test]
    fn prop_latest_values_match_replay(
        changes in prop::collection::vec(change_strategy(), 0..40),
        up_to in -5i64..70,
    ) {
        let catalog = Catalog::from_changes(changes.clone());
        let latest = catalog.latest_global_sysvar_values(up_to);

        let mut expected: BTreeMap<String, String> = BTreeMap::new();
        if up_to > 0 {
            let mut ordered: Vec<&Change> = changes.iter().collect();
            // stable sort keeps document order within a revision
            ordered.sort_by_key(|c| c.to_version);
            for change in ordered {
                if change.to_version <= up_to && change.scope.is_global_or_unspecified() {
                    expected.insert(change.target.to_lowercase(), change.default_value.clone());
                }
            }
        }
        let actual: BTreeMap<String, String> = latest
            .into_iter()
            .map(|(k, c)| (k, c.default_value))
            .collect();
        prop_assert_eq!(actual, expected);
    }
}
