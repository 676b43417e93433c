use pretty_assertions::assert_eq;
use std::sync::Arc;
use upc_catalog::{BootstrapLookup, Catalog, KnowledgeSource};
use upc_precheck::rules::{configured_sysvars, forced_sysvars, target_version};
use upc_precheck::{
    default_engine, CancellationFlag, ComponentSnapshot, Report, Severity, Snapshot,
};
use upc_test_utils::{
    baseline, int, kb, scenario_catalog, scenario_versions, snapshot_with_sysvars, InMemoryKnowledge,
};

fn run(snapshot: &Snapshot) -> Report {
    let catalog: Arc<Catalog> = Arc::new(scenario_catalog());
    let versions: Arc<dyn BootstrapLookup> = Arc::new(scenario_versions());
    let knowledge: Arc<dyn KnowledgeSource> = Arc::new(InMemoryKnowledge::new());
    default_engine(catalog, versions, knowledge).run(snapshot, &CancellationFlag::new())
}

#[test]
fn uncustomized_forced_variable_reported_once() {
    let report = run(&snapshot_with_sysvars(
        "v6.1.0",
        "v7.5.0",
        &[("tidb_enable_clustered_index", "INT_ONLY")],
    ));

    assert_eq!(report.items_for(configured_sysvars::NAME).count(), 0);
    let forced: Vec<_> = report.items_for(forced_sysvars::NAME).collect();
    assert_eq!(forced.len(), 1);
    assert_eq!(forced[0].severity, Severity::Warning);
    assert_eq!(forced[0].metadata["to_version"], 66);
    assert_eq!(forced[0].metadata["default_value"], "ON");
    assert!(report.errors.is_empty());
}

#[test]
fn customized_forced_variable_warns_about_override() {
    let report = run(&snapshot_with_sysvars(
        "v6.1.0",
        "v7.5.0",
        &[("tidb_enable_clustered_index", "OFF")],
    ));

    let configured: Vec<_> = report.items_for(configured_sysvars::NAME).collect();
    assert_eq!(configured.len(), 1);
    assert_eq!(configured[0].severity, Severity::Warning);
    assert!(configured[0].message.contains("overridden to \"ON\" at bootstrap 66"));
}

#[test]
fn unchanged_default_yields_nothing() {
    let catalog = Catalog::from_changes(vec![
        baseline("max_connections", "151", 40),
        baseline("max_connections", "151", 65),
    ]);
    let mut engine = default_engine(
        Arc::new(catalog),
        Arc::new(scenario_versions()),
        Arc::new(InMemoryKnowledge::new()),
    );
    let snapshot = snapshot_with_sysvars("v6.1.0", "v7.5.0", &[("max_connections", "151")]);

    let full = engine.run(&snapshot, &CancellationFlag::new());
    assert!(full.errors.is_empty(), "{:?}", full.errors);
    let rules: Vec<_> = full.items.iter().map(|item| item.rule.as_str()).collect();
    assert_eq!(rules, vec![target_version::NAME]);
    assert_eq!(full.items[0].severity, Severity::Info);

    engine.retain(|name| name != target_version::NAME);
    let report = engine.run(&snapshot, &CancellationFlag::new());
    assert!(report.items.is_empty(), "{:?}", report.items);
    assert!(report.errors.is_empty());
}

#[test]
fn version_order_outcomes() {
    let cases = [
        ("v7.5.0", "v7.1.0", Severity::Blocker),
        ("v7.5.0", "v7.5.0", Severity::Warning),
        ("v7.5.0", "v8.0.0", Severity::Info),
    ];
    for (source, target, expected) in cases {
        let report = run(&Snapshot::new(source, target));
        let items: Vec<_> = report.items_for(target_version::NAME).collect();
        assert_eq!(items.len(), 1, "{source} -> {target}");
        assert_eq!(items[0].severity, expected, "{source} -> {target}");
    }
}

#[test]
fn config_drift_runs_with_knowledge_base() {
    let knowledge = InMemoryKnowledge::new()
        .with(kb("tidb", "v6.1.0", &[("token-limit", int(1000))]))
        .with(kb("tidb", "v7.5.0", &[("token-limit", int(2000))]));
    let engine = default_engine(
        Arc::new(scenario_catalog()),
        Arc::new(scenario_versions()),
        Arc::new(knowledge),
    );
    let snapshot = Snapshot::new("v6.1.0", "v7.5.0").with_component(
        "tidb",
        ComponentSnapshot::new("v6.1.0").with_config("token-limit", 1000),
    );

    let report = engine.run(&snapshot, &CancellationFlag::new());
    let drift: Vec<_> = report.items_for("core.config-default-drift").collect();
    assert_eq!(drift.len(), 1);
    assert_eq!(drift[0].severity, Severity::Info);
    assert_eq!(report.summary.blocking, 0);
}

#[test]
fn report_serializes_summary_and_timestamps() {
    let report = run(&Snapshot::new("v7.5.0", "v7.1.0"));
    let value: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
    assert_eq!(value["summary"]["blocking"], 1);
    assert!(value["started_at"].is_string());
    assert!(report.has_blocking());
    assert!(report.summary_line().contains("1 blocking"));
}
