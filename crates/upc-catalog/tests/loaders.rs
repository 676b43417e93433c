//! On-disk loaders: change documents, bootstrap map directories, knowledge store

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use upc_catalog::prelude::*;
use upc_catalog::{BootstrapMapError, KnowledgeStore};

#[test]
fn catalog_loads_versions_document() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changes.json");
    let doc = ChangeDocument::grouped(vec![
        Change::sysvar("tidb_enable_clustered_index", "ON", 66).with_force(true),
        Change::sysvar("tidb_txn_mode", "pessimistic", 70).with_force(true),
    ]);
    doc.write(&path).unwrap();

    let catalog = Catalog::load(&path).unwrap();
    assert_eq!(catalog.versions().collect::<Vec<_>>(), vec![66, 70]);
    assert_eq!(catalog.forced_sysvar_changes(0, 100).len(), 2);
}

#[test]
fn catalog_load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let err = Catalog::load(&dir.path().join("absent.json")).unwrap_err();
    assert!(err.to_string().contains("absent.json"));
}

#[test]
fn catalog_loads_go_written_nulls() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changes.json");
    fs::write(
        &path,
        r#"{
  "versions": [
    {
      "version": 66,
      "changes": [
        {
          "from_version": 65,
          "to_version": 66,
          "kind": "sysvar",
          "target": "tidb_enable_clustered_index",
          "default_value": "ON",
          "force": true,
          "summary": "",
          "details": "",
          "scope": "global",
          "risk_level": "medium",
          "optional_hints": null
        }
      ]
    },
    { "version": 67, "changes": null }
  ]
}"#,
    )
    .unwrap();

    let catalog = Catalog::load(&path).unwrap();
    let forced = catalog.forced_sysvar_changes(0, 100);
    assert_eq!(forced.len(), 1);
    assert!(forced[0].optional_hints.is_empty());
}

#[test]
fn catalog_load_names_the_bad_field() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("changes.json");
    fs::write(
        &path,
        r#"{"versions": [{"version": 66, "changes": [{"target": "tidb_foo", "optional_hints": "one"}]}]}"#,
    )
    .unwrap();

    let message = Catalog::load(&path).unwrap_err().to_string();
    assert!(message.contains("changes.json"), "{message}");
    assert!(message.contains("invalid type"), "{message}");
}

#[test]
fn bootstrap_map_walks_component_release_dirs() {
    let dir = TempDir::new().unwrap();
    for (release, revision) in [("v7.5.0", 180), ("v8.1.0", 198)] {
        let release_dir = dir.path().join("tidb").join(release);
        fs::create_dir_all(&release_dir).unwrap();
        fs::write(
            release_dir.join("upgrade_logic.json"),
            format!(
                r#"{{"metadata": {{"target_version": "{release}", "bootstrap_version": {revision}}}}}"#
            ),
        )
        .unwrap();
    }
    fs::create_dir_all(dir.path().join("tidb").join("notes")).unwrap();

    let map = BootstrapVersionMap::load_dir(dir.path()).unwrap();
    assert_eq!(map.iter().collect::<Vec<_>>(), vec![("v7.5.0", 180), ("v8.1.0", 198)]);
    assert_eq!(map.lookup("V8.1.0").unwrap(), Some(198));
}

#[test]
fn bootstrap_map_rejects_malformed_file() {
    let dir = TempDir::new().unwrap();
    let release_dir = dir.path().join("tidb").join("v7.5.0");
    fs::create_dir_all(&release_dir).unwrap();
    fs::write(release_dir.join("upgrade_logic.json"), "not json").unwrap();

    let err = BootstrapVersionMap::load_dir(dir.path()).unwrap_err();
    assert!(matches!(err, BootstrapMapError::Malformed { .. }));
}

#[test]
fn knowledge_store_round_trips_snapshot() {
    let dir = TempDir::new().unwrap();
    let store = KnowledgeStore::new(dir.path());

    let mut config = ParameterMap::new();
    config.insert("log.level", ParameterValue::string("info"));
    config.insert(
        "performance.max-procs",
        ParameterValue::new(Scalar::Int(0), ValueType::Int),
    );
    let snapshot = KbSnapshot::new("tidb", "v7.5.0")
        .with_config_defaults(config)
        .with_bootstrap_version(180);

    let path = store.save(&snapshot).unwrap();
    assert!(path.ends_with("tidb/v7.5.0/defaults.json"));

    assert_eq!(store.snapshot("tidb", "v7.5.0").unwrap(), Some(snapshot.clone()));
    assert_eq!(store.snapshot("tidb", "7.5.0").unwrap(), Some(snapshot));
    assert_eq!(store.snapshot("tidb", "v8.1.0").unwrap(), None);
}

#[test]
fn knowledge_store_surfaces_corrupt_snapshot() {
    let dir = TempDir::new().unwrap();
    let release_dir = dir.path().join("pd").join("v8.1.0");
    fs::create_dir_all(&release_dir).unwrap();
    fs::write(release_dir.join("defaults.json"), "{").unwrap();

    let store = KnowledgeStore::new(dir.path());
    assert!(store.snapshot("pd", "v8.1.0").is_err());
}
