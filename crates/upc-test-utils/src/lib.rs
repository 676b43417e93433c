//! Testing utilities for the upgrade precheck workspace
//!
//! Shared Go source fixtures, catalog builders and snapshot helpers.

#![allow(missing_docs)]

use std::collections::BTreeMap;
use std::path::Path;
use tempfile::TempDir;
use upc_catalog::{
    BootstrapVersionMap, CatalogResult, Catalog, Change, KbSnapshot, KnowledgeSource, ParameterMap,
    ParameterValue, Scalar, ValueType,
};
use upc_precheck::Snapshot;

pub const VARDEF_GO: &str = r#"package vardef

const (
	TiDBEnableClusteredIndex = "tidb_enable_clustered_index"
	TiDBTxnMode              = "tidb_txn_mode"
	TiDBMaxChunkSize         = "tidb_max_chunk_size"
	TiDBEnableAsyncCommit    = "tidb_enable_async_commit"
	TiDBSessionAlias         = "tidb_session_alias"
)

const (
	DefTiDBMaxChunkSize      = 1024
	DefTiDBEnableAsyncCommit = true
	DefTiDBTxnMode           = "pessimistic"
)
"#;

pub const SYSVAR_GO: &str = r#"package variable

var defaultSysVars = []*SysVar{
	{Scope: vardef.ScopeGlobal | vardef.ScopeSession, Name: vardef.TiDBEnableClusteredIndex, Value: "INT_ONLY", Type: vardef.TypeEnum},
	{Scope: vardef.ScopeGlobal | vardef.ScopeSession, Name: vardef.TiDBTxnMode, Value: vardef.DefTiDBTxnMode},
	{Scope: vardef.ScopeGlobal | vardef.ScopeSession, Name: vardef.TiDBMaxChunkSize, Value: strconv.Itoa(vardef.DefTiDBMaxChunkSize)},
	{Scope: vardef.ScopeGlobal, Name: vardef.TiDBEnableAsyncCommit, Value: BoolToOnOff(vardef.DefTiDBEnableAsyncCommit)},
	{Scope: vardef.ScopeSession, Name: vardef.TiDBSessionAlias, Value: ""},
	{Scope: vardef.ScopeGlobal, Name: "max_connections", Value: "151"},
	{Scope: vardef.ScopeGlobal, Name: "tidb_runtime_only", Value: runtime.NumCPU()},
}
"#;

pub const CONFIG_GO: &str = r#"package config

const (
	DefPort           = 4000
	DefStatusPort     = 10080
	defaultTokenLimit = 1000
)

type Config struct {
	Port       uint   `toml:"port" json:"port"`
	Status     Status `toml:"status" json:"status"`
	Log        Log    `toml:"log" json:"log"`
	TokenLimit uint   `toml:"token-limit" json:"token-limit"`
}

type Status struct {
	StatusPort uint `toml:"status-port" json:"status-port"`
}

type Log struct {
	Level         string `toml:"level" json:"level"`
	SlowThreshold uint64 `toml:"slow-threshold" json:"slow-threshold"`
}

var defaultConf = Config{
	Port: DefPort,
	Status: Status{
		StatusPort: DefStatusPort,
	},
	Log: Log{
		Level:         "info",
		SlowThreshold: 300,
	},
}
"#;

pub const BOOTSTRAP_GO: &str = r#"package session

const (
	version179 = 179
	version180 = 180
)

var currentBootstrapVersion int64 = version180
"#;

pub const UPGRADE_GO: &str = r#"package session

// upgradeToVer66 enables clustered index by default.
func upgradeToVer66(s sessiontypes.Session, ver int64) {
	if ver >= version66 {
		return
	}
	mustExecute(s, "UPDATE HIGH_PRIORITY %n.%n SET VARIABLE_VALUE = %? WHERE VARIABLE_NAME = %?", mysql.SystemDB, mysql.GlobalVariablesTable, vardef.On, vardef.TiDBEnableClusteredIndex)
}

// upgradeToVer70 switches the default transaction mode.
func upgradeToVer70(s sessiontypes.Session, ver int64) {
	if ver >= version70 {
		return
	}
	initGlobalVariableIfNotExists(s, vardef.TiDBTxnMode, "pessimistic")
}

func upgradeToVer75(s sessiontypes.Session, ver int64) {
	if ver >= version75 {
		return
	}
	mustExecute(s, "INSERT HIGH_PRIORITY IGNORE INTO %n.%n VALUES (%?, %?)", mysql.SystemDB, mysql.GlobalVariablesTable, vardef.TiDBEnableAsyncCommit, vardef.On)
	// mustExecute(s, "SET @@GLOBAL.tidb_commented_out = 1")
}

func upgradeToVer80(s sessiontypes.Session, ver int64) {
	if ver >= version80 {
		return
	}
	mustExecute(s, "SET @@GLOBAL.tidb_max_chunk_size = 2048")
	mustExecute(s, "DELETE FROM mysql.global_variables WHERE VARIABLE_NAME = 'tidb_removed_var'")
}
"#;

/// Lay out the fixture sources the way a TiDB checkout does
pub fn write_repo(root: &Path) -> std::io::Result<()> {
    let files = [
        ("pkg/sessionctx/vardef/tidb_vars.go", VARDEF_GO),
        ("pkg/sessionctx/variable/sysvar.go", SYSVAR_GO),
        ("pkg/sessionctx/variable/sysvar_test.go", "package variable\n\nvar broken = []*SysVar{{Scope: ScopeGlobal, Name: \"from_test\", Value: \"1\"}}\n"),
        ("pkg/config/config.go", CONFIG_GO),
        ("pkg/session/bootstrap.go", BOOTSTRAP_GO),
        ("pkg/session/upgrade.go", UPGRADE_GO),
    ];
    for (rel, text) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, text)?;
    }
    Ok(())
}

pub fn fixture_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_repo(dir.path()).unwrap();
    dir
}

pub fn forced(target: &str, value: &str, to_version: i64) -> Change {
    Change::sysvar(target, value, to_version)
        .with_force(true)
        .with_summary(format!("force {target} at {to_version}"))
}

pub fn baseline(target: &str, value: &str, to_version: i64) -> Change {
    Change::sysvar(target, value, to_version)
}

/// Catalog behind the clustered-index and max_connections scenarios
pub fn scenario_catalog() -> Catalog {
    Catalog::from_changes(vec![
        baseline("max_connections", "151", 40),
        baseline("tidb_enable_clustered_index", "INT_ONLY", 50),
        forced("tidb_enable_clustered_index", "ON", 66),
    ])
}

/// v6.1.0 → revision 60, v7.5.0 → revision 70
pub fn scenario_versions() -> BootstrapVersionMap {
    BootstrapVersionMap::from_entries([("v6.1.0", 60), ("v7.5.0", 70)])
}

pub fn snapshot_with_sysvars(source: &str, target: &str, vars: &[(&str, &str)]) -> Snapshot {
    vars.iter()
        .fold(Snapshot::new(source, target), |s, (name, value)| s.with_sysvar(*name, *value))
}

pub fn int(n: i64) -> ParameterValue {
    ParameterValue::new(Scalar::Int(n), ValueType::Int)
}

pub fn kb(component: &str, version: &str, config: &[(&str, ParameterValue)]) -> KbSnapshot {
    let defaults: ParameterMap = config
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    KbSnapshot::new(component, version).with_config_defaults(defaults)
}

/// Knowledge source over snapshots held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryKnowledge {
    snapshots: BTreeMap<(String, String), KbSnapshot>,
}

impl InMemoryKnowledge {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, snapshot: KbSnapshot) -> Self {
        self.snapshots.insert(
            (snapshot.component.clone(), snapshot.version.clone()),
            snapshot,
        );
        self
    }
}

impl KnowledgeSource for InMemoryKnowledge {
    fn snapshot(&self, component: &str, version: &str) -> CatalogResult<Option<KbSnapshot>> {
        Ok(self
            .snapshots
            .get(&(component.to_string(), version.to_string()))
            .cloned())
    }
}
