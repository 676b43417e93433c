//! Live cluster snapshot supplied to the engine

use crate::error::{PrecheckError, PrecheckResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// State of one component in the running cluster
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSnapshot {
    /// Running release
    #[serde(default)]
    pub version: String,
    /// Effective configuration, dotted keys
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    /// Free-form attributes
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl ComponentSnapshot {
    /// Create a component at `version`
    #[must_use]
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..Self::default()
        }
    }

    /// Add a config value
    #[must_use]
    pub fn with_config(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.config.insert(key.into(), value.into());
        self
    }

    /// Add an attribute
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Current cluster state plus the requested target release
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Release currently running
    #[serde(default)]
    pub source_version: String,
    /// Release to upgrade to
    #[serde(default)]
    pub target_version: String,
    /// Components by name (`tidb`, `pd`, ...)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub components: BTreeMap<String, ComponentSnapshot>,
    /// Global system variables as reported by the cluster
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub global_sysvars: BTreeMap<String, String>,
    /// Cluster-level configuration, carried through
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, Value>,
    /// Collector metadata, carried through
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
    /// Free-form tags, carried through
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
}

impl Snapshot {
    /// Create a snapshot for an upgrade from `source` to `target`
    #[must_use]
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source_version: source.into(),
            target_version: target.into(),
            ..Self::default()
        }
    }

    /// Add a component
    #[must_use]
    pub fn with_component(mut self, name: impl Into<String>, component: ComponentSnapshot) -> Self {
        self.components.insert(name.into(), component);
        self
    }

    /// Add a global system variable
    #[must_use]
    pub fn with_sysvar(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.global_sysvars.insert(name.into(), value.into());
        self
    }

    /// Add a tag
    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Parse a snapshot document
    pub fn from_json(text: &str, origin: &str) -> PrecheckResult<Self> {
        serde_json::from_str(text).map_err(|e| PrecheckError::json_error(origin, e))
    }

    /// Read a snapshot document from disk
    pub fn read(path: &Path) -> PrecheckResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| PrecheckError::io_error(path, e))?;
        Self::from_json(&text, &path.display().to_string())
    }
}

/// Reject snapshots the engine cannot meaningfully check
pub fn validate_snapshot(snapshot: &Snapshot) -> PrecheckResult<()> {
    if snapshot.target_version.trim().is_empty() {
        return Err(PrecheckError::InvalidSnapshot(
            "target version is required".to_string(),
        ));
    }
    Ok(())
}

/// Text form of a live config value: strings bare, everything else as JSON
#[must_use]
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
