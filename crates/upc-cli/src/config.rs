//! CLI configuration file
//!
//! ```toml
//! knowledge_dir = "knowledge"
//! catalog = "upgrade_changes.json"
//! bootstrap_dir = "crates/upc-catalog/knowledge"
//! log_filter = "upc_precheck=debug,info"
//! enabled_rules = ["core.forced-global-sysvars"]
//!
//! [extractor]
//! config_root = "defaultConf"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use upc_extract::ExtractorConfig;

/// Knowledge directory used when neither the file nor a flag names one
pub const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";

/// Default log filter when `RUST_LOG` and the file are silent
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Settings shared by every subcommand
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliConfig {
    /// Root of the on-disk knowledge base
    pub knowledge_dir: Option<PathBuf>,
    /// Change catalog document
    pub catalog: Option<PathBuf>,
    /// Directory of `upgrade_logic.json` documents replacing the bundled map
    pub bootstrap_dir: Option<PathBuf>,
    /// `tracing` filter directive
    pub log_filter: Option<String>,
    /// Rules to run; empty runs every built-in rule
    pub enabled_rules: Vec<String>,
    /// Extraction settings
    pub extractor: ExtractorConfig,
}

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--knowledge`
    pub knowledge_dir: Option<PathBuf>,
    /// `--catalog`
    pub catalog: Option<PathBuf>,
    /// `--bootstrap-dir`
    pub bootstrap_dir: Option<PathBuf>,
    /// `--log-filter`
    pub log_filter: Option<String>,
    /// `--rule`, repeatable
    pub enabled_rules: Vec<String>,
}

impl CliConfig {
    /// Parse TOML text; `origin` names the source in errors
    pub fn from_toml(text: &str, origin: &str) -> Result<Self> {
        toml::from_str(text).with_context(|| format!("invalid configuration in {origin}"))
    }

    /// Read a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {}", path.display()))?;
        Self::from_toml(&text, &path.display().to_string())
    }

    /// Load `path` when given, defaults otherwise
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    /// Apply command line values on top of the file
    #[must_use]
    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        if overrides.knowledge_dir.is_some() {
            self.knowledge_dir = overrides.knowledge_dir;
        }
        if overrides.catalog.is_some() {
            self.catalog = overrides.catalog;
        }
        if overrides.bootstrap_dir.is_some() {
            self.bootstrap_dir = overrides.bootstrap_dir;
        }
        if overrides.log_filter.is_some() {
            self.log_filter = overrides.log_filter;
        }
        if !overrides.enabled_rules.is_empty() {
            self.enabled_rules = overrides.enabled_rules;
        }
        self
    }

    /// Knowledge base root, falling back to [`DEFAULT_KNOWLEDGE_DIR`]
    #[must_use]
    pub fn knowledge_root(&self) -> PathBuf {
        self.knowledge_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_DIR))
    }

    /// Filter directive from the file, falling back to [`DEFAULT_LOG_FILTER`]
    #[must_use]
    pub fn log_filter(&self) -> &str {
        self.log_filter.as_deref().unwrap_or(DEFAULT_LOG_FILTER)
    }
}
