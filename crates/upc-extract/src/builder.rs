//! Knowledge base assembly from a component source tree

use crate::bootstrap::{detect_bootstrap_version, existing_candidates};
use crate::config::ConfigDefaultsExtractor;
use crate::error::{ExtractError, ExtractResult};
use crate::options::ExtractorConfig;
use crate::sysvar::SysVarExtractor;
use std::path::{Path, PathBuf};
use upc_catalog::KbSnapshot;
use upc_symbol::{GoSource, SymbolTable};

/// Directories holding system variable declarations, relative to the repo root
pub const SYSVAR_DIRS: &[&str] = &[
    "pkg/sessionctx/variable",
    "sessionctx/variable",
    "pkg/sessionctx/vardef",
];

/// Directories holding the configuration package
pub const CONFIG_DIRS: &[&str] = &["pkg/config", "config"];

/// Go files of interest in a checked-out release
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepoLayout {
    /// Repository root
    pub root: PathBuf,
    /// Files of the system variable packages
    pub sysvar_files: Vec<PathBuf>,
    /// Files of the config package
    pub config_files: Vec<PathBuf>,
    /// Session sources that may declare the bootstrap revision
    pub bootstrap_files: Vec<PathBuf>,
}

impl RepoLayout {
    /// Discover files under `root`; absent directories are skipped
    pub fn discover(root: &Path) -> ExtractResult<Self> {
        let layout = Self {
            root: root.to_path_buf(),
            sysvar_files: go_files_in(root, SYSVAR_DIRS)?,
            config_files: go_files_in(root, CONFIG_DIRS)?,
            bootstrap_files: existing_candidates(root).collect(),
        };
        tracing::debug!(
            root = %root.display(),
            sysvar_files = layout.sysvar_files.len(),
            config_files = layout.config_files.len(),
            bootstrap_files = layout.bootstrap_files.len(),
            "discovered repository layout"
        );
        Ok(layout)
    }

    /// Symbol table over the system variable packages
    pub fn sysvar_table(&self, config: &ExtractorConfig) -> ExtractResult<SymbolTable> {
        Ok(table_of(config, &read_sources(&self.sysvar_files)?))
    }
}

/// Non-test `.go` files directly inside each existing directory, sorted
fn go_files_in(root: &Path, dirs: &[&str]) -> ExtractResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    for rel in dirs {
        let dir = root.join(rel);
        if !dir.is_dir() {
            continue;
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| ExtractError::io_error(&dir, e))?;
        let mut found = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| ExtractError::io_error(&dir, e))?.path();
            let is_go = path.extension().is_some_and(|ext| ext == "go");
            let is_test = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.ends_with("_test.go"));
            if is_go && !is_test && path.is_file() {
                found.push(path);
            }
        }
        found.sort();
        files.extend(found);
    }
    Ok(files)
}

fn read_sources(paths: &[PathBuf]) -> ExtractResult<Vec<GoSource>> {
    paths
        .iter()
        .map(|path| GoSource::read(path).map_err(ExtractError::from))
        .collect()
}

fn table_of(config: &ExtractorConfig, sources: &[GoSource]) -> SymbolTable {
    let mut builder = config.symbol_builder();
    for source in sources {
        builder.add_source(source);
    }
    builder.build()
}

/// Assembles a [`KbSnapshot`] for one component release
///
/// System variables and configuration defaults resolve through separate
/// symbol tables, one per package group.
#[derive(Debug, Clone)]
pub struct KnowledgeBaseBuilder {
    component: String,
    version: String,
    config: ExtractorConfig,
    sysvar_files: Vec<PathBuf>,
    config_files: Vec<PathBuf>,
    bootstrap_files: Vec<PathBuf>,
}

impl KnowledgeBaseBuilder {
    /// Create a builder with no input files
    #[must_use]
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            version: version.into(),
            config: ExtractorConfig::default(),
            sysvar_files: Vec::new(),
            config_files: Vec::new(),
            bootstrap_files: Vec::new(),
        }
    }

    /// Create a builder over the files discovered under `root`
    pub fn from_repo(
        component: impl Into<String>,
        version: impl Into<String>,
        root: &Path,
    ) -> ExtractResult<Self> {
        let layout = RepoLayout::discover(root)?;
        Ok(Self::new(component, version)
            .with_sysvar_files(layout.sysvar_files)
            .with_config_files(layout.config_files)
            .with_bootstrap_files(layout.bootstrap_files))
    }

    /// Set extraction settings
    #[must_use]
    pub fn with_config(mut self, config: ExtractorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set system variable source files
    #[must_use]
    pub fn with_sysvar_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.sysvar_files = files.into_iter().collect();
        self
    }

    /// Set config package source files
    #[must_use]
    pub fn with_config_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.config_files = files.into_iter().collect();
        self
    }

    /// Set session sources searched for the bootstrap revision
    #[must_use]
    pub fn with_bootstrap_files(mut self, files: impl IntoIterator<Item = PathBuf>) -> Self {
        self.bootstrap_files = files.into_iter().collect();
        self
    }

    /// Read every input file and extract the snapshot
    pub fn build(&self) -> ExtractResult<KbSnapshot> {
        let sysvar_sources = read_sources(&self.sysvar_files)?;
        let config_sources = read_sources(&self.config_files)?;
        let bootstrap_version = self.bootstrap_version()?;
        let snapshot = self.snapshot_from_sources(&sysvar_sources, &config_sources, bootstrap_version);
        tracing::info!(
            component = %snapshot.component,
            version = %snapshot.version,
            config_defaults = snapshot.config_defaults.len(),
            system_variables = snapshot.system_variables.len(),
            bootstrap_version,
            "built knowledge base snapshot"
        );
        Ok(snapshot)
    }

    /// Extract a snapshot from already parsed sources
    #[must_use]
    pub fn snapshot_from_sources(
        &self,
        sysvar_sources: &[GoSource],
        config_sources: &[GoSource],
        bootstrap_version: i64,
    ) -> KbSnapshot {
        let sysvar_table = table_of(&self.config, sysvar_sources);
        let config_table = table_of(&self.config, config_sources);

        let system_variables = SysVarExtractor::new(&sysvar_table, &self.config).extract(sysvar_sources);
        let config_defaults =
            ConfigDefaultsExtractor::new(&config_table, &self.config).extract(config_sources);

        KbSnapshot::new(self.component.clone(), self.version.clone())
            .with_config_defaults(config_defaults)
            .with_system_variables(system_variables)
            .with_bootstrap_version(bootstrap_version)
    }

    fn bootstrap_version(&self) -> ExtractResult<i64> {
        for path in &self.bootstrap_files {
            let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io_error(path, e))?;
            if let Some(version) = detect_bootstrap_version(&text) {
                return Ok(version);
            }
        }
        Ok(0)
    }
}
