//! Extraction settings

use serde::{Deserialize, Serialize};
use upc_symbol::{SymbolTableBuilder, DEFAULT_FORMATTING_CALLS};

/// Keys, tokens and package names the extractors look for
///
/// Defaults match the TiDB source layout. Every field can be overridden from
/// a config file section; missing fields keep their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Composite field holding the variable name
    pub name_key: String,
    /// Composite field holding the default value
    pub value_key: String,
    /// Composite field holding the scope
    pub scope_key: String,
    /// Scope identifiers that mark a variable as global
    pub scope_tokens: Vec<String>,
    /// Packages whose qualified names resolve through the symbol table
    pub local_packages: Vec<String>,
    /// Calls unwrapped to their first argument
    pub formatting_calls: Vec<String>,
    /// Calls mapping a boolean to `ON`/`OFF`
    pub on_off_calls: Vec<String>,
    /// Variable holding the default configuration literal
    pub config_root: String,
    /// Prefix of standalone default constants
    pub default_prefix: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            name_key: "Name".to_string(),
            value_key: "Value".to_string(),
            scope_key: "Scope".to_string(),
            scope_tokens: vec!["ScopeGlobal".to_string(), "ScopeInstance".to_string()],
            local_packages: vec!["variable".to_string(), "vardef".to_string()],
            formatting_calls: DEFAULT_FORMATTING_CALLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            on_off_calls: vec!["BoolToOnOff".to_string()],
            config_root: "defaultConf".to_string(),
            default_prefix: "default".to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Create default settings
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set composite keys for name, value and scope
    #[must_use]
    pub fn with_keys(
        mut self,
        name: impl Into<String>,
        value: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        self.name_key = name.into();
        self.value_key = value.into();
        self.scope_key = scope.into();
        self
    }

    /// Set retained scope tokens
    #[must_use]
    pub fn with_scope_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Set local packages
    #[must_use]
    pub fn with_local_packages<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.local_packages = packages.into_iter().map(Into::into).collect();
        self
    }

    /// Set formatting calls
    #[must_use]
    pub fn with_formatting_calls<I, S>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formatting_calls = calls.into_iter().map(Into::into).collect();
        self
    }

    /// Set the config root variable
    #[must_use]
    pub fn with_config_root(mut self, root: impl Into<String>) -> Self {
        self.config_root = root.into();
        self
    }

    /// Set the default-constant prefix
    #[must_use]
    pub fn with_default_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.default_prefix = prefix.into();
        self
    }

    /// Symbol table builder recognizing the configured formatting calls
    #[must_use]
    pub fn symbol_builder(&self) -> SymbolTableBuilder {
        SymbolTableBuilder::new().with_formatting_calls(self.formatting_calls.iter().cloned())
    }
}
