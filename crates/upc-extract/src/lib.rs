//! Upgrade Precheck Extraction
//!
//! Derives per-release facts from Go component sources.
//!
//! # Core Operations
//!
//! - **System variables**: [`SysVarExtractor`] reads `SysVar{...}` literals and
//!   keeps the global ones whose name and default fully resolve
//! - **Config defaults**: [`ConfigDefaultsExtractor`] walks the default config
//!   literal through its `toml` struct tags
//! - **Upgrade changes**: [`UpgradeChangeExtractor`] scans `upgradeToVerN`
//!   functions for forced global variable writes
//! - **Knowledge base**: [`KnowledgeBaseBuilder`] assembles a
//!   [`KbSnapshot`](upc_catalog::KbSnapshot) from a checked-out release
//!
//! Extraction is best effort. A declaration that cannot be fully resolved is
//! omitted, never guessed.
//!
//! # Example
//!
//! ```rust
//! use upc_extract::{ExtractorConfig, SysVarExtractor};
//! use upc_symbol::GoSource;
//!
//! let config = ExtractorConfig::default();
//! let consts = GoSource::parse("package vardef\n\nconst TiDBFoo = \"tidb_foo\"\n");
//! let mut builder = config.symbol_builder();
//! builder.add_source(&consts);
//! let table = builder.build();
//!
//! let vars = SysVarExtractor::new(&table, &config).extract_text(
//!     "package variable\n\nvar v = []*SysVar{\n\t{Scope: ScopeGlobal, Name: vardef.TiDBFoo, Value: On},\n}\n",
//! );
//! assert_eq!(vars.get("tidb_foo").map(|v| v.value.to_string()), Some("ON".to_string()));
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod bootstrap;
pub mod builder;
pub mod config;
pub mod error;
pub mod options;
pub mod sysvar;
pub mod upgrade;
pub mod value;

// Re-exports
pub use bootstrap::{detect_bootstrap_version, detect_repo_bootstrap_version};
pub use builder::{KnowledgeBaseBuilder, RepoLayout};
pub use config::ConfigDefaultsExtractor;
pub use error::{ExtractError, ExtractResult};
pub use options::ExtractorConfig;
pub use sysvar::SysVarExtractor;
pub use upgrade::{extract_repo_upgrades, find_upgrade_source, to_document, UpgradeChangeExtractor};
pub use value::ValueResolver;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for extraction
    pub use crate::{
        ConfigDefaultsExtractor, ExtractorConfig, KnowledgeBaseBuilder, SysVarExtractor,
        UpgradeChangeExtractor,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
