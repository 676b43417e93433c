//! Upgrade Precheck Catalog
//!
//! Data model and in-memory indexes consulted when checking an upgrade.
//!
//! # Core Operations
//!
//! - **Knowledge base**: [`KbSnapshot`] documents with per-release defaults,
//!   stored under `<root>/<component>/<version>/defaults.json`
//! - **Catalog**: [`Catalog`] indexes [`Change`] records by bootstrap revision
//!   and answers range queries
//! - **Bootstrap map**: [`BootstrapVersionMap`] translates release strings to
//!   internal bootstrap revisions
//!
//! # Architecture
//!
//! ```text
//! Change document ──► Catalog ─────────────┐
//! upgrade_logic.json ─► BootstrapVersionMap ├──► rules
//! defaults.json ────► KnowledgeStore ───────┘
//! ```
//!
//! # Example
//!
//! ```rust
//! use upc_catalog::{Catalog, Change};
//!
//! let catalog = Catalog::from_changes(vec![
//!     Change::sysvar("tidb_enable_clustered_index", "ON", 66).with_force(true),
//! ]);
//!
//! let forced = catalog.forced_sysvar_changes(60, 70);
//! assert_eq!(forced.len(), 1);
//! assert_eq!(forced[0].from_version, 65);
//! assert!(catalog.forced_sysvar_changes(70, 60).is_empty());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod bootstrap;
pub mod catalog;
pub mod document;
pub mod error;
pub mod knowledge;
pub mod types;

// Re-exports
pub use bootstrap::{BootstrapLookup, BootstrapVersionMap, BundledVersions};
pub use catalog::Catalog;
pub use document::{ChangeDocument, VersionBucket};
pub use error::{BootstrapMapError, CatalogError, CatalogResult};
pub use knowledge::{KnowledgeSource, KnowledgeStore};
pub use types::{
    Change, ChangeKind, ChangeScope, KbSnapshot, ParameterMap, ParameterValue, Scalar, ValueType,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for catalog operations
    pub use crate::{
        BootstrapLookup, BootstrapVersionMap, Catalog, Change, ChangeDocument, ChangeKind,
        ChangeScope, KbSnapshot, KnowledgeSource, ParameterMap, ParameterValue, Scalar,
        ValueType,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
