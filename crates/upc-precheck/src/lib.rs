//! Upgrade Precheck Engine
//!
//! Compares a live cluster [`Snapshot`] against the upgrade change catalog and
//! per-release knowledge bases, producing a [`Report`] of findings.
//!
//! # Core Operations
//!
//! - **Rules**: each [`Rule`] reads the snapshot and returns [`ReportItem`]s
//! - **Engine**: [`Engine::run`] evaluates rules strictly in registration
//!   order, turning rule failures into error items
//! - **Cancellation**: [`CancellationFlag`] is checked between rules
//!
//! # Architecture
//!
//! ```text
//! Snapshot ──► Engine ──► TargetVersionOrder ──────┐
//!                    ├──► ForcedGlobalSysvars ─────┤ Catalog + BootstrapLookup
//!                    ├──► ConfiguredGlobalSysvars ─┤
//!                    └──► ConfigDefaultDrift ──────┴► KnowledgeSource
//!                                                  │
//!                                                  ▼
//!                                                Report
//! ```
//!
//! # Example
//!
//! ```rust
//! use upc_precheck::prelude::*;
//!
//! let engine = Engine::new().with_rule(TargetVersionOrder::new());
//! let report = engine.run(&Snapshot::new("v7.5.0", "v7.1.0"), &CancellationFlag::new());
//!
//! assert_eq!(report.summary.blocking, 1);
//! assert_eq!(report.items[0].rule, "core.target-version-order");
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod engine;
pub mod error;
pub mod report;
pub mod rules;
pub mod snapshot;
pub mod version;

// Re-exports
pub use engine::{CancellationFlag, Engine, Rule};
pub use error::{PrecheckError, PrecheckResult, RuleError, RuleResult};
pub use report::{Report, ReportItem, Severity, Summary};
pub use rules::{
    default_engine, ConfigDefaultDrift, ConfiguredGlobalSysvars, ForcedGlobalSysvars,
    TargetVersionOrder, RULE_NAMES,
};
pub use snapshot::{validate_snapshot, ComponentSnapshot, Snapshot};
pub use version::Version;

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for running prechecks
    pub use crate::{
        CancellationFlag, ComponentSnapshot, ConfigDefaultDrift, ConfiguredGlobalSysvars, Engine,
        ForcedGlobalSysvars, Report, ReportItem, Rule, Severity, Snapshot, TargetVersionOrder,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
