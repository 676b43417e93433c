//! Upgrade precheck command line
//!
//! Library half of the `upgrade-precheck` binary: configuration loading and
//! the subcommand implementations, kept out of `main` so they can be tested
//! without spawning a process.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

pub mod commands;
pub mod config;

pub use commands::{check, extract_kb, extract_upgrade, render_text, versions, OutputFormat};
pub use config::{CliConfig, Overrides};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
