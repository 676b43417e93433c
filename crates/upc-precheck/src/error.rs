//! Error types for the precheck engine
//!
//! Two layers:
//! - [`RuleError`]: a single rule could not evaluate; the engine turns it
//!   into an error item and keeps going
//! - [`PrecheckError`]: loading or validating engine input failed

use std::path::PathBuf;
use upc_catalog::{BootstrapMapError, CatalogError};

/// Failure inside one rule evaluation
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    /// Bootstrap version data could not be loaded
    #[error("failed to load bootstrap versions: {0}")]
    Bootstrap(#[from] BootstrapMapError),

    /// Knowledge base snapshot could not be loaded
    #[error("failed to load knowledge base: {0}")]
    Knowledge(#[from] CatalogError),

    /// Any other rule-specific failure
    #[error("{0}")]
    Failed(String),
}

/// Result alias for rule evaluation
pub type RuleResult<T> = Result<T, RuleError>;

/// Errors loading or validating precheck input
#[derive(Debug, thiserror::Error)]
pub enum PrecheckError {
    /// IO error during file read
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Snapshot or report document is not valid JSON
    #[error("invalid json in {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    /// Snapshot failed validation
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    /// Version string could not be parsed
    #[error("invalid version {input:?}: {reason}")]
    InvalidVersion { input: String, reason: &'static str },
}

impl PrecheckError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON error for a document origin
    pub fn json_error(origin: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            origin: origin.into(),
            source,
        }
    }
}

/// Result alias for precheck operations
pub type PrecheckResult<T> = Result<T, PrecheckError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_error_wraps_map_failure() {
        let err: RuleError = BootstrapMapError::malformed("v7.5.0", "missing metadata").into();
        let text = err.to_string();
        assert!(text.starts_with("failed to load bootstrap versions"));
        assert!(text.contains("v7.5.0"));
    }

    #[test]
    fn invalid_version_quotes_input() {
        let err = PrecheckError::InvalidVersion {
            input: "v7.x".into(),
            reason: "minor is not a number",
        };
        assert_eq!(err.to_string(), "invalid version \"v7.x\": minor is not a number");
    }
}
