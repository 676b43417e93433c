//! Error types for the symbol system

use std::path::PathBuf;

/// Errors while loading Go sources
#[derive(Debug, thiserror::Error)]
pub enum SymbolError {
    /// IO error during file read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SymbolError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for symbol operations
pub type SymbolResult<T> = Result<T, SymbolError>;
