//! Error types for extraction

use std::path::PathBuf;
use upc_catalog::CatalogError;
use upc_symbol::SymbolError;

/// Errors raised while extracting facts from a source tree
///
/// Ambiguous or unresolvable declarations are never errors; they are
/// omitted from the output.
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    /// IO error during file or directory read
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Required source file not present under a repository root
    #[error("{what} not found under {root}: tried {tried:?}")]
    NotFound {
        what: &'static str,
        root: PathBuf,
        tried: Vec<PathBuf>,
    },

    /// Go source could not be read
    #[error(transparent)]
    Symbol(#[from] SymbolError),

    /// Output document could not be written
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

impl ExtractError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Result alias for extraction
pub type ExtractResult<T> = Result<T, ExtractError>;
