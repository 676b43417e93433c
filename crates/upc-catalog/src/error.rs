//! Error types for catalog and knowledge base documents

use std::path::PathBuf;

/// Errors loading or storing catalog documents
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// IO error during file read or write
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Document is not valid JSON for the expected shape
    #[error("invalid document {origin}: {source}")]
    Json {
        origin: String,
        #[source]
        source: serde_json::Error,
    },
}

impl CatalogError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create JSON error for a document origin (path or label)
    pub fn json_error(origin: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            origin: origin.into(),
            source,
        }
    }
}

/// Result alias for catalog operations
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors building a bootstrap version map
///
/// Cloneable so the bundled map can hand the same failure to every caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BootstrapMapError {
    /// Upgrade-logic document could not be parsed
    #[error("malformed upgrade logic document {document}: {message}")]
    Malformed { document: String, message: String },

    /// Directory walk or file read failed
    #[error("io error reading {path}: {message}")]
    Io { path: PathBuf, message: String },
}

impl BootstrapMapError {
    /// Create malformed-document error
    pub fn malformed(document: impl Into<String>, message: impl ToString) -> Self {
        Self::Malformed {
            document: document.into(),
            message: message.to_string(),
        }
    }

    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: source.to_string(),
        }
    }
}
