//! Bootstrap revision of a source release

use crate::error::{ExtractError, ExtractResult};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};

/// Candidate locations of the session bootstrap and upgrade sources, newest layout first
pub const SESSION_SOURCE_CANDIDATES: &[&str] = &[
    "pkg/session/upgrade.go",
    "pkg/session/bootstrap.go",
    "session/upgrade.go",
    "session/bootstrap.go",
];

static DIRECT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"currentBootstrapVersion(?:\s+int64)?\s*=\s*(\d+)").expect("valid regex")
});

static NAMED: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:var\s+)?currentBootstrapVersion(?:\s+\w+)?\s*=\s*version(\d+)")
        .expect("valid regex")
});

/// Bootstrap revision declared by `currentBootstrapVersion`
///
/// Recognizes a numeric assignment and the `= versionN` constant form.
#[must_use]
pub fn detect_bootstrap_version(source: &str) -> Option<i64> {
    DIRECT
        .captures(source)
        .or_else(|| NAMED.captures(source))
        .and_then(|caps| caps[1].parse().ok())
}

/// Bootstrap revision of the release checked out at `root`
///
/// Tries each session source in turn; `Ok(None)` when none declares one.
pub fn detect_repo_bootstrap_version(root: &Path) -> ExtractResult<Option<i64>> {
    for candidate in existing_candidates(root) {
        let text = std::fs::read_to_string(&candidate)
            .map_err(|e| ExtractError::io_error(&candidate, e))?;
        if let Some(version) = detect_bootstrap_version(&text) {
            tracing::debug!(path = %candidate.display(), version, "detected bootstrap version");
            return Ok(Some(version));
        }
    }
    Ok(None)
}

pub(crate) fn existing_candidates(root: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    SESSION_SOURCE_CANDIDATES
        .iter()
        .map(move |rel| root.join(rel))
        .filter(|p| p.is_file())
}
