//! Release version parsing and ordering
//!
//! Accepts `v?MAJOR[.MINOR[.PATCH]][-PRERELEASE][+BUILD]`. Missing minor and
//! patch components read as zero. Ordering follows semantic version
//! precedence: build metadata is ignored and a pre-release sorts before the
//! release it precedes.

use crate::error::{PrecheckError, PrecheckResult};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// One dot-separated pre-release identifier
#[derive(Debug, Clone, PartialEq, Eq)]
enum Identifier {
    Numeric(u64),
    Alpha(String),
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Numeric(_), Self::Alpha(_)) => Ordering::Less,
            (Self::Alpha(_), Self::Numeric(_)) => Ordering::Greater,
            (Self::Alpha(a), Self::Alpha(b)) => a.cmp(b),
        }
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Numeric(n) => write!(f, "{n}"),
            Self::Alpha(s) => f.write_str(s),
        }
    }
}

/// Parsed release version
#[derive(Debug, Clone)]
pub struct Version {
    /// Major component
    pub major: u64,
    /// Minor component
    pub minor: u64,
    /// Patch component
    pub patch: u64,
    pre: Vec<Identifier>,
    build: Option<String>,
}

impl Version {
    /// Parse a version string; a leading `v` or `V` is optional
    pub fn parse(input: &str) -> PrecheckResult<Self> {
        let invalid = |reason| PrecheckError::InvalidVersion {
            input: input.to_string(),
            reason,
        };

        let text = input.trim();
        let text = text
            .strip_prefix('v')
            .or_else(|| text.strip_prefix('V'))
            .unwrap_or(text);

        let (text, build) = match text.split_once('+') {
            Some((rest, build)) => {
                if !valid_dotted(build) {
                    return Err(invalid("build metadata is malformed"));
                }
                (rest, Some(build.to_string()))
            }
            None => (text, None),
        };
        let (core, pre) = match text.split_once('-') {
            Some((core, pre)) => {
                if !valid_dotted(pre) {
                    return Err(invalid("pre-release is malformed"));
                }
                (core, pre.split('.').map(identifier).collect())
            }
            None => (text, Vec::new()),
        };

        let mut parts = core.split('.');
        let major = parts
            .next()
            .and_then(number)
            .ok_or_else(|| invalid("major is not a number"))?;
        let minor = match parts.next() {
            Some(part) => number(part).ok_or_else(|| invalid("minor is not a number"))?,
            None => 0,
        };
        let patch = match parts.next() {
            Some(part) => number(part).ok_or_else(|| invalid("patch is not a number"))?,
            None => 0,
        };
        if parts.next().is_some() {
            return Err(invalid("too many components"));
        }

        Ok(Self {
            major,
            minor,
            patch,
            pre,
            build,
        })
    }

    /// Whether this is a pre-release
    #[inline]
    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }

    /// Build metadata, if any
    #[inline]
    #[must_use]
    pub fn build(&self) -> Option<&str> {
        self.build.as_deref()
    }
}

/// Decimal number without a leading zero
fn number(part: &str) -> Option<u64> {
    if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if part.len() > 1 && part.starts_with('0') {
        return None;
    }
    part.parse().ok()
}

fn valid_dotted(text: &str) -> bool {
    text.split('.').all(|id| {
        !id.is_empty() && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-')
    })
}

fn identifier(id: &str) -> Identifier {
    match number(id) {
        Some(n) => Identifier::Numeric(n),
        None => Identifier::Alpha(id.to_string()),
    }
}

impl FromStr for Version {
    type Err = PrecheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch)
            .cmp(&(other.major, other.minor, other.patch))
            .then_with(|| match (self.pre.is_empty(), other.pre.is_empty()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => self.pre.cmp(&other.pre),
            })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        for (i, id) in self.pre.iter().enumerate() {
            f.write_str(if i == 0 { "-" } else { "." })?;
            write!(f, "{id}")?;
        }
        if let Some(build) = &self.build {
            write!(f, "+{build}")?;
        }
        Ok(())
    }
}

/// `v`-prefixed form of a release string; empty input stays empty
#[must_use]
pub fn ensure_v_prefix(release: &str) -> String {
    if release.is_empty() {
        return String::new();
    }
    let bare = release
        .strip_prefix('v')
        .or_else(|| release.strip_prefix('V'))
        .unwrap_or(release);
    format!("v{bare}")
}
