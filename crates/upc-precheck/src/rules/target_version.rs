//! Target release must not be older than the running release

use crate::engine::Rule;
use crate::error::RuleError;
use crate::report::ReportItem;
use crate::snapshot::Snapshot;
use crate::version::{ensure_v_prefix, Version};
use std::cmp::Ordering;

/// Rule identifier
pub const NAME: &str = "core.target-version-order";

/// Compares source and target releases by semantic version precedence
#[derive(Debug, Clone, Copy, Default)]
pub struct TargetVersionOrder;

impl TargetVersionOrder {
    /// Create the rule
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Rule for TargetVersionOrder {
    fn name(&self) -> &str {
        NAME
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<ReportItem>, RuleError> {
        let source = snapshot.source_version.trim();
        let target = snapshot.target_version.trim();

        if target.is_empty() {
            return Ok(vec![ReportItem::warning(
                "Target version is empty; unable to evaluate the upgrade path",
            )
            .with_rule(NAME)
            .with_suggestion("Provide a valid target version for snapshot.target_version")]);
        }
        if source.is_empty() {
            return Ok(vec![ReportItem::info(
                "Source version is not provided; skipping version order validation",
            )
            .with_rule(NAME)]);
        }

        let parsed = (
            Version::parse(&ensure_v_prefix(source)),
            Version::parse(&ensure_v_prefix(target)),
        );
        let (Ok(from), Ok(to)) = parsed else {
            return Ok(vec![ReportItem::warning(format!(
                "Unable to parse version numbers source={source:?} target={target:?}"
            ))
            .with_rule(NAME)
            .with_suggestion("Use semantic version strings such as v7.5.0")
            .with_metadata("source", source)
            .with_metadata("target", target)]);
        };

        let item = match to.cmp(&from) {
            Ordering::Less => ReportItem::blocker(format!(
                "Target version {target} is lower than current version {source}; this is unsupported"
            ))
            .with_suggestion("Adjust the target version so it is not lower than the source"),
            Ordering::Equal => ReportItem::warning(format!(
                "Target version {target} is identical to the current version; the upgrade would redeploy the same version"
            ))
            .with_suggestion("Confirm whether this is intended or choose a higher target version"),
            Ordering::Greater => ReportItem::info(format!("Detected upgrade from {source} to {target}")),
        };
        Ok(vec![item
            .with_rule(NAME)
            .with_metadata("source", source)
            .with_metadata("target", target)])
    }
}
