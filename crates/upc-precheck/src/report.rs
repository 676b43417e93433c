//! Findings and the aggregated report

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Seriousness of a finding
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    Info,
    /// Needs attention before upgrading
    Warning,
    /// Upgrade must not proceed
    Blocker,
    /// A rule failed to evaluate
    Error,
}

impl Severity {
    /// Lowercase name
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Blocker => "blocker",
            Self::Error => "error",
        }
    }

    /// Whether this severity blocks the upgrade
    #[inline]
    #[must_use]
    pub fn is_blocking(&self) -> bool {
        matches!(self, Self::Blocker | Self::Error)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding produced by a rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportItem {
    /// Producing rule; filled in by the engine when empty
    #[serde(default)]
    pub rule: String,
    /// Seriousness
    pub severity: Severity,
    /// One-line description
    pub message: String,
    /// Supporting details
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
    /// Suggested actions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    /// Structured context, in insertion order
    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub metadata: IndexMap<String, Value>,
}

impl ReportItem {
    /// Create an item without rule attribution
    #[must_use]
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            rule: String::new(),
            severity,
            message: message.into(),
            details: Vec::new(),
            suggestions: Vec::new(),
            metadata: IndexMap::new(),
        }
    }

    /// Informational item
    #[inline]
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    /// Warning item
    #[inline]
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    /// Blocker item
    #[inline]
    #[must_use]
    pub fn blocker(message: impl Into<String>) -> Self {
        Self::new(Severity::Blocker, message)
    }

    /// Attribute to a rule
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = rule.into();
        self
    }

    /// Append a detail line; empty lines are dropped
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        if !detail.is_empty() {
            self.details.push(detail);
        }
        self
    }

    /// Append a suggestion
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Append several suggestions
    #[must_use]
    pub fn with_suggestions<I, S>(mut self, suggestions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suggestions.extend(suggestions.into_iter().map(Into::into));
        self
    }

    /// Set a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Item counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// All items
    pub total: usize,
    /// Count per severity name
    pub by_severity: BTreeMap<String, usize>,
    /// Blocker and error items
    pub blocking: usize,
    /// Warning items
    pub warnings: usize,
    /// Info items
    pub infos: usize,
}

impl Summary {
    /// Count one item
    pub fn record(&mut self, severity: Severity) {
        self.total += 1;
        *self.by_severity.entry(severity.as_str().to_string()).or_default() += 1;
        match severity {
            Severity::Blocker | Severity::Error => self.blocking += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info => self.infos += 1,
        }
    }

    /// Summary over a list of items
    #[must_use]
    pub fn of(items: &[ReportItem]) -> Self {
        let mut summary = Self::default();
        for item in items {
            summary.record(item.severity);
        }
        summary
    }
}

/// Outcome of one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Run start, UTC
    pub started_at: DateTime<Utc>,
    /// Run end, UTC
    pub finished_at: DateTime<Utc>,
    /// Findings in rule order
    pub items: Vec<ReportItem>,
    /// Counts
    pub summary: Summary,
    /// Rule failures and cancellation notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

impl Report {
    /// Whether any blocker or error item was produced
    #[inline]
    #[must_use]
    pub fn has_blocking(&self) -> bool {
        self.summary.blocking > 0
    }

    /// Items produced by `rule`
    pub fn items_for<'a>(&'a self, rule: &'a str) -> impl Iterator<Item = &'a ReportItem> + 'a {
        self.items.iter().filter(move |item| item.rule == rule)
    }

    /// Pretty JSON rendering
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// One-line summary for terminals
    #[must_use]
    pub fn summary_line(&self) -> String {
        format!(
            "{} findings: {} blocking, {} warnings, {} info, {} errors",
            self.summary.total,
            self.summary.blocking,
            self.summary.warnings,
            self.summary.infos,
            self.errors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn item_serializes_without_empty_fields() {
        let item = ReportItem::warning("changed")
            .with_rule("core.test")
            .with_detail("")
            .with_metadata("to_version", 66)
            .with_metadata("target", "tidb_foo");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            json!({
                "rule": "core.test",
                "severity": "warning",
                "message": "changed",
                "metadata": {"to_version": 66, "target": "tidb_foo"}
            })
        );
        let keys: Vec<_> = item.metadata.keys().cloned().collect();
        assert_eq!(keys, vec!["to_version", "target"]);
    }

    #[test]
    fn summary_counts_blocking() {
        let items = vec![
            ReportItem::info("a"),
            ReportItem::warning("b"),
            ReportItem::blocker("c"),
            ReportItem::new(Severity::Error, "d"),
            ReportItem::info("e"),
        ];
        let summary = Summary::of(&items);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.blocking, 2);
        assert_eq!(summary.warnings, 1);
        assert_eq!(summary.infos, 2);
        assert_eq!(summary.by_severity["info"], 2);
        assert_eq!(summary.by_severity.get("blocker"), Some(&1));
    }

    #[test]
    fn severity_order_and_names() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Blocker < Severity::Error);
        assert_eq!(serde_json::to_string(&Severity::Blocker).unwrap(), "\"blocker\"");
        assert!(Severity::Error.is_blocking());
        assert!(!Severity::Warning.is_blocking());
    }
}
