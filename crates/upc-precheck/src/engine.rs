//! Rule trait and the sequential engine

use crate::error::RuleError;
use crate::report::{Report, ReportItem, Severity, Summary};
use crate::snapshot::Snapshot;
use chrono::Utc;
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// One precheck rule
///
/// Rules are pure readers of the snapshot and of whatever shared handles they
/// were built with.
pub trait Rule: Send + Sync + Debug {
    /// Stable rule identifier, e.g. `core.target-version-order`
    fn name(&self) -> &str;

    /// Evaluate against a snapshot
    ///
    /// # Errors
    /// A failure to load supporting data. The engine reports it as an
    /// error item and continues with the next rule.
    fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<ReportItem>, RuleError>;
}

/// Cooperative cancellation, checked between rules
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    /// Create an unset flag
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    #[inline]
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested
    #[inline]
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Runs registered rules in order and aggregates their findings
#[derive(Debug, Default)]
pub struct Engine {
    rules: Vec<Box<dyn Rule>>,
}

impl Engine {
    /// Create an engine with no rules
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a rule (builder form)
    #[must_use]
    pub fn with_rule(mut self, rule: impl Rule + 'static) -> Self {
        self.register(Box::new(rule));
        self
    }

    /// Register a rule
    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    /// Keep only the rules whose name satisfies `keep`
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.rules.retain(|rule| keep(rule.name()));
    }

    /// Registered rule names in run order
    #[must_use]
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Number of registered rules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether no rules are registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule against `snapshot`
    ///
    /// Always returns a report. Rule failures become error items, and a
    /// cancellation stops the run before the next rule.
    pub fn run(&self, snapshot: &Snapshot, cancel: &CancellationFlag) -> Report {
        let started_at = Utc::now();
        tracing::info!(
            rules = self.rules.len(),
            source = %snapshot.source_version,
            target = %snapshot.target_version,
            "precheck started"
        );

        let mut items = Vec::new();
        let mut summary = Summary::default();
        let mut errors = Vec::new();

        for rule in &self.rules {
            let name = rule.name();
            if cancel.is_cancelled() {
                tracing::warn!(rule = name, "precheck cancelled");
                errors.push(format!("precheck cancelled before rule {name}"));
                break;
            }

            match rule.evaluate(snapshot) {
                Ok(found) => {
                    tracing::debug!(rule = name, items = found.len(), "rule evaluated");
                    for mut item in found {
                        if item.rule.is_empty() {
                            item.rule = name.to_string();
                        }
                        summary.record(item.severity);
                        items.push(item);
                    }
                }
                Err(err) => {
                    tracing::warn!(rule = name, error = %err, "rule failed");
                    errors.push(format!("rule {name} failed: {err}"));
                    let item = ReportItem::new(Severity::Error, "rule execution error")
                        .with_rule(name)
                        .with_detail(err.to_string());
                    summary.record(item.severity);
                    items.push(item);
                }
            }
        }

        let report = Report {
            started_at,
            finished_at: Utc::now(),
            items,
            summary,
            errors,
        };
        tracing::info!(
            total = report.summary.total,
            blocking = report.summary.blocking,
            errors = report.errors.len(),
            "precheck finished"
        );
        report
    }
}
