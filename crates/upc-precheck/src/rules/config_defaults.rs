//! Component configuration against knowledge base defaults

use crate::engine::Rule;
use crate::error::RuleError;
use crate::report::ReportItem;
use crate::snapshot::{value_text, ComponentSnapshot, Snapshot};
use std::sync::Arc;
use upc_catalog::{KbSnapshot, KnowledgeSource};

/// Rule identifier
pub const NAME: &str = "core.config-default-drift";

/// Flags config keys whose default changes between the source and target releases
#[derive(Clone)]
pub struct ConfigDefaultDrift {
    knowledge: Arc<dyn KnowledgeSource>,
}

impl std::fmt::Debug for ConfigDefaultDrift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigDefaultDrift").finish_non_exhaustive()
    }
}

impl ConfigDefaultDrift {
    /// Create the rule over a knowledge base handle
    #[must_use]
    pub fn new(knowledge: Arc<dyn KnowledgeSource>) -> Self {
        Self { knowledge }
    }

    fn load(&self, component: &str, version: &str) -> Result<Option<KbSnapshot>, RuleError> {
        if version.is_empty() {
            return Ok(None);
        }
        Ok(self.knowledge.snapshot(component, version)?)
    }

    fn check_component(
        &self,
        name: &str,
        component: &ComponentSnapshot,
        source: &str,
        target: &str,
    ) -> Result<Vec<ReportItem>, RuleError> {
        let (Some(from), Some(to)) = (self.load(name, source)?, self.load(name, target)?) else {
            return Ok(vec![ReportItem::info(format!(
                "No knowledge base for {name} {source} -> {target}; skipping config default checks"
            ))
            .with_rule(NAME)
            .with_suggestion("Generate knowledge base snapshots for both releases")]);
        };

        let mut items = Vec::new();
        for (key, live) in &component.config {
            let (Some(old), Some(new)) = (
                from.config_defaults.get_ignore_case(key),
                to.config_defaults.get_ignore_case(key),
            ) else {
                continue;
            };
            let new_text = new.value.to_string();
            if old.value.text_eq(&new_text) {
                continue;
            }
            let current = value_text(live);
            let item = if old.value.text_eq(&current) {
                ReportItem::info(format!(
                    "{name} config {key} default changes from \"{}\" to \"{new_text}\"",
                    old.value
                ))
                .with_suggestion("Review whether the new default suits the workload")
            } else {
                ReportItem::warning(format!(
                    "{name} config {key} is customized as \"{current}\" and its default changes from \"{}\" to \"{new_text}\"",
                    old.value
                ))
                .with_suggestion("Confirm the customized value is still appropriate for the target release")
            };
            items.push(
                item.with_rule(NAME)
                    .with_metadata("component", name)
                    .with_metadata("key", key.as_str())
                    .with_metadata("current_value", current)
                    .with_metadata("source_default", old.value.to_string())
                    .with_metadata("target_default", new_text)
                    .with_metadata("type", new.value_type.as_str()),
            );
        }
        Ok(items)
    }
}

impl Rule for ConfigDefaultDrift {
    fn name(&self) -> &str {
        NAME
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Result<Vec<ReportItem>, RuleError> {
        let target = snapshot.target_version.trim();
        let mut items = Vec::new();
        for (name, component) in &snapshot.components {
            let source = match component.version.trim() {
                "" => snapshot.source_version.trim(),
                running => running,
            };
            items.extend(self.check_component(name, component, source, target)?);
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::Severity;
    use mockall::mock;
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;
    use serde_json::Value;
    use upc_catalog::{CatalogError, CatalogResult, ParameterMap, ParameterValue, Scalar, ValueType};

    mock! {
        Knowledge {}
        impl KnowledgeSource for Knowledge {
            fn snapshot(&self, component: &str, version: &str) -> CatalogResult<Option<KbSnapshot>>;
        }
    }

    fn kb(version: &str, defaults: &[(&str, ParameterValue)]) -> KbSnapshot {
        let defaults: ParameterMap = defaults.iter().map(|(k, v)| ((*k).to_string(), v.clone())).collect();
        KbSnapshot::new("tidb", version).with_config_defaults(defaults)
    }

    fn int(n: i64) -> ParameterValue {
        ParameterValue::new(Scalar::Int(n), ValueType::Int)
    }

    fn knowledge() -> MockKnowledge {
        let mut mock = MockKnowledge::new();
        mock.expect_snapshot()
            .with(eq("tidb"), eq("v7.5.0"))
            .returning(|_, _| {
                Ok(Some(kb(
                    "v7.5.0",
                    &[
                        ("log.slow-threshold", int(300)),
                        ("performance.max-procs", int(0)),
                        ("token-limit", int(1000)),
                        ("log.level", ParameterValue::string("info")),
                    ],
                )))
            });
        mock.expect_snapshot()
            .with(eq("tidb"), eq("v8.1.0"))
            .returning(|_, _| {
                Ok(Some(kb(
                    "v8.1.0",
                    &[
                        ("log.slow-threshold", int(500)),
                        ("performance.max-procs", int(4)),
                        ("token-limit", int(1000)),
                    ],
                )))
            });
        mock
    }

    fn snapshot() -> Snapshot {
        Snapshot::new("v7.5.0", "v8.1.0").with_component(
            "tidb",
            ComponentSnapshot::new("v7.5.0")
                .with_config("Log.Slow-Threshold", 300)
                .with_config("performance.max-procs", 8)
                .with_config("token-limit", 2000)
                .with_config("log.level", "warn"),
        )
    }

    #[test]
    fn classifies_drift() {
        let rule = ConfigDefaultDrift::new(Arc::new(knowledge()));
        let items = rule.evaluate(&snapshot()).unwrap();

        let seen: Vec<_> = items.iter().map(|i| (i.severity, i.metadata["key"].clone())).collect();
        assert_eq!(
            seen,
            vec![
                (Severity::Info, Value::from("Log.Slow-Threshold")),
                (Severity::Warning, Value::from("performance.max-procs")),
            ]
        );
        assert_eq!(
            items[0].message,
            "tidb config Log.Slow-Threshold default changes from \"300\" to \"500\""
        );
        assert_eq!(items[1].metadata["current_value"], "8");
    }

    #[test]
    fn missing_knowledge_base_skips_component() {
        let mut mock = MockKnowledge::new();
        mock.expect_snapshot().returning(|_, _| Ok(None));
        let rule = ConfigDefaultDrift::new(Arc::new(mock));

        let items = rule.evaluate(&snapshot()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].severity, Severity::Info);
        assert!(items[0].message.starts_with("No knowledge base for tidb"));
    }

    #[test]
    fn load_failure_is_a_rule_error() {
        let mut mock = MockKnowledge::new();
        mock.expect_snapshot().returning(|_, _| {
            Err(CatalogError::io_error(
                "kb/tidb/v7.5.0/defaults.json",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
            ))
        });
        let rule = ConfigDefaultDrift::new(Arc::new(mock));
        assert!(matches!(rule.evaluate(&snapshot()), Err(RuleError::Knowledge(_))));
    }

    #[test]
    fn no_components_no_findings() {
        let rule = ConfigDefaultDrift::new(Arc::new(MockKnowledge::new()));
        assert!(rule.evaluate(&Snapshot::new("v7.5.0", "v8.1.0")).unwrap().is_empty());
    }
}
