//! Subcommand implementations

use crate::config::CliConfig;
use anyhow::{bail, Context, Result};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use upc_catalog::knowledge::write_snapshot;
use upc_catalog::{
    BootstrapLookup, BootstrapVersionMap, BundledVersions, Catalog, ChangeDocument, KbSnapshot,
    KnowledgeStore,
};
use upc_extract::{extract_repo_upgrades, to_document, KnowledgeBaseBuilder};
use upc_precheck::{
    default_engine, validate_snapshot, CancellationFlag, Engine, Report, Snapshot, RULE_NAMES,
};

/// Report rendering for `check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Pretty JSON
    #[default]
    Json,
    /// Human-readable listing
    Text,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            other => bail!("unknown output format {other:?}, expected json or text"),
        }
    }
}

/// Extract a knowledge base snapshot from a source checkout
///
/// Writes to `out` when given, otherwise into the configured knowledge base.
/// Returns the written path together with the snapshot.
pub fn extract_kb(
    component: &str,
    version: &str,
    source: &Path,
    out: Option<&Path>,
    config: &CliConfig,
) -> Result<(PathBuf, KbSnapshot)> {
    let snapshot = KnowledgeBaseBuilder::from_repo(component, version, source)
        .and_then(|builder| builder.with_config(config.extractor.clone()).build())
        .with_context(|| format!("failed to extract {component} {version} from {}", source.display()))?;

    let path = match out {
        Some(path) => {
            write_snapshot(path, &snapshot)?;
            path.to_path_buf()
        }
        None => KnowledgeStore::new(config.knowledge_root()).save(&snapshot)?,
    };
    tracing::info!(
        path = %path.display(),
        sysvars = snapshot.system_variables.len(),
        config = snapshot.config_defaults.len(),
        "knowledge base written"
    );
    Ok((path, snapshot))
}

/// Extract the upgrade change document from a source checkout
///
/// Writes to `out` when given; the document is returned either way.
pub fn extract_upgrade(source: &Path, out: Option<&Path>, config: &CliConfig) -> Result<ChangeDocument> {
    let changes = extract_repo_upgrades(source, &config.extractor)
        .with_context(|| format!("failed to extract upgrade changes from {}", source.display()))?;
    let document = to_document(changes);
    if let Some(path) = out {
        document.write(path)?;
        tracing::info!(path = %path.display(), changes = document.len(), "change document written");
    }
    Ok(document)
}

/// Run every enabled rule against the snapshot at `snapshot_path`
pub fn check(snapshot_path: &Path, config: &CliConfig) -> Result<Report> {
    let snapshot = Snapshot::read(snapshot_path)?;
    validate_snapshot(&snapshot)
        .with_context(|| format!("snapshot {} cannot be checked", snapshot_path.display()))?;

    let engine = engine_for(config)?;
    tracing::debug!(rules = ?engine.rule_names(), "engine assembled");
    Ok(engine.run(&snapshot, &CancellationFlag::new()))
}

fn engine_for(config: &CliConfig) -> Result<Engine> {
    let catalog = match &config.catalog {
        Some(path) => Catalog::load(path)
            .with_context(|| format!("failed to load change catalog {}", path.display()))?,
        None => {
            tracing::warn!("no change catalog configured; sysvar rules see an empty catalog");
            Catalog::default()
        }
    };
    let bootstrap: Arc<dyn BootstrapLookup> = match &config.bootstrap_dir {
        Some(dir) => Arc::new(
            BootstrapVersionMap::load_dir(dir)
                .with_context(|| format!("failed to load bootstrap documents from {}", dir.display()))?,
        ),
        None => Arc::new(BundledVersions),
    };
    let knowledge = Arc::new(KnowledgeStore::new(config.knowledge_root()));

    let mut engine = default_engine(Arc::new(catalog), bootstrap, knowledge);
    if !config.enabled_rules.is_empty() {
        if let Some(unknown) = config
            .enabled_rules
            .iter()
            .find(|name| !RULE_NAMES.contains(&name.as_str()))
        {
            bail!("unknown rule {unknown:?}; available rules: {}", RULE_NAMES.join(", "));
        }
        engine.retain(|name| config.enabled_rules.iter().any(|wanted| wanted == name));
    }
    Ok(engine)
}

/// Bootstrap map entries, from `bootstrap_dir` when configured
pub fn versions(config: &CliConfig) -> Result<Vec<(String, i64)>> {
    let owned;
    let map = match &config.bootstrap_dir {
        Some(dir) => {
            owned = BootstrapVersionMap::load_dir(dir)
                .with_context(|| format!("failed to load bootstrap documents from {}", dir.display()))?;
            &owned
        }
        None => BootstrapVersionMap::bundled()?,
    };
    Ok(map.iter().map(|(release, rev)| (release.to_string(), rev)).collect())
}

/// Plain-text rendering of a report
#[must_use]
pub fn render_text(report: &Report) -> String {
    let mut out = String::new();
    for item in &report.items {
        let _ = writeln!(out, "[{}] {}: {}", item.severity, item.rule, item.message);
        for detail in &item.details {
            let _ = writeln!(out, "    {detail}");
        }
        for suggestion in &item.suggestions {
            let _ = writeln!(out, "    suggestion: {suggestion}");
        }
    }
    for error in &report.errors {
        let _ = writeln!(out, "error: {error}");
    }
    let _ = writeln!(out, "{}", report.summary_line());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pretty_assertions::assert_eq;
    use upc_precheck::{ReportItem, Summary};

    #[test]
    fn output_format_parsing() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_rendering_lists_items_and_summary() {
        let items = vec![ReportItem::blocker("Target is older")
            .with_rule("core.target-version-order")
            .with_detail("downgrades are unsupported")
            .with_suggestion("pick a newer target")];
        let report = Report {
            started_at: Utc::now(),
            finished_at: Utc::now(),
            summary: Summary::of(&items),
            items,
            errors: vec!["rule x failed: boom".to_string()],
        };

        let text = render_text(&report);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines[0], "[blocker] core.target-version-order: Target is older");
        assert_eq!(lines[1], "    downgrades are unsupported");
        assert_eq!(lines[2], "    suggestion: pick a newer target");
        assert_eq!(lines[3], "error: rule x failed: boom");
        assert!(lines[4].starts_with("1 findings: 1 blocking"));
    }

    #[test]
    fn unknown_rule_is_rejected() {
        let config = CliConfig {
            enabled_rules: vec!["core.nope".to_string()],
            ..CliConfig::default()
        };
        let err = engine_for(&config).unwrap_err();
        assert!(err.to_string().contains("core.nope"));
    }

    #[test]
    fn enabled_rules_filter_engine() {
        let config = CliConfig {
            enabled_rules: vec!["core.target-version-order".to_string()],
            ..CliConfig::default()
        };
        let engine = engine_for(&config).unwrap();
        assert_eq!(engine.rule_names(), vec!["core.target-version-order"]);
    }
}
