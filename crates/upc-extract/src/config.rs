//! Configuration file defaults from the default config literal
//!
//! The root literal (`var defaultConf = Config{...}`) is walked field by
//! field. Keys come from `toml` struct tags, so fields without a tag are not
//! user-visible and are skipped. Nested literals extend a dotted prefix.

use crate::options::ExtractorConfig;
use crate::value::ValueResolver;
use upc_catalog::ParameterMap;
use upc_symbol::{CompositeLiteral, Expr, GoSource, StructTags, SymbolTable};

/// Extracts configuration defaults
#[derive(Debug, Clone, Copy)]
pub struct ConfigDefaultsExtractor<'a> {
    config: &'a ExtractorConfig,
    resolver: ValueResolver<'a>,
}

impl<'a> ConfigDefaultsExtractor<'a> {
    /// Create an extractor over a frozen symbol table
    #[must_use]
    pub fn new(table: &'a SymbolTable, config: &'a ExtractorConfig) -> Self {
        Self {
            config,
            resolver: ValueResolver::new(table, config),
        }
    }

    /// Extract from the files of one config package
    ///
    /// Struct tags are pooled across all files before walking.
    #[must_use]
    pub fn extract(&self, sources: &[GoSource]) -> ParameterMap {
        let mut tags = StructTags::default();
        for source in sources {
            tags.extend(&source.tags);
        }

        let mut out = ParameterMap::new();
        let root = sources
            .iter()
            .rev()
            .find_map(|s| s.value_of(&self.config.config_root))
            .and_then(Expr::as_composite);
        match root {
            Some(root) => self.walk(root, "", &tags, &mut out),
            None => tracing::debug!(root = %self.config.config_root, "default config literal not found"),
        }

        for source in sources {
            self.default_constants(source, &tags, &mut out);
        }
        tracing::debug!(parameters = out.len(), tags = tags.len(), "extracted config defaults");
        out
    }

    fn walk(&self, literal: &CompositeLiteral, prefix: &str, tags: &StructTags, out: &mut ParameterMap) {
        let struct_name = literal.base_type();
        for field in &literal.fields {
            let Some(field_name) = field.key.as_deref() else {
                continue;
            };
            let Some(tag) = tags.lookup(struct_name, field_name) else {
                tracing::trace!(field = field_name, "field without toml tag, skipped");
                continue;
            };
            if tag.is_empty() || tag == "-" {
                continue;
            }
            let key = join_key(prefix, tag);

            if let Some(value) = self.resolver.config_value(&field.value) {
                out.insert(key, value);
            } else if let Expr::Composite(nested) = &field.value {
                self.walk(nested, &key, tags, out);
            } else {
                tracing::trace!(key = %key, "unresolved config default, skipped");
            }
        }
    }

    fn default_constants(&self, source: &GoSource, tags: &StructTags, out: &mut ParameterMap) {
        let prefix = &self.config.default_prefix;
        if prefix.is_empty() {
            return;
        }
        for decl in &source.decls {
            if decl.name == self.config.config_root {
                continue;
            }
            let Some(field) = decl.name.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if !field.starts_with(|c: char| c.is_ascii_uppercase()) {
                continue;
            }
            let Some(key) = tags.lookup(None, field).filter(|t| !t.is_empty() && *t != "-") else {
                continue;
            };
            if out.contains(key) {
                continue;
            }
            if let Some(value) = self.resolver.config_value(&decl.value) {
                out.insert(key, value);
            }
        }
    }
}

fn join_key(prefix: &str, tag: &str) -> String {
    if prefix.is_empty()
        || tag
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('.'))
    {
        tag.to_string()
    } else {
        format!("{prefix}.{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use upc_catalog::{ParameterValue, Scalar, ValueType};

    const CONFIG: &str = r#"
package config

const (
	DefPort      = 4000
	DefMaxProcs  = 0
	defaultGCLifeTime = 10 * time.Minute
)

type Config struct {
	Host        string      `toml:"host" json:"host"`
	Port        uint        `toml:"port" json:"port"`
	Log         Log         `toml:"log" json:"log"`
	Security    Security    `toml:"security" json:"security"`
	Performance Performance `toml:"performance" json:"performance"`
	GCLifeTime  Duration    `toml:"gc-life-time" json:"gc-life-time"`
	internal    string
}

type Log struct {
	Level string  `toml:"level" json:"level"`
	File  LogFile `toml:"file" json:"file"`
	SlowThreshold uint64 `toml:"slow-threshold" json:"slow-threshold"`
}

type LogFile struct {
	MaxSize int `toml:"max-size" json:"max-size"`
}

type Security struct {
	EnableSEM bool `toml:"security.enable-sem" json:"enable-sem"`
}

type Performance struct {
	MaxProcs      uint    `toml:"max-procs" json:"max-procs"`
	MemoryRatio   float64 `toml:"server-memory-quota-ratio,omitempty" json:"ratio"`
	StatsLease    string  `toml:"stats-lease" json:"stats-lease"`
	Unresolved    string  `toml:"unresolved" json:"unresolved"`
}

var defaultConf = Config{
	Host: DefHost,
	Port: DefPort,
	Log: Log{
		Level: "info",
		File: LogFile{
			MaxSize: 300,
		},
		SlowThreshold: 300,
	},
	Security: Security{
		EnableSEM: false,
	},
	Performance: Performance{
		MaxProcs:    DefMaxProcs,
		MemoryRatio: 0.8,
		StatsLease:  "3s",
		Unresolved:  runtime.GOOS,
	},
	internal: "x",
}
"#;

    fn extract(text: &str) -> ParameterMap {
        let config = ExtractorConfig::default();
        let source = GoSource::parse(text);
        let mut builder = config.symbol_builder();
        builder.add_source(&source);
        let table = builder.build();
        ConfigDefaultsExtractor::new(&table, &config).extract(&[source])
    }

    #[test]
    fn walks_nested_literal_with_tags() {
        let out = extract(CONFIG);
        let keys: Vec<&str> = out.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            vec![
                "gc-life-time",
                "log.file.max-size",
                "log.level",
                "log.slow-threshold",
                "performance.max-procs",
                "performance.server-memory-quota-ratio",
                "performance.stats-lease",
                "port",
                "security.enable-sem",
            ]
        );
        assert_eq!(out.get("port"), Some(&ParameterValue::new(Scalar::Int(4000), ValueType::Int)));
        assert_eq!(out.get("performance.stats-lease").unwrap().value_type, ValueType::Duration);
        assert_eq!(
            out.get("gc-life-time"),
            Some(&ParameterValue::new(Scalar::Str("10m".into()), ValueType::Duration))
        );
    }

    #[test]
    fn literal_walk_takes_precedence_over_constants() {
        let text = CONFIG.replace("Port: DefPort,", "Port: 4001,").replace(
            "DefPort      = 4000",
            "DefPort      = 4000\n\tdefaultPort = 9999",
        );
        let out = extract(&text);
        assert_eq!(out.get("port"), Some(&ParameterValue::new(Scalar::Int(4001), ValueType::Int)));
    }

    #[test]
    fn pointer_root_and_missing_root() {
        let text = CONFIG.replace("var defaultConf = Config{", "var defaultConf = &Config{");
        assert_eq!(extract(&text).len(), 9);

        let config = ExtractorConfig::default().with_config_root("absent");
        let source = GoSource::parse(CONFIG);
        let table = config.symbol_builder().build();
        let out = ConfigDefaultsExtractor::new(&table, &config).extract(&[source]);
        assert_eq!(out.len(), 1);
        assert!(out.contains("gc-life-time"));
    }

    #[test]
    fn join_key_avoids_double_prefix() {
        assert_eq!(join_key("", "port"), "port");
        assert_eq!(join_key("log", "level"), "log.level");
        assert_eq!(join_key("security", "security.enable-sem"), "security.enable-sem");
        assert_eq!(join_key("log", "logger"), "log.logger");
    }
}
