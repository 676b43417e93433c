//! System variable defaults from `SysVar{...}` composite literals

use crate::options::ExtractorConfig;
use crate::value::ValueResolver;
use upc_catalog::{ParameterMap, ParameterValue};
use upc_symbol::{CompositeLiteral, GoSource, SymbolTable};

/// Extracts global system variable defaults
///
/// Every composite literal carrying the configured name and value keys and a
/// scope naming one of the global scope tokens is a candidate. A literal with
/// no scope field is `ScopeNone` and is omitted, as are entries that do not
/// fully resolve.
#[derive(Debug, Clone, Copy)]
pub struct SysVarExtractor<'a> {
    config: &'a ExtractorConfig,
    resolver: ValueResolver<'a>,
}

impl<'a> SysVarExtractor<'a> {
    /// Create an extractor over a frozen symbol table
    #[must_use]
    pub fn new(table: &'a SymbolTable, config: &'a ExtractorConfig) -> Self {
        Self {
            config,
            resolver: ValueResolver::new(table, config),
        }
    }

    /// Extract from several files; a later duplicate name overwrites
    #[must_use]
    pub fn extract<'s>(&self, sources: impl IntoIterator<Item = &'s GoSource>) -> ParameterMap {
        let mut out = ParameterMap::new();
        for source in sources {
            self.extract_into(source, &mut out);
        }
        tracing::debug!(variables = out.len(), "extracted system variable defaults");
        out
    }

    /// Parse `text` and extract from it
    #[must_use]
    pub fn extract_text(&self, text: &str) -> ParameterMap {
        self.extract([&GoSource::parse(text)])
    }

    /// Extract from one file into `out`, returning the number of entries written
    pub fn extract_into(&self, source: &GoSource, out: &mut ParameterMap) -> usize {
        let mut written = 0;
        for literal in &source.composites {
            if let Some((name, value)) = self.entry(literal) {
                out.insert(name, value);
                written += 1;
            }
        }
        written
    }

    fn entry(&self, literal: &CompositeLiteral) -> Option<(String, ParameterValue)> {
        let name_expr = literal.field(&self.config.name_key)?;
        let value_expr = literal.field(&self.config.value_key)?;

        let global = literal
            .field(&self.config.scope_key)
            .is_some_and(|scope| self.config.scope_tokens.iter().any(|t| scope.mentions(t)));
        if !global {
            tracing::trace!(?name_expr, "non-global scope, skipped");
            return None;
        }

        let Some(name) = self.resolver.name(name_expr) else {
            tracing::trace!(?name_expr, "unresolved variable name, skipped");
            return None;
        };
        let Some(value) = self.resolver.value(value_expr) else {
            tracing::trace!(name = %name, ?value_expr, "unresolved default value, skipped");
            return None;
        };
        Some((name, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use upc_catalog::{Scalar, ValueType};

    const VARDEF: &str = r#"
package vardef

const (
	TiDBEnableFoo   = "tidb_enable_foo"
	TiDBMaxChunk    = "tidb_max_chunk_size"
	TiDBSessionOnly = "tidb_session_only"
	DefMaxChunk     = 1024
	DefEnableFoo    = false
)
"#;

    const SYSVARS: &str = r#"
package variable

var defaultSysVars = []*SysVar{
	{Scope: vardef.ScopeGlobal | vardef.ScopeSession, Name: vardef.TiDBEnableFoo, Value: BoolToOnOff(vardef.DefEnableFoo), Type: vardef.TypeBool},
	{Scope: vardef.ScopeGlobal, Name: vardef.TiDBMaxChunk, Value: strconv.Itoa(vardef.DefMaxChunk)},
	{Scope: vardef.ScopeSession, Name: vardef.TiDBSessionOnly, Value: "1"},
	{Scope: vardef.ScopeGlobal, Name: "max_connections", Value: "151"},
	{Name: "tidb_no_scope", Value: vardef.On},
	{Scope: vardef.ScopeNone, Name: "version_comment", Value: "TiDB Server"},
	{Scope: vardef.ScopeGlobal, Name: vardef.TiDBUnknownName, Value: "x"},
	{Scope: vardef.ScopeGlobal, Name: "tidb_computed", Value: fmt.Sprint(runtime.NumCPU())},
}
"#;

    fn extract(text: &str) -> ParameterMap {
        let config = ExtractorConfig::default();
        let mut builder = config.symbol_builder();
        builder.add_source(&GoSource::parse(VARDEF));
        let table = builder.build();
        SysVarExtractor::new(&table, &config).extract_text(text)
    }

    #[test]
    fn extracts_resolvable_global_variables() {
        let vars = extract(SYSVARS);
        let names: Vec<&str> = vars.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            names,
            vec!["max_connections", "tidb_enable_foo", "tidb_max_chunk_size"]
        );
        assert_eq!(
            vars.get("tidb_enable_foo"),
            Some(&ParameterValue::new(Scalar::Str("OFF".into()), ValueType::Bool))
        );
        assert_eq!(
            vars.get("tidb_max_chunk_size"),
            Some(&ParameterValue::new(Scalar::Int(1024), ValueType::Int))
        );
        assert_eq!(vars.get("max_connections").unwrap().value_type, ValueType::String);
    }

    #[test]
    fn missing_or_none_scope_is_not_global() {
        let vars = extract(SYSVARS);
        assert!(vars.get("tidb_no_scope").is_none());
        assert!(vars.get("version_comment").is_none());

        let instance = extract(
            r#"
package variable

var a = []*SysVar{
	{Scope: vardef.ScopeInstance, Name: "tidb_instance_var", Value: "1"},
	{Name: "tidb_instance_var", Value: "2"},
}
"#,
        );
        assert_eq!(instance.get("tidb_instance_var"), Some(&ParameterValue::string("1")));
    }

    #[test]
    fn later_duplicate_wins() {
        let vars = extract(
            r#"
package variable

var a = []*SysVar{
	{Scope: ScopeGlobal, Name: "tidb_dup", Value: "1"},
	{Scope: ScopeGlobal, Name: "tidb_dup", Value: "2"},
}
"#,
        );
        assert_eq!(vars.get("tidb_dup"), Some(&ParameterValue::string("2")));
    }

    #[test]
    fn broken_file_uses_fallback_with_same_result() {
        let clean = extract(SYSVARS);
        let broken = format!("{SYSVARS}\nfunc broken( {{\n");
        assert_eq!(extract(&broken), clean);
    }
}
