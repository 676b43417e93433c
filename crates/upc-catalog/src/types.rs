//! Knowledge base and change record types

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Read `null` as the type's default, as Go writes nil slices
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Scalar carried by a [`ParameterValue`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Boolean value
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// Text value (also sizes, durations and ON/OFF tokens)
    Str(String),
}

impl Scalar {
    /// Compare two scalars as trimmed, case-insensitive text
    #[must_use]
    pub fn text_eq(&self, other: &str) -> bool {
        self.to_string().trim().eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::Float(x) => write!(f, "{x}"),
            Scalar::Str(s) => f.write_str(s),
        }
    }
}

/// Surface type of a parameter value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ValueType {
    /// Plain text
    String,
    /// Integer
    Int,
    /// Floating point
    Float,
    /// Boolean, including ON/OFF tokens
    Bool,
    /// Duration such as `10s` or `1h30m`
    Duration,
    /// Byte size such as `64MB`
    Size,
    /// Anything else
    #[default]
    Unknown,
}

impl ValueType {
    /// Lowercase name used in documents
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueType::String => "string",
            ValueType::Int => "int",
            ValueType::Float => "float",
            ValueType::Bool => "bool",
            ValueType::Duration => "duration",
            ValueType::Size => "size",
            ValueType::Unknown => "unknown",
        }
    }
}

impl From<String> for ValueType {
    fn from(s: String) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "string" => ValueType::String,
            "int" => ValueType::Int,
            "float" => ValueType::Float,
            "bool" => ValueType::Bool,
            "duration" => ValueType::Duration,
            "size" => ValueType::Size,
            _ => ValueType::Unknown,
        }
    }
}

impl From<ValueType> for String {
    fn from(t: ValueType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default value of one parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterValue {
    /// The value
    pub value: Scalar,
    /// Inferred surface type
    #[serde(rename = "type", default)]
    pub value_type: ValueType,
}

impl ParameterValue {
    /// Create a parameter value
    #[inline]
    #[must_use]
    pub fn new(value: Scalar, value_type: ValueType) -> Self {
        Self { value, value_type }
    }

    /// Text value typed as `string`
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::new(Scalar::Str(value.into()), ValueType::String)
    }
}

/// Parameter name → value, ordered by name for stable output
///
/// Names keep their case; [`ParameterMap::get_ignore_case`] compares
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap(BTreeMap<String, ParameterValue>);

impl ParameterMap {
    /// Create an empty map
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a parameter, returning the previous value
    pub fn insert(&mut self, name: impl Into<String>, value: ParameterValue) -> Option<ParameterValue> {
        self.0.insert(name.into(), value)
    }

    /// Exact-name lookup
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name)
    }

    /// Case-insensitive lookup
    #[must_use]
    pub fn get_ignore_case(&self, name: &str) -> Option<&ParameterValue> {
        self.0.get(name).or_else(|| {
            self.0
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(name))
                .map(|(_, v)| v)
        })
    }

    /// Whether `name` is present, exactly
    #[inline]
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of parameters
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in name order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParameterValue)> {
        self.0.iter()
    }
}

impl FromIterator<(String, ParameterValue)> for ParameterMap {
    fn from_iter<I: IntoIterator<Item = (String, ParameterValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Persisted defaults of one component at one release
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KbSnapshot {
    /// Component name (`tidb`, `pd`, ...)
    #[serde(default)]
    pub component: String,
    /// Release string
    pub version: String,
    /// Configuration file defaults
    #[serde(default)]
    pub config_defaults: ParameterMap,
    /// Global system variable defaults
    #[serde(default, skip_serializing_if = "ParameterMap::is_empty")]
    pub system_variables: ParameterMap,
    /// Bootstrap revision, 0 when not applicable
    #[serde(default)]
    pub bootstrap_version: i64,
}

impl KbSnapshot {
    /// Create an empty snapshot for a component release
    #[must_use]
    pub fn new(component: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            version: version.into(),
            config_defaults: ParameterMap::new(),
            system_variables: ParameterMap::new(),
            bootstrap_version: 0,
        }
    }

    /// Set config defaults
    #[must_use]
    pub fn with_config_defaults(mut self, defaults: ParameterMap) -> Self {
        self.config_defaults = defaults;
        self
    }

    /// Set system variable defaults
    #[must_use]
    pub fn with_system_variables(mut self, variables: ParameterMap) -> Self {
        self.system_variables = variables;
        self
    }

    /// Set bootstrap revision
    #[must_use]
    pub fn with_bootstrap_version(mut self, version: i64) -> Self {
        self.bootstrap_version = version;
        self
    }
}

/// What a change applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// Global system variable
    #[default]
    Sysvar,
    /// Configuration file parameter
    Config,
}

/// Scope of a changed variable
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeScope {
    /// No scope recorded
    #[default]
    Unspecified,
    /// Global scope
    Global,
    /// Session scope
    Session,
    /// Any other recorded scope, kept verbatim
    Other(String),
}

impl ChangeScope {
    /// Unspecified or global; the only scopes that reach global baselines
    #[inline]
    #[must_use]
    pub fn is_global_or_unspecified(&self) -> bool {
        matches!(self, ChangeScope::Unspecified | ChangeScope::Global)
    }
}

impl From<String> for ChangeScope {
    fn from(s: String) -> Self {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            ChangeScope::Unspecified
        } else if trimmed.eq_ignore_ascii_case("global") {
            ChangeScope::Global
        } else if trimmed.eq_ignore_ascii_case("session") {
            ChangeScope::Session
        } else {
            ChangeScope::Other(trimmed.to_string())
        }
    }
}

impl From<ChangeScope> for String {
    fn from(scope: ChangeScope) -> Self {
        match scope {
            ChangeScope::Unspecified => String::new(),
            ChangeScope::Global => "global".to_string(),
            ChangeScope::Session => "session".to_string(),
            ChangeScope::Other(s) => s,
        }
    }
}

/// One mutation applied by an upgrade step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Revision before the step; defaults to `to_version - 1`
    #[serde(default)]
    pub from_version: i64,
    /// Revision that introduces the change
    #[serde(default)]
    pub to_version: i64,
    /// Variable or config change
    #[serde(default)]
    pub kind: ChangeKind,
    /// Variable name
    pub target: String,
    /// Value written by the step
    #[serde(default)]
    pub default_value: String,
    /// Applied unconditionally
    #[serde(default)]
    pub force: bool,
    /// Short description, usually the upgrade function's doc comment
    #[serde(default)]
    pub summary: String,
    /// Longer description
    #[serde(default)]
    pub details: String,
    /// Variable scope
    #[serde(default)]
    pub scope: ChangeScope,
    /// Risk label (`medium`, `low-medium`, ...)
    #[serde(default)]
    pub risk_level: String,
    /// Operator hints surfaced as suggestions; `null` reads as empty
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub optional_hints: Vec<String>,
    /// Source idiom that produced the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// Upgrade function containing the change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<String>,
    /// Old value a migration rewrites from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_value: Option<String>,
}

impl Change {
    /// Global sysvar change at `to_version`
    #[must_use]
    pub fn sysvar(target: impl Into<String>, value: impl Into<String>, to_version: i64) -> Self {
        Self {
            from_version: to_version - 1,
            to_version,
            kind: ChangeKind::Sysvar,
            target: target.into(),
            default_value: value.into(),
            force: false,
            summary: String::new(),
            details: String::new(),
            scope: ChangeScope::Global,
            risk_level: "medium".to_string(),
            optional_hints: Vec::new(),
            method: None,
            function: None,
            from_value: None,
        }
    }

    /// Set force flag
    #[must_use]
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set summary
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = summary.into();
        self
    }

    /// Set details
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = details.into();
        self
    }

    /// Set scope
    #[must_use]
    pub fn with_scope(mut self, scope: ChangeScope) -> Self {
        self.scope = scope;
        self
    }

    /// Append an operator hint
    #[must_use]
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.optional_hints.push(hint.into());
        self
    }

    /// Copy with versions defaulted against bucket revision `version`
    #[must_use]
    pub fn normalized(&self, version: i64) -> Self {
        let mut change = self.clone();
        if change.to_version == 0 {
            change.to_version = version;
        }
        if change.from_version == 0 {
            change.from_version = change.to_version - 1;
        }
        change
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parameter_value_document_shape() {
        let value = ParameterValue::new(Scalar::Int(4000), ValueType::Int);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"value":4000,"type":"int"}"#);

        let float: ParameterValue = serde_json::from_str(r#"{"value":0.8,"type":"float"}"#).unwrap();
        assert_eq!(float.value, Scalar::Float(0.8));

        let legacy: ParameterValue = serde_json::from_str(r#"{"value":"x","type":"number"}"#).unwrap();
        assert_eq!(legacy.value_type, ValueType::Unknown);
    }

    #[test]
    fn scalar_text_comparison() {
        assert!(Scalar::Str(" on ".into()).text_eq("ON"));
        assert!(Scalar::Int(151).text_eq("151"));
        assert!(!Scalar::Bool(true).text_eq("ON"));
    }

    #[test]
    fn parameter_map_case_insensitive_lookup() {
        let mut map = ParameterMap::new();
        map.insert("Log.Level", ParameterValue::string("info"));
        assert!(map.get("log.level").is_none());
        assert!(map.get_ignore_case("log.level").is_some());
    }

    #[test]
    fn kb_snapshot_omits_empty_system_variables() {
        let kb = KbSnapshot::new("pd", "v7.5.0");
        let json = serde_json::to_value(&kb).unwrap();
        assert!(json.get("system_variables").is_none());
        assert_eq!(json["bootstrap_version"], 0);
    }

    #[test]
    fn change_scope_parsing() {
        assert_eq!(ChangeScope::from("GLOBAL".to_string()), ChangeScope::Global);
        assert_eq!(ChangeScope::from(String::new()), ChangeScope::Unspecified);
        assert_eq!(
            ChangeScope::from("instance".to_string()),
            ChangeScope::Other("instance".into())
        );
        assert!(ChangeScope::Global.is_global_or_unspecified());
        assert!(!ChangeScope::Session.is_global_or_unspecified());
    }

    #[test]
    fn change_defaults_when_fields_missing() {
        let change: Change = serde_json::from_str(r#"{"target":"tidb_foo"}"#).unwrap();
        assert_eq!(change.kind, ChangeKind::Sysvar);
        assert_eq!(change.scope, ChangeScope::Unspecified);
        let normalized = change.normalized(80);
        assert_eq!((normalized.from_version, normalized.to_version), (79, 80));
    }
}
