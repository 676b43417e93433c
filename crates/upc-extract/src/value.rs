//! Name and value resolution shared by the extraction passes

use crate::options::ExtractorConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use upc_catalog::{ParameterValue, Scalar, ValueType};
use upc_symbol::expr::matches_call;
use upc_symbol::{Expr, Literal, SymbolTable};

static SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d+(\.\d+)?(B|KB|MB|GB|TB|KiB|MiB|GiB|TiB)$").expect("valid regex")
});

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+(\.\d+)?(ns|us|µs|ms|s|m|h))+$").expect("valid regex"));

/// Surface type of a string default
#[must_use]
pub fn infer_string_type(value: &str) -> ValueType {
    if SIZE.is_match(value) {
        ValueType::Size
    } else if DURATION.is_match(value) {
        ValueType::Duration
    } else {
        ValueType::String
    }
}

/// `ON`/`OFF` for on/off tokens in any case
#[must_use]
pub fn on_off(value: &str) -> Option<&'static str> {
    if value.eq_ignore_ascii_case("on") {
        Some("ON")
    } else if value.eq_ignore_ascii_case("off") {
        Some("OFF")
    } else {
        None
    }
}

fn sentinel(token: &'static str) -> ParameterValue {
    ParameterValue::new(Scalar::Str(token.to_string()), ValueType::Bool)
}

/// Typed parameter value for a resolved literal
#[must_use]
pub fn parameter_from_literal(literal: Literal) -> ParameterValue {
    match literal {
        Literal::Int(n) => ParameterValue::new(Scalar::Int(n), ValueType::Int),
        Literal::Float(x) => ParameterValue::new(Scalar::Float(x), ValueType::Float),
        Literal::Bool(b) => ParameterValue::new(Scalar::Bool(b), ValueType::Bool),
        Literal::Str(s) => match on_off(&s) {
            Some(token) => sentinel(token),
            None => {
                let value_type = infer_string_type(&s);
                ParameterValue::new(Scalar::Str(s), value_type)
            }
        },
    }
}

/// Go `time` unit → duration suffix
fn duration_suffix(unit: &str) -> Option<&'static str> {
    Some(match unit.trim_end_matches('s') {
        "Nanosecond" => "ns",
        "Microsecond" => "us",
        "Millisecond" => "ms",
        "Second" => "s",
        "Minute" => "m",
        "Hour" => "h",
        _ => return None,
    })
}

/// Resolves lowered expressions against a frozen symbol table
#[derive(Debug, Clone, Copy)]
pub struct ValueResolver<'a> {
    table: &'a SymbolTable,
    config: &'a ExtractorConfig,
}

impl<'a> ValueResolver<'a> {
    /// Create a resolver
    #[inline]
    #[must_use]
    pub fn new(table: &'a SymbolTable, config: &'a ExtractorConfig) -> Self {
        Self { table, config }
    }

    /// Variable name: a string literal, or a reference to one
    #[must_use]
    pub fn name(&self, expr: &Expr) -> Option<String> {
        let name = match expr {
            Expr::Str(s) => s.clone(),
            other => match self.table.resolve_reference(other, &self.config.local_packages)? {
                Literal::Str(s) => s.clone(),
                _ => return None,
            },
        };
        let name = name.trim();
        (!name.is_empty()).then(|| name.to_string())
    }

    /// Literal behind an expression, unwrapping formatting calls
    #[must_use]
    pub fn literal(&self, expr: &Expr) -> Option<Literal> {
        match expr {
            Expr::Ident(_) | Expr::Qualified { .. } => self
                .table
                .resolve_reference(expr, &self.config.local_packages)
                .cloned(),
            Expr::Call { function, args } if self.is_formatting(function) => {
                self.literal(args.first()?)
            }
            other => Literal::from_expr(other),
        }
    }

    /// System variable default value
    ///
    /// Returns `None` for anything that does not resolve to a literal.
    #[must_use]
    pub fn value(&self, expr: &Expr) -> Option<ParameterValue> {
        if let Expr::Call { function, args } = expr {
            if self.is_on_off(function) {
                return match (args.len(), args.first().and_then(|a| self.literal(a))) {
                    (1, Some(Literal::Bool(b))) => Some(sentinel(if b { "ON" } else { "OFF" })),
                    _ => None,
                };
            }
            if self.is_formatting(function) {
                return self.value(args.first()?);
            }
        }
        if let Some(literal) = self.literal(expr) {
            return Some(parameter_from_literal(literal));
        }
        match expr {
            Expr::Ident(name) => on_off(name)
                .filter(|_| matches!(name.as_str(), "On" | "Off"))
                .map(sentinel),
            Expr::Qualified { package, name } if self.is_local(package) => on_off(name)
                .filter(|_| matches!(name.as_str(), "On" | "Off"))
                .map(sentinel),
            _ => None,
        }
    }

    /// Configuration default: [`ValueResolver::value`] plus `N * time.Unit`
    /// and `Duration{Duration: ...}` wrappers
    #[must_use]
    pub fn config_value(&self, expr: &Expr) -> Option<ParameterValue> {
        match expr {
            Expr::Binary { left, op, right } if op == "*" => {
                let Expr::Qualified { package, name } = right.as_ref() else {
                    return None;
                };
                if package != "time" {
                    return None;
                }
                let suffix = duration_suffix(name)?;
                let Some(Literal::Int(n)) = self.literal(left) else {
                    return None;
                };
                Some(ParameterValue::new(
                    Scalar::Str(format!("{n}{suffix}")),
                    ValueType::Duration,
                ))
            }
            Expr::Composite(lit) if lit.base_type() == Some("Duration") => {
                self.config_value(lit.field("Duration")?)
            }
            Expr::Qualified { package, name } if package == "time" => {
                let suffix = duration_suffix(name)?;
                Some(ParameterValue::new(
                    Scalar::Str(format!("1{suffix}")),
                    ValueType::Duration,
                ))
            }
            other => self.value(other),
        }
    }

    fn is_local(&self, package: &str) -> bool {
        self.config.local_packages.iter().any(|p| p == package)
    }

    fn is_formatting(&self, function: &str) -> bool {
        self.config
            .formatting_calls
            .iter()
            .any(|pattern| matches_call(function, pattern))
    }

    fn is_on_off(&self, function: &str) -> bool {
        self.config
            .on_off_calls
            .iter()
            .any(|pattern| matches_call(function, pattern))
    }
}
