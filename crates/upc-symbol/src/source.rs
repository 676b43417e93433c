//! Lowered view of one Go source file

use crate::error::{SymbolError, SymbolResult};
use crate::expr::{CompositeLiteral, Expr};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::path::Path;

static TOML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r#"toml:"([^"]*)""#).expect("valid regex"));

/// Which parser produced a [`GoSource`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseMode {
    /// tree-sitter produced an error-free tree
    Structural,
    /// Lexical scanner after a structural parse failure
    Fallback,
}

/// A `const`/`var` spec or a single-target assignment with its value
#[derive(Debug, Clone, PartialEq)]
pub struct ValueDecl {
    /// Declared name
    pub name: String,
    /// Lowered right-hand side
    pub value: Expr,
}

/// `toml` struct tags keyed by struct type and field
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructTags {
    typed: BTreeMap<(String, String), String>,
    untyped: BTreeMap<String, String>,
}

impl StructTags {
    /// Record a raw struct tag (`toml:"key,omitempty" json:"..."`)
    pub fn insert_raw(&mut self, struct_name: Option<&str>, field: &str, raw_tag: &str) {
        let Some(caps) = TOML_TAG.captures(raw_tag) else {
            return;
        };
        let key = caps[1].split(',').next().unwrap_or_default().to_string();
        if let Some(struct_name) = struct_name {
            self.typed
                .insert((struct_name.to_string(), field.to_string()), key.clone());
        }
        self.untyped.insert(field.to_string(), key);
    }

    /// Tag for `field`, preferring the one declared on `struct_name`
    #[must_use]
    pub fn lookup(&self, struct_name: Option<&str>, field: &str) -> Option<&str> {
        struct_name
            .and_then(|s| self.typed.get(&(s.to_string(), field.to_string())))
            .or_else(|| self.untyped.get(field))
            .map(String::as_str)
    }

    /// Number of tagged fields
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.untyped.len()
    }

    /// Check if no tags were recorded
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.untyped.is_empty()
    }

    /// Merge another file's tags into this one
    pub fn extend(&mut self, other: &StructTags) {
        self.typed
            .extend(other.typed.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.untyped
            .extend(other.untyped.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
}

/// Declarations, composite literals and struct tags of one Go file
#[derive(Debug, Clone, PartialEq)]
pub struct GoSource {
    /// `const`/`var` specs with explicit values, in source order
    pub decls: Vec<ValueDecl>,
    /// `name = value` statements with a single identifier target
    pub assignments: Vec<ValueDecl>,
    /// Every composite literal, parents before nested literals
    pub composites: Vec<CompositeLiteral>,
    /// `toml` tags of struct fields
    pub tags: StructTags,
    /// Parser that produced this view
    pub mode: ParseMode,
}

impl GoSource {
    pub(crate) fn empty(mode: ParseMode) -> Self {
        Self {
            decls: Vec::new(),
            assignments: Vec::new(),
            composites: Vec::new(),
            tags: StructTags::default(),
            mode,
        }
    }

    /// Parse Go source text, falling back to the scanner on syntax errors
    #[must_use]
    pub fn parse(text: &str) -> Self {
        match crate::go::lower(text) {
            Some(source) => source,
            None => {
                tracing::debug!("structural parse failed, using fallback scanner");
                Self::parse_fallback(text)
            }
        }
    }

    /// Parse with the lexical scanner only
    #[must_use]
    pub fn parse_fallback(text: &str) -> Self {
        crate::scan::scan(text)
    }

    /// Read and parse a file
    pub fn read(path: &Path) -> SymbolResult<Self> {
        let text =
            std::fs::read_to_string(path).map_err(|e| SymbolError::io_error(path, e))?;
        let source = Self::parse(&text);
        tracing::debug!(
            path = %path.display(),
            mode = ?source.mode,
            decls = source.decls.len(),
            composites = source.composites.len(),
            "parsed go source"
        );
        Ok(source)
    }

    /// Declaration or assignment named `name`, last one wins
    #[must_use]
    pub fn value_of(&self, name: &str) -> Option<&Expr> {
        self.decls
            .iter()
            .chain(&self.assignments)
            .rev()
            .find(|d| d.name == name)
            .map(|d| &d.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn struct_tags_prefer_typed_entry() {
        let mut tags = StructTags::default();
        tags.insert_raw(Some("Log"), "Level", r#"toml:"level" json:"level""#);
        tags.insert_raw(Some("Security"), "Level", r#"toml:"sec-level,omitempty""#);
        assert_eq!(tags.lookup(Some("Log"), "Level"), Some("level"));
        assert_eq!(tags.lookup(Some("Security"), "Level"), Some("sec-level"));
        assert_eq!(tags.lookup(Some("Other"), "Level"), Some("sec-level"));
        assert_eq!(tags.lookup(None, "Missing"), None);
    }

    #[test]
    fn struct_tags_ignore_non_toml() {
        let mut tags = StructTags::default();
        tags.insert_raw(Some("Config"), "Host", r#"json:"host""#);
        assert!(tags.is_empty());
    }
}
