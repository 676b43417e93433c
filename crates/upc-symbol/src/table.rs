//! Constant symbol table
//!
//! Maps Go constant and variable names to literal values. Built once per
//! source tree through [`SymbolTableBuilder`], then frozen.

use crate::expr::{matches_call, Expr, Literal, DEFAULT_FORMATTING_CALLS};
use crate::source::GoSource;
use std::collections::HashMap;

/// Frozen `name → literal` map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolTable {
    symbols: HashMap<String, Literal>,
}

impl SymbolTable {
    /// Start building a table with the default formatting calls
    #[inline]
    #[must_use]
    pub fn builder() -> SymbolTableBuilder {
        SymbolTableBuilder::new()
    }

    /// Literal bound to `name`
    #[inline]
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<&Literal> {
        self.symbols.get(name)
    }

    /// Resolve an identifier or a qualified name from one of `local_packages`
    #[must_use]
    pub fn resolve_reference<S: AsRef<str>>(
        &self,
        expr: &Expr,
        local_packages: &[S],
    ) -> Option<&Literal> {
        match expr {
            Expr::Ident(name) => self.lookup(name),
            Expr::Qualified { package, name }
                if local_packages.iter().any(|p| p.as_ref() == package) =>
            {
                self.lookup(name)
            }
            _ => None,
        }
    }

    /// Number of symbols
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterate all symbols in unspecified order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Literal)> {
        self.symbols.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Accumulates declarations from one or more files
#[derive(Debug, Clone)]
pub struct SymbolTableBuilder {
    literals: HashMap<String, Literal>,
    aliases: Vec<(String, String)>,
    formatting_calls: Vec<String>,
}

impl Default for SymbolTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTableBuilder {
    /// Create a builder recognizing [`DEFAULT_FORMATTING_CALLS`]
    #[must_use]
    pub fn new() -> Self {
        Self {
            literals: HashMap::new(),
            aliases: Vec::new(),
            formatting_calls: DEFAULT_FORMATTING_CALLS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
        }
    }

    /// Replace the recognized formatting calls
    #[must_use]
    pub fn with_formatting_calls<I, S>(mut self, calls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.formatting_calls = calls.into_iter().map(Into::into).collect();
        self
    }

    /// Add every `const`/`var` declaration of a parsed file
    pub fn add_source(&mut self, source: &GoSource) -> &mut Self {
        for decl in &source.decls {
            self.add_decl(&decl.name, &decl.value);
        }
        self
    }

    /// Add one declaration; later definitions replace earlier ones
    pub fn add_decl(&mut self, name: &str, value: &Expr) -> &mut Self {
        if let Some(literal) = self.literal_of(value) {
            self.aliases.retain(|(alias, _)| alias != name);
            self.literals.insert(name.to_string(), literal);
        } else if let Expr::Ident(target) = value {
            self.literals.remove(name);
            self.aliases.push((name.to_string(), target.clone()));
        } else {
            tracing::trace!(name = %name, "declaration is not a literal, not tabled");
        }
        self
    }

    fn literal_of(&self, value: &Expr) -> Option<Literal> {
        match value {
            Expr::Call { function, args } if self.is_formatting(function) => {
                args.first().and_then(Literal::from_expr)
            }
            other => Literal::from_expr(other),
        }
    }

    fn is_formatting(&self, function: &str) -> bool {
        self.formatting_calls
            .iter()
            .any(|pattern| matches_call(function, pattern))
    }

    /// Resolve identifier aliases and freeze the table
    #[must_use]
    pub fn build(mut self) -> SymbolTable {
        let mut pending = std::mem::take(&mut self.aliases);
        loop {
            let before = pending.len();
            pending.retain(|(name, target)| match self.literals.get(target).cloned() {
                Some(literal) => {
                    self.literals.insert(name.clone(), literal);
                    false
                }
                None => true,
            });
            if pending.is_empty() || pending.len() == before {
                break;
            }
        }
        for (name, target) in &pending {
            tracing::trace!(name = %name, target = %target, "alias target unresolved, not tabled");
        }
        SymbolTable {
            symbols: self.literals,
        }
    }
}
