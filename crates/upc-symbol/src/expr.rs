//! Lowered Go expression model
//!
//! Both the tree-sitter path and the fallback scanner produce these types,
//! so every consumer sees one shape regardless of how a file was parsed.

use std::fmt;

/// Formatting calls whose single meaningful argument is the value itself.
///
/// Entries containing a dot match exactly; bare entries also match any
/// package-qualified form (`BoolToOnOff` matches `variable.BoolToOnOff`).
pub const DEFAULT_FORMATTING_CALLS: &[&str] = &[
    "strconv.Itoa",
    "strconv.FormatInt",
    "strconv.FormatUint",
    "strconv.FormatFloat",
    "strconv.FormatBool",
];

/// A lowered Go expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// String or rune literal, already unquoted
    Str(String),
    /// Integer literal as written (sign folded in)
    Int(String),
    /// Float literal as written (sign folded in)
    Float(String),
    /// `true` / `false`
    Bool(bool),
    /// `nil`
    Nil,
    /// Bare identifier
    Ident(String),
    /// `package.Name`
    Qualified {
        /// Package (or receiver) part
        package: String,
        /// Selected name
        name: String,
    },
    /// Function call; `function` is the callee text without whitespace
    Call {
        /// Callee, e.g. `strconv.Itoa`
        function: String,
        /// Lowered arguments
        args: Vec<Expr>,
    },
    /// Binary expression
    Binary {
        /// Left operand
        left: Box<Expr>,
        /// Operator token
        op: String,
        /// Right operand
        right: Box<Expr>,
    },
    /// Composite literal, typed or elided
    Composite(CompositeLiteral),
    /// Anything the model does not represent
    Other(String),
}

impl Expr {
    /// Identifier name, if this is a bare identifier
    #[inline]
    #[must_use]
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            _ => None,
        }
    }

    /// Composite literal, if this is one
    #[inline]
    #[must_use]
    pub fn as_composite(&self) -> Option<&CompositeLiteral> {
        match self {
            Expr::Composite(lit) => Some(lit),
            _ => None,
        }
    }

    /// Whether `token` appears as an identifier or selected name anywhere in
    /// this expression, looking through binary operators.
    #[must_use]
    pub fn mentions(&self, token: &str) -> bool {
        match self {
            Expr::Ident(name) | Expr::Qualified { name, .. } => name == token,
            Expr::Binary { left, right, .. } => left.mentions(token) || right.mentions(token),
            _ => false,
        }
    }

    /// Key text for a composite field key
    pub(crate) fn key_text(&self) -> Option<String> {
        match self {
            Expr::Ident(name) | Expr::Str(name) => Some(name.clone()),
            Expr::Qualified { package, name } => Some(format!("{package}.{name}")),
            _ => None,
        }
    }

    /// Negate a numeric literal (`-` prefix)
    pub(crate) fn negated(self) -> Expr {
        match self {
            Expr::Int(text) => Expr::Int(negate_text(&text)),
            Expr::Float(text) => Expr::Float(negate_text(&text)),
            other => Expr::Other(format!("-{other:?}")),
        }
    }
}

fn negate_text(text: &str) -> String {
    text.strip_prefix('-')
        .map_or_else(|| format!("-{text}"), str::to_string)
}

/// A composite literal: `Type{Key: value, ...}` or an elided `{...}`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompositeLiteral {
    /// Type text as written (`SysVar`, `&config.Log`, `[]*SysVar`), if any
    pub type_name: Option<String>,
    /// Elements in source order
    pub fields: Vec<Field>,
}

/// One element of a composite literal
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Key for keyed elements
    pub key: Option<String>,
    /// Element value
    pub value: Expr,
}

impl CompositeLiteral {
    /// First value stored under `key`
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&Expr> {
        self.fields
            .iter()
            .find(|f| f.key.as_deref() == Some(key))
            .map(|f| &f.value)
    }

    /// Type name stripped of pointer, slice and package decoration
    #[must_use]
    pub fn base_type(&self) -> Option<&str> {
        let name = self.type_name.as_deref()?;
        let name = name.rsplit(['*', ']', '&']).next().unwrap_or(name);
        let name = name.rsplit('.').next().unwrap_or(name);
        (!name.is_empty()).then_some(name)
    }

    /// Visit this literal and every nested composite, parents first
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a CompositeLiteral)) {
        visit(self);
        for field in &self.fields {
            if let Expr::Composite(nested) = &field.value {
                nested.walk(visit);
            }
        }
    }
}

/// A resolved literal value
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// String value
    Str(String),
    /// Integer value
    Int(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Bool(bool),
}

impl Literal {
    /// Convert a literal expression; anything else yields `None`
    #[must_use]
    pub fn from_expr(expr: &Expr) -> Option<Self> {
        match expr {
            Expr::Str(s) => Some(Literal::Str(s.clone())),
            Expr::Int(text) => parse_go_int(text).map(Literal::Int),
            Expr::Float(text) => text.replace('_', "").parse().ok().map(Literal::Float),
            Expr::Bool(b) => Some(Literal::Bool(*b)),
            _ => None,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Str(s) => f.write_str(s),
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Float(x) => write!(f, "{x}"),
            Literal::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Whether a callee matches a formatting-call pattern
#[must_use]
pub fn matches_call(function: &str, pattern: &str) -> bool {
    if pattern.contains('.') {
        return function == pattern;
    }
    function == pattern
        || function
            .rsplit_once('.')
            .is_some_and(|(_, name)| name == pattern)
}

/// Parse a Go integer literal (decimal, hex, octal, binary, underscores)
#[must_use]
pub fn parse_go_int(text: &str) -> Option<i64> {
    let cleaned = text.replace('_', "");
    let (negative, digits) = match cleaned.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };
    let lower = digits.to_ascii_lowercase();
    let value = if let Some(hex) = lower.strip_prefix("0x") {
        i64::from_str_radix(hex, 16).ok()?
    } else if let Some(oct) = lower.strip_prefix("0o") {
        i64::from_str_radix(oct, 8).ok()?
    } else if let Some(bin) = lower.strip_prefix("0b") {
        i64::from_str_radix(bin, 2).ok()?
    } else if lower.len() > 1 && lower.starts_with('0') {
        i64::from_str_radix(&lower[1..], 8).ok()?
    } else {
        lower.parse().ok()?
    };
    Some(if negative { -value } else { value })
}

/// Unquote a Go string, raw string or rune literal
#[must_use]
pub fn unquote(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('`') && raw.ends_with('`') {
        return Some(raw[1..raw.len() - 1].to_string());
    }
    let quote = raw.chars().next()?;
    if !(quote == '"' || quote == '\'') || raw.len() < 2 || !raw.ends_with(quote) {
        return None;
    }
    unescape(&raw[1..raw.len() - 1])
}

fn unescape(body: &str) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next()? {
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{7}'),
            'b' => out.push('\u{8}'),
            'f' => out.push('\u{c}'),
            'v' => out.push('\u{b}'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            d @ '0'..='7' => {
                let rest: String = chars.by_ref().take(2).collect();
                let code = u32::from_str_radix(&format!("{d}{rest}"), 8).ok()?;
                out.push(char::from_u32(code)?);
            }
            _ => return None,
        }
    }
    Some(out)
}

fn hex_escape(chars: &mut std::str::Chars<'_>, len: usize) -> Option<char> {
    let digits: String = chars.take(len).collect();
    if digits.len() != len {
        return None;
    }
    char::from_u32(u32::from_str_radix(&digits, 16).ok()?)
}
