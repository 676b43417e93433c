//! Lexical fallback for Go files that do not parse structurally
//!
//! A tokenizer plus a small expression reader. Declarations are found at
//! `const`/`var` keywords that open a line, composite literals at each `{`
//! preceded by a type, and struct tags inside `type T struct { ... }` bodies.

use crate::expr::{unquote, CompositeLiteral, Expr, Field};
use crate::source::{GoSource, ParseMode, ValueDecl};

const KEYWORDS: &[&str] = &[
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

const PUNCT3: &[&str] = &["...", "<<=", ">>=", "&^="];
const PUNCT2: &[&str] = &[
    ":=", "==", "!=", "<=", ">=", "&&", "||", "<<", ">>", "&^", "<-", "++", "--", "+=", "-=",
    "*=", "/=", "%=", "&=", "|=", "^=",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Ident,
    Int,
    Float,
    Str,
    Punct,
}

#[derive(Debug, Clone)]
struct Token {
    kind: Kind,
    text: String,
    line: usize,
}

impl Token {
    fn is(&self, punct: &str) -> bool {
        self.kind == Kind::Punct && self.text == punct
    }

    fn is_word(&self, word: &str) -> bool {
        self.kind == Kind::Ident && self.text == word
    }

    fn is_name(&self) -> bool {
        self.kind == Kind::Ident && !KEYWORDS.contains(&self.text.as_str())
    }
}

/// Scan `text` into a [`GoSource`]
pub(crate) fn scan(text: &str) -> GoSource {
    let toks = tokenize(text);
    let mut out = GoSource::empty(ParseMode::Fallback);
    collect_decls(&toks, &mut out);
    collect_assignments(&toks, &mut out);
    collect_composites(&toks, &mut out);
    collect_tags(&toks, &mut out);
    out
}

fn tokenize(text: &str) -> Vec<Token> {
    let chars: Vec<char> = text.chars().collect();
    let mut toks = Vec::new();
    let mut line = 1;
    let mut i = 0;

    let slice = |from: usize, to: usize| chars[from..to].iter().collect::<String>();

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        let start_line = line;

        if c == '\n' {
            line += 1;
            i += 1;
        } else if c.is_whitespace() {
            i += 1;
        } else if c == '/' && next == Some('/') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && next == Some('*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            i = (i + 2).min(chars.len());
        } else if c == '"' || c == '\'' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != c && chars[i] != '\n' {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            if chars.get(i) == Some(&c) {
                i += 1;
            }
            let raw = slice(start, i.min(chars.len()));
            let value = unquote(&raw).unwrap_or_else(|| raw.trim_matches(c).to_string());
            toks.push(Token { kind: Kind::Str, text: value, line: start_line });
        } else if c == '`' {
            let start = i + 1;
            i += 1;
            while i < chars.len() && chars[i] != '`' {
                if chars[i] == '\n' {
                    line += 1;
                }
                i += 1;
            }
            let value = slice(start, i.min(chars.len()));
            i = (i + 1).min(chars.len());
            toks.push(Token { kind: Kind::Str, text: value, line: start_line });
        } else if c.is_ascii_digit() || (c == '.' && next.is_some_and(|n| n.is_ascii_digit())) {
            let start = i;
            let hex = c == '0' && matches!(next, Some('x' | 'X'));
            while i < chars.len() {
                let ch = chars[i];
                let exponent = if hex { matches!(ch, 'p' | 'P') } else { matches!(ch, 'e' | 'E') };
                if exponent && matches!(chars.get(i + 1), Some('+' | '-')) {
                    i += 2;
                } else if ch.is_ascii_alphanumeric() || ch == '_' || ch == '.' {
                    i += 1;
                } else {
                    break;
                }
            }
            let text = slice(start, i);
            let float = if hex {
                text.contains(['p', 'P'])
            } else {
                text.contains(['.', 'e', 'E'])
            };
            let kind = if float { Kind::Float } else { Kind::Int };
            toks.push(Token { kind, text, line: start_line });
        } else if c.is_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            toks.push(Token { kind: Kind::Ident, text: slice(start, i), line: start_line });
        } else {
            let rest = slice(i, (i + 3).min(chars.len()));
            let op = PUNCT3
                .iter()
                .chain(PUNCT2)
                .find(|op| rest.starts_with(**op))
                .map_or_else(|| c.to_string(), |op| (*op).to_string());
            i += op.chars().count();
            toks.push(Token { kind: Kind::Punct, text: op, line: start_line });
        }
    }
    toks
}

fn starts_line(toks: &[Token], i: usize) -> bool {
    i == 0 || toks[i - 1].line < toks[i].line || toks[i - 1].is(";")
}

fn collect_decls(toks: &[Token], out: &mut GoSource) {
    let mut i = 0;
    while i < toks.len() {
        let tok = &toks[i];
        if !(tok.is_word("const") || tok.is_word("var")) || !starts_line(toks, i) {
            i += 1;
            continue;
        }
        let mut r = Reader::new(toks, i + 1);
        if r.eat("(") {
            while let Some(tok) = r.peek() {
                if tok.is(")") {
                    r.pos += 1;
                    break;
                }
                let before = r.pos;
                if !r.spec(&mut out.decls) {
                    r.pos = before;
                    r.skip_line();
                }
            }
        } else {
            r.spec(&mut out.decls);
        }
        i = r.pos.max(i + 1);
    }
}

fn collect_assignments(toks: &[Token], out: &mut GoSource) {
    for i in 0..toks.len().saturating_sub(2) {
        let (target, eq) = (&toks[i], &toks[i + 1]);
        if !target.is_name() || !eq.is("=") || eq.line != target.line || !starts_line(toks, i) {
            continue;
        }
        let mut r = Reader::new(toks, i + 2);
        if let Some(value) = r.expr() {
            if r.at_statement_end() {
                out.assignments.push(ValueDecl {
                    name: target.text.clone(),
                    value,
                });
            }
        }
    }
}

fn collect_composites(toks: &[Token], out: &mut GoSource) {
    let mut i = 0;
    while i < toks.len() {
        if !toks[i].is("{") || i == 0 {
            i += 1;
            continue;
        }
        let Some(type_name) = type_before(toks, i) else {
            i += 1;
            continue;
        };
        let mut r = Reader::new(toks, i);
        match r.composite_body(Some(type_name)) {
            Some(lit) => {
                lit.walk(&mut |c| out.composites.push(c.clone()));
                i = r.pos;
            }
            None => i += 1,
        }
    }
}

/// Reconstruct the type text immediately before the `{` at `brace`
fn type_before(toks: &[Token], brace: usize) -> Option<String> {
    let line = toks[brace].line;
    let prev = &toks[brace - 1];
    if !(prev.is_name() || prev.is("]")) || prev.line != line {
        return None;
    }
    let mut start = brace;
    while start > 0 {
        let t = &toks[start - 1];
        let part_of_type = t.line == line
            && (t.is_name()
                || t.is_word("map")
                || t.kind == Kind::Int
                || t.is(".")
                || t.is("*")
                || t.is("[")
                || t.is("]"));
        if !part_of_type {
            break;
        }
        start -= 1;
    }
    Some(toks[start..brace].iter().map(|t| t.text.as_str()).collect())
}

fn collect_tags(toks: &[Token], out: &mut GoSource) {
    let mut i = 2;
    while i + 1 < toks.len() {
        let is_struct_decl = toks[i].is_word("struct")
            && toks[i + 1].is("{")
            && toks[i - 1].is_name()
            && toks[i - 2].is_word("type");
        if !is_struct_decl {
            i += 1;
            continue;
        }
        let name = toks[i - 1].text.clone();
        let body_start = i + 2;
        let mut depth = 1;
        let mut j = body_start;
        while j < toks.len() && depth > 0 {
            if toks[j].is("{") {
                depth += 1;
            } else if toks[j].is("}") {
                depth -= 1;
            }
            j += 1;
        }
        let body = &toks[body_start..j.saturating_sub(1).max(body_start)];
        for line in split_lines(body) {
            record_field_tag(&name, line, out);
        }
        i = j;
    }
}

fn split_lines(toks: &[Token]) -> Vec<&[Token]> {
    let mut lines = Vec::new();
    let mut start = 0;
    for i in 1..=toks.len() {
        if i == toks.len() || toks[i].line != toks[start].line {
            lines.push(&toks[start..i]);
            start = i;
        }
    }
    lines
}

fn record_field_tag(struct_name: &str, line: &[Token], out: &mut GoSource) {
    let Some((tag, rest)) = line.split_last() else {
        return;
    };
    if tag.kind != Kind::Str || rest.is_empty() || !rest[0].is_name() {
        return;
    }
    let mut names = vec![rest[0].text.as_str()];
    let mut k = 1;
    while k + 1 < rest.len() && rest[k].is(",") && rest[k + 1].is_name() {
        names.push(&rest[k + 1].text);
        k += 2;
    }
    if k >= rest.len() {
        return;
    }
    for field in names {
        out.tags.insert_raw(Some(struct_name), field, &tag.text);
    }
}

fn precedence(op: &str) -> Option<u8> {
    Some(match op {
        "*" | "/" | "%" | "<<" | ">>" | "&" | "&^" => 5,
        "+" | "-" | "|" | "^" => 4,
        "==" | "!=" | "<" | "<=" | ">" | ">=" => 3,
        "&&" => 2,
        "||" => 1,
        _ => return None,
    })
}

fn expr_text(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) | Expr::Other(name) => name.clone(),
        Expr::Qualified { package, name } => format!("{package}.{name}"),
        other => format!("{other:?}"),
    }
}

struct Reader<'a> {
    toks: &'a [Token],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(toks: &'a [Token], pos: usize) -> Self {
        Self { toks, pos }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.toks.get(self.pos)
    }

    fn is(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is(punct))
    }

    fn eat(&mut self, punct: &str) -> bool {
        if self.is(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, punct: &str) -> Option<()> {
        self.eat(punct).then_some(())
    }

    fn prev_line(&self) -> usize {
        self.pos
            .checked_sub(1)
            .and_then(|p| self.toks.get(p))
            .map_or(0, |t| t.line)
    }

    /// Next token continues the current line
    fn continues_line(&self) -> bool {
        self.peek().is_some_and(|t| t.line == self.prev_line())
    }

    fn at_statement_end(&self) -> bool {
        !self.continues_line() || self.is(";") || self.is("}")
    }

    fn skip_line(&mut self) {
        let line = self.peek().map_or(0, |t| t.line);
        while self.peek().is_some_and(|t| t.line == line) {
            self.pos += 1;
        }
    }

    fn skip_balanced(&mut self, open: &str, close: &str) -> Option<()> {
        self.expect(open)?;
        let mut depth = 1;
        while depth > 0 {
            let tok = self.peek()?;
            if tok.is(open) {
                depth += 1;
            } else if tok.is(close) {
                depth -= 1;
            }
            self.pos += 1;
        }
        Some(())
    }

    /// One const/var spec; pushes declarations and reports success
    fn spec(&mut self, decls: &mut Vec<ValueDecl>) -> bool {
        let Some(first) = self.peek().filter(|t| t.is_name()) else {
            return false;
        };
        let line = first.line;
        let mut names = vec![first.text.clone()];
        self.pos += 1;
        while self.is(",") {
            self.pos += 1;
            match self.peek().filter(|t| t.is_name()) {
                Some(t) => names.push(t.text.clone()),
                None => return false,
            }
            self.pos += 1;
        }

        while let Some(tok) = self.peek() {
            if tok.line != line || tok.is("=") || tok.is(")") || tok.is(";") {
                break;
            }
            let skipped = match tok.text.as_str() {
                "(" if tok.kind == Kind::Punct => self.skip_balanced("(", ")"),
                "[" if tok.kind == Kind::Punct => self.skip_balanced("[", "]"),
                "{" if tok.kind == Kind::Punct => self.skip_balanced("{", "}"),
                _ => {
                    self.pos += 1;
                    Some(())
                }
            };
            if skipped.is_none() {
                return false;
            }
        }

        if !self.eat("=") {
            return true;
        }
        let mut values = Vec::new();
        loop {
            match self.expr() {
                Some(value) => values.push(value),
                None => return false,
            }
            if !self.eat(",") {
                break;
            }
        }
        if values.len() == names.len() {
            decls.extend(
                names
                    .into_iter()
                    .zip(values)
                    .map(|(name, value)| ValueDecl { name, value }),
            );
        }
        true
    }

    fn expr(&mut self) -> Option<Expr> {
        self.binary(1)
    }

    fn binary(&mut self, min_prec: u8) -> Option<Expr> {
        let mut left = self.unary()?;
        while let Some(tok) = self.peek() {
            if tok.kind != Kind::Punct || !self.continues_line() {
                break;
            }
            let Some(prec) = precedence(&tok.text).filter(|p| *p >= min_prec) else {
                break;
            };
            self.pos += 1;
            let right = self.binary(prec + 1)?;
            left = Expr::Binary {
                left: Box::new(left),
                op: tok.text.clone(),
                right: Box::new(right),
            };
        }
        Some(left)
    }

    fn unary(&mut self) -> Option<Expr> {
        let tok = self.peek()?;
        if tok.kind == Kind::Punct {
            match tok.text.as_str() {
                "&" | "+" => {
                    self.pos += 1;
                    return self.unary();
                }
                "-" => {
                    self.pos += 1;
                    return Some(self.unary()?.negated());
                }
                "!" | "^" | "*" | "<-" => {
                    self.pos += 1;
                    let operand = self.unary()?;
                    return Some(Expr::Other(format!("{}{}", tok.text, expr_text(&operand))));
                }
                _ => {}
            }
        }
        self.postfix()
    }

    fn postfix(&mut self) -> Option<Expr> {
        let mut expr = self.primary()?;
        while self.continues_line() {
            if self.eat(".") {
                let name = self.peek().filter(|t| t.kind == Kind::Ident)?.text.clone();
                self.pos += 1;
                expr = match expr {
                    Expr::Ident(package) => Expr::Qualified { package, name },
                    other => Expr::Other(format!("{}.{name}", expr_text(&other))),
                };
            } else if self.is("(") {
                self.pos += 1;
                let mut args = Vec::new();
                while !self.eat(")") {
                    args.push(self.element()?);
                    self.eat("...");
                    if !self.eat(",") {
                        self.expect(")")?;
                        break;
                    }
                }
                expr = Expr::Call {
                    function: expr_text(&expr),
                    args,
                };
            } else if self.is("{") && matches!(expr, Expr::Ident(_) | Expr::Qualified { .. }) {
                let lit = self.composite_body(Some(expr_text(&expr)))?;
                expr = Expr::Composite(lit);
            } else if self.is("[") {
                self.skip_balanced("[", "]")?;
                expr = Expr::Other(format!("{}[...]", expr_text(&expr)));
            } else {
                break;
            }
        }
        Some(expr)
    }

    fn primary(&mut self) -> Option<Expr> {
        let tok = self.peek()?;
        match tok.kind {
            Kind::Str => {
                self.pos += 1;
                Some(Expr::Str(tok.text.clone()))
            }
            Kind::Int => {
                self.pos += 1;
                Some(Expr::Int(tok.text.clone()))
            }
            Kind::Float => {
                self.pos += 1;
                Some(Expr::Float(tok.text.clone()))
            }
            Kind::Ident => match tok.text.as_str() {
                "true" | "false" => {
                    self.pos += 1;
                    Some(Expr::Bool(tok.text == "true"))
                }
                "nil" => {
                    self.pos += 1;
                    Some(Expr::Nil)
                }
                "func" => self.func_literal(),
                "map" | "struct" | "chan" | "interface" => self.typed_literal(),
                text if KEYWORDS.contains(&text) => None,
                _ => {
                    self.pos += 1;
                    Some(Expr::Ident(tok.text.clone()))
                }
            },
            Kind::Punct => match tok.text.as_str() {
                "(" => {
                    self.pos += 1;
                    let inner = self.expr()?;
                    self.expect(")")?;
                    Some(inner)
                }
                "[" => self.typed_literal(),
                "{" => self.composite_body(None).map(Expr::Composite),
                _ => None,
            },
        }
    }

    fn element(&mut self) -> Option<Expr> {
        if self.is("{") {
            self.composite_body(None).map(Expr::Composite)
        } else {
            self.expr()
        }
    }

    fn composite_body(&mut self, type_name: Option<String>) -> Option<CompositeLiteral> {
        self.expect("{")?;
        let mut fields = Vec::new();
        while !self.eat("}") {
            let first = self.element()?;
            let field = if self.eat(":") {
                Field {
                    key: first.key_text(),
                    value: self.element()?,
                }
            } else {
                Field {
                    key: None,
                    value: first,
                }
            };
            fields.push(field);
            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        Some(CompositeLiteral { type_name, fields })
    }

    /// `[]T{...}`, `map[K]V{...}`, `struct{...}{...}` and conversions
    fn typed_literal(&mut self) -> Option<Expr> {
        let type_name = self.type_text()?;
        if self.is("{") {
            return self.composite_body(Some(type_name)).map(Expr::Composite);
        }
        Some(Expr::Other(type_name))
    }

    fn type_text(&mut self) -> Option<String> {
        let start = self.pos;
        loop {
            let tok = self.peek()?;
            if tok.is("*") {
                self.pos += 1;
            } else if tok.is("[") {
                self.skip_balanced("[", "]")?;
            } else if tok.is_word("map") {
                self.pos += 1;
                self.skip_balanced("[", "]")?;
            } else if tok.is_word("chan") {
                self.pos += 1;
            } else if tok.is_word("struct") || tok.is_word("interface") {
                self.pos += 1;
                self.skip_balanced("{", "}")?;
                break;
            } else if tok.is_name() {
                self.pos += 1;
                if self.eat(".") {
                    self.peek().filter(|t| t.is_name())?;
                    self.pos += 1;
                }
                break;
            } else {
                return None;
            }
        }
        Some(self.toks[start..self.pos].iter().map(|t| t.text.as_str()).collect())
    }

    fn func_literal(&mut self) -> Option<Expr> {
        self.pos += 1;
        while let Some(tok) = self.peek() {
            if tok.is("{") {
                self.skip_balanced("{", "}")?;
                return Some(Expr::Other("func".to_string()));
            } else if tok.is("(") {
                self.skip_balanced("(", ")")?;
            } else if tok.is("[") {
                self.skip_balanced("[", "]")?;
            } else if tok.is(",") || tok.is(")") || tok.is("}") || tok.is(";") {
                return Some(Expr::Other("func".to_string()));
            } else {
                self.pos += 1;
            }
        }
        None
    }
}
