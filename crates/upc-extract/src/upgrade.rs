//! Forced variable changes from `upgradeToVerN` functions
//!
//! The upgrade source is scanned line by line with a two-state machine. A
//! header line enters a function; brace depth tracks where it ends. Inside a
//! function each line is matched against the known mutation idioms, first
//! match wins.

use crate::bootstrap::{existing_candidates, SESSION_SOURCE_CANDIDATES};
use crate::builder::RepoLayout;
use crate::error::{ExtractError, ExtractResult};
use crate::options::ExtractorConfig;
use crate::value::{on_off, ValueResolver};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::path::{Path, PathBuf};
use upc_catalog::{Change, ChangeDocument};
use upc_symbol::expr::{parse_go_int, unquote};
use upc_symbol::{Expr, SymbolTable};

const RISK_MEDIUM: &str = "medium";
const RISK_LOW_MEDIUM: &str = "low-medium";

static HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^func (upgradeToVer(\d+))\b").expect("valid regex"));

static HAS_UPGRADE_FN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^func upgradeToVer\d+").expect("valid regex"));

// An argument: anything up to a comma or closing paren, allowing one level of
// nested parens such as `BoolToOnOff(true)`.
const ARG: &str = r"((?:[^(),]|\([^()]*\))+)";

static INIT_GLOBAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"initGlobalVariableIfNotExists\s*\(\s*[^,]+,{ARG},{ARG}"))
        .expect("valid regex")
});

static SET_SYSVAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"\b(setGlobalSysVar|writeGlobalSysVar)\s*\({ARG},{ARG}"))
        .expect("valid regex")
});

static ACCESSOR_SET: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"SetGlobalSysVar\s*\(\s*{ARG},{ARG},{ARG}\)")).expect("valid regex")
});

static SET_GLOBAL_SQL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)SET\s+@@GLOBAL\.?\s*([a-zA-Z0-9_]+)\s*=\s*('[^']*'|[\w.-]+)"#)
        .expect("valid regex")
});

static INSERT_VALUES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)INSERT\s+(?:HIGH_PRIORITY\s+)?(IGNORE\s+)?INTO\s+mysql\.global_variables\s+VALUES\s*\(\s*['"]([^'"]+)['"]\s*,\s*([^)]+)\)"#,
    )
    .expect("valid regex")
});

static WHERE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)WHERE\s+.*?VARIABLE_NAME\s*=\s*['"]([^'"]+)['"]"#).expect("valid regex")
});

static SET_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)SET\s+.*?VARIABLE_VALUE\s*=\s*(%\?|'[^']*')"#).expect("valid regex")
});

static OLD_VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)AND\s+VARIABLE_VALUE\s*=\s*(%\?|'[^']*')"#).expect("valid regex")
});

static NAME_SLOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)WHERE\s+.*?VARIABLE_NAME\s*=\s*(%\?|'[^']*')"#).expect("valid regex")
});

static TABLE_PARAMS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"GlobalVariablesTable\s*((?:,{ARG})*)")).expect("valid regex")
});

static INSERT_OR_REPLACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(INSERT|REPLACE)\b.*?\bINTO\b").expect("valid regex"));

static UPDATE_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bUPDATE\b.*?\bSET\b.*?VARIABLE_VALUE").expect("valid regex")
});

static DELETE_STMT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bDELETE\b.*?\bFROM\b.*?VARIABLE_NAME").expect("valid regex")
});

static ARG_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(&format!(r",{ARG}")).expect("valid regex"));

static CALL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_][\w.]*)\s*\((.*)\)$").expect("valid regex"));

static IDENT_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("valid regex"));

static QUALIFIED_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z_]\w*)\.([A-Za-z_]\w*)$").expect("valid regex"));

/// Locate the upgrade source under a repository root
///
/// Returns the first candidate that defines an `upgradeToVerN` function.
pub fn find_upgrade_source(root: &Path) -> ExtractResult<PathBuf> {
    for candidate in existing_candidates(root) {
        let text = std::fs::read_to_string(&candidate)
            .map_err(|e| ExtractError::io_error(&candidate, e))?;
        if HAS_UPGRADE_FN.is_match(&text) {
            return Ok(candidate);
        }
    }
    Err(ExtractError::NotFound {
        what: "upgrade source",
        root: root.to_path_buf(),
        tried: SESSION_SOURCE_CANDIDATES.iter().map(|rel| root.join(rel)).collect(),
    })
}

/// Extract upgrade changes from a repository checkout
///
/// Names resolve through the system variable packages of the same tree.
pub fn extract_repo_upgrades(root: &Path, config: &ExtractorConfig) -> ExtractResult<Vec<Change>> {
    let path = find_upgrade_source(root)?;
    let table = RepoLayout::discover(root)?.sysvar_table(config)?;
    UpgradeChangeExtractor::new(&table, config).extract_file(&path)
}

/// Group extracted changes into a versions document
#[must_use]
pub fn to_document(changes: Vec<Change>) -> ChangeDocument {
    ChangeDocument::grouped(changes)
}

/// `TiDBEnableFoo` → `tidb_enable_foo`
#[must_use]
pub fn camel_to_snake(name: &str) -> String {
    let (mut out, rest) = match name.strip_prefix("TiDB") {
        Some(rest) => (String::from("tidb"), rest),
        None => (String::new(), name),
    };
    let chars: Vec<char> = rest.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev = if i == 0 { out.chars().last() } else { Some(chars[i - 1]) };
            let next_lower = chars.get(i + 1).is_some_and(char::is_ascii_lowercase);
            let boundary = match prev {
                Some(p) if p.is_ascii_lowercase() || p.is_ascii_digit() => true,
                Some(p) if p.is_ascii_uppercase() => next_lower,
                _ => false,
            };
            if boundary && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Lower a raw argument token into an expression
fn token_expr(raw: &str) -> Expr {
    let token = raw.trim();
    if let Some(text) = unquote(token) {
        return Expr::Str(text);
    }
    if let Some(caps) = CALL_TOKEN.captures(token) {
        let inner = format!(",{}", &caps[2]);
        let args = ARG_SPLIT
            .captures_iter(&inner)
            .map(|c| token_expr(&c[1]))
            .collect();
        return Expr::Call {
            function: caps[1].to_string(),
            args,
        };
    }
    match token {
        "true" => return Expr::Bool(true),
        "false" => return Expr::Bool(false),
        _ => {}
    }
    if token.starts_with(|c: char| c.is_ascii_digit() || c == '-' || c == '.') {
        if parse_go_int(token).is_some() {
            return Expr::Int(token.to_string());
        }
        if token.parse::<f64>().is_ok() {
            return Expr::Float(token.to_string());
        }
    }
    if IDENT_TOKEN.is_match(token) {
        return Expr::Ident(token.to_string());
    }
    if let Some(caps) = QUALIFIED_TOKEN.captures(token) {
        return Expr::Qualified {
            package: caps[1].to_string(),
            name: caps[2].to_string(),
        };
    }
    Expr::Other(token.to_string())
}

/// SQL literal or `%?` placeholder
fn sql_slot(caps: Option<Captures<'_>>) -> Option<SqlSlot> {
    let text = caps?.get(1)?.as_str();
    Some(if text == "%?" {
        SqlSlot::Placeholder
    } else {
        SqlSlot::Literal(text.trim_matches('\'').to_string())
    })
}

enum SqlSlot {
    Literal(String),
    Placeholder,
}

/// Arguments following `mysql.GlobalVariablesTable`
fn table_params(line: &str) -> Vec<String> {
    let Some(caps) = TABLE_PARAMS.captures(line) else {
        return Vec::new();
    };
    ARG_SPLIT
        .captures_iter(&caps[1])
        .map(|c| c[1].trim().to_string())
        .collect()
}

/// One mutation matched on a line, before name and value resolution
struct Mutation {
    method: String,
    name: String,
    value: Option<String>,
    force: bool,
    from_value: Option<String>,
    delete: bool,
}

impl Mutation {
    fn new(method: impl Into<String>, name: impl Into<String>, value: Option<String>) -> Self {
        Self {
            method: method.into(),
            name: name.into(),
            value,
            force: true,
            from_value: None,
            delete: false,
        }
    }
}

#[derive(Debug)]
enum ScanState {
    Outside {
        comments: Vec<String>,
    },
    InsideFunction {
        depth: i64,
        function: String,
        version: i64,
        summary: String,
    },
}

/// Extracts forced global variable changes from the upgrade source
#[derive(Debug, Clone, Copy)]
pub struct UpgradeChangeExtractor<'a> {
    resolver: ValueResolver<'a>,
}

impl<'a> UpgradeChangeExtractor<'a> {
    /// Create an extractor resolving names through `table`
    #[must_use]
    pub fn new(table: &'a SymbolTable, config: &'a ExtractorConfig) -> Self {
        Self {
            resolver: ValueResolver::new(table, config),
        }
    }

    /// Read and scan an upgrade source file
    pub fn extract_file(&self, path: &Path) -> ExtractResult<Vec<Change>> {
        let text = std::fs::read_to_string(path).map_err(|e| ExtractError::io_error(path, e))?;
        let changes = self.extract(&text);
        tracing::info!(path = %path.display(), changes = changes.len(), "extracted upgrade changes");
        Ok(changes)
    }

    /// Scan upgrade source text; changes come back in source order
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<Change> {
        let mut changes = Vec::new();
        let mut state = ScanState::Outside {
            comments: Vec::new(),
        };

        for line in text.lines() {
            let delta = brace_delta(line);
            state = match state {
                ScanState::Outside { mut comments } => {
                    if let Some(caps) = HEADER.captures(line) {
                        let function = caps[1].to_string();
                        let version = caps[2].parse().unwrap_or_default();
                        let summary = comments.join(" ");
                        if delta > 0 {
                            ScanState::InsideFunction {
                                depth: delta,
                                function,
                                version,
                                summary,
                            }
                        } else {
                            ScanState::Outside {
                                comments: Vec::new(),
                            }
                        }
                    } else {
                        match line.trim().strip_prefix("//") {
                            Some(comment) => comments.push(comment.trim().to_string()),
                            None => comments.clear(),
                        }
                        ScanState::Outside { comments }
                    }
                }
                ScanState::InsideFunction {
                    depth,
                    function,
                    version,
                    summary,
                } => {
                    let depth = depth + delta;
                    if !line.trim_start().starts_with("//") {
                        if let Some(mutation) = match_line(line) {
                            changes.push(self.change(mutation, &function, version, &summary));
                        }
                    }
                    if depth <= 0 {
                        ScanState::Outside {
                            comments: Vec::new(),
                        }
                    } else {
                        ScanState::InsideFunction {
                            depth,
                            function,
                            version,
                            summary,
                        }
                    }
                }
            };
        }
        changes
    }

    fn resolve_name(&self, raw: &str) -> String {
        let expr = token_expr(raw);
        let name = self.resolver.name(&expr).unwrap_or_else(|| match &expr {
            Expr::Ident(name) | Expr::Qualified { name, .. } => camel_to_snake(name),
            _ => raw.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`')).to_string(),
        });
        name.to_lowercase()
    }

    fn resolve_value(&self, raw: &str) -> String {
        let expr = token_expr(raw);
        if let Some(value) = self.resolver.value(&expr) {
            return value.value.to_string();
        }
        tracing::trace!(token = raw.trim(), "unresolved value kept as source token");
        let token = raw.trim().trim_matches(|c| matches!(c, '"' | '\'' | '`'));
        on_off(token).map_or_else(|| token.to_string(), str::to_string)
    }

    fn change(&self, mutation: Mutation, function: &str, version: i64, summary: &str) -> Change {
        let target = self.resolve_name(&mutation.name);
        let value = mutation
            .value
            .as_deref()
            .map(|raw| self.resolve_value(raw))
            .unwrap_or_default();
        let from_value = mutation.from_value.as_deref().map(|raw| self.resolve_value(raw));

        let verb = if mutation.delete { "deletes" } else { "sets" };
        let details = format!("{function} {verb} global variable {target} via {}", mutation.method);
        let mut hints = Vec::new();
        if mutation.delete {
            hints.push(format!(
                "{target} is removed from mysql.global_variables; values set on it are dropped"
            ));
        }
        if mutation.method.ends_with("INSERT-IGNORE") {
            hints.push(
                "INSERT IGNORE keeps an existing value; only clusters without the variable receive this default"
                    .to_string(),
            );
        }
        if let Some(old) = &from_value {
            hints.push(format!("values equal to '{old}' are migrated to '{value}'"));
        }

        let mut change = Change::sysvar(target, value, version)
            .with_force(mutation.force)
            .with_summary(summary)
            .with_details(details);
        change.risk_level = if mutation.delete { RISK_LOW_MEDIUM } else { RISK_MEDIUM }.to_string();
        for hint in hints {
            change = change.with_hint(hint);
        }
        change.method = Some(mutation.method);
        change.function = Some(function.to_string());
        change.from_value = from_value;
        change
    }
}

/// Net brace count of a line, ignoring string, rune and comment text
fn brace_delta(line: &str) -> i64 {
    let mut delta = 0;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '{' => delta += 1,
            '}' => delta -= 1,
            '"' | '\'' => {
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            chars.next();
                        }
                        _ if inner == c => break,
                        _ => {}
                    }
                }
            }
            '`' => {
                for inner in chars.by_ref() {
                    if inner == '`' {
                        break;
                    }
                }
            }
            '/' if chars.as_str().starts_with('/') => break,
            _ => {}
        }
    }
    delta
}

fn match_line(line: &str) -> Option<Mutation> {
    if let Some(caps) = INIT_GLOBAL.captures(line) {
        return Some(Mutation::new(
            "initGlobalVariableIfNotExists",
            &caps[1],
            Some(caps[2].to_string()),
        ));
    }
    if let Some(caps) = SET_SYSVAR.captures(line) {
        return Some(Mutation::new(&caps[1], &caps[2], Some(caps[3].to_string())));
    }
    if line.contains("mustExecute") {
        if let Some(mutation) = match_must_execute(line) {
            return Some(mutation);
        }
    }
    ACCESSOR_SET
        .captures(line)
        .map(|caps| Mutation::new("SetGlobalSysVar", &caps[2], Some(caps[3].to_string())))
}

fn match_must_execute(line: &str) -> Option<Mutation> {
    if let Some(caps) = SET_GLOBAL_SQL.captures(line) {
        return Some(Mutation::new(
            "mustExecute",
            &caps[1],
            Some(caps[2].to_string()),
        ));
    }
    if line.contains("mysql.global_variables") {
        return match_literal_table(line);
    }
    if line.contains("GlobalVariablesTable") {
        return match_placeholder_table(line);
    }
    None
}

fn match_literal_table(line: &str) -> Option<Mutation> {
    if let Some(caps) = INSERT_VALUES.captures(line) {
        let ignore = caps.get(1).is_some();
        let method = if ignore {
            "mustExecute-INSERT-IGNORE"
        } else {
            "mustExecute-INSERT"
        };
        let mut mutation = Mutation::new(method, quoted(&caps[2]), Some(caps[3].to_string()));
        mutation.force = !ignore;
        return Some(mutation);
    }

    let name = WHERE_NAME.captures(line)?[1].to_string();
    let name = quoted(&name);
    if line.to_ascii_uppercase().contains("DELETE") {
        let mut mutation = Mutation::new("mustExecute", name, None);
        mutation.delete = true;
        return Some(mutation);
    }
    let value = match sql_slot(SET_VALUE.captures(line)) {
        Some(SqlSlot::Literal(v)) => quoted(&v),
        _ => quoted(""),
    };
    let mut mutation = Mutation::new("mustExecute", name, Some(value));
    if let Some(SqlSlot::Literal(old)) = sql_slot(OLD_VALUE.captures(line)) {
        mutation.from_value = Some(quoted(&old));
    }
    Some(mutation)
}

fn match_placeholder_table(line: &str) -> Option<Mutation> {
    let params = table_params(line);

    if let Some(caps) = INSERT_OR_REPLACE.captures(line) {
        let name = params.first()?;
        let replace = caps[1].eq_ignore_ascii_case("REPLACE");
        let ignore = !replace && line.to_ascii_uppercase().contains("IGNORE");
        let method = if replace {
            "mustExecute-REPLACE"
        } else if ignore {
            "mustExecute-INSERT-IGNORE"
        } else {
            "mustExecute-INSERT"
        };
        let mut mutation = Mutation::new(method, name.as_str(), params.get(1).cloned());
        mutation.force = !ignore;
        return Some(mutation);
    }

    if UPDATE_STMT.is_match(line) {
        // placeholders bind in SQL order: new value, name, old value
        let mut params = params.into_iter();
        let mut bind = |slot: Option<SqlSlot>| match slot {
            Some(SqlSlot::Literal(text)) => Some(quoted(&text)),
            Some(SqlSlot::Placeholder) => params.next(),
            None => None,
        };
        let value = bind(sql_slot(SET_VALUE.captures(line)));
        let name = bind(sql_slot(NAME_SLOT.captures(line)))?;
        let from_value = bind(sql_slot(OLD_VALUE.captures(line)));
        let mut mutation = Mutation::new("mustExecute-UPDATE", name, value);
        mutation.from_value = from_value;
        return Some(mutation);
    }

    if DELETE_STMT.is_match(line) {
        let name = match sql_slot(NAME_SLOT.captures(line))? {
            SqlSlot::Literal(text) => quoted(&text),
            SqlSlot::Placeholder => params.into_iter().next()?,
        };
        let mut mutation = Mutation::new("mustExecute-DELETE", name, None);
        mutation.delete = true;
        return Some(mutation);
    }
    None
}

/// Re-quote SQL literal text so it resolves as a string token
fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}
