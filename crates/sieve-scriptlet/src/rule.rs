use sieve_error::{Error, Result};
use std::sync::OnceLock;

/// A parsed scriptlet rule's argument list: the scriptlet name followed
/// by its normalized, comma-separated arguments. The exact argument
/// vocabulary is defined by the bundle this is eventually injected
/// alongside, not by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ScriptletArgs {
    pub name: String,
    pub args: Vec<String>,
}

impl ScriptletArgs {
    /// Renders a single call expression for this scriptlet, to be
    /// concatenated with the others inside the injected bundle's IIFE.
    pub fn generate_injection(&self) -> String {
        let mut out = format!("runScriptlet({}", js_string(&self.name));
        for arg in &self.args {
            out.push(',');
            out.push_str(&js_string(arg));
        }
        out.push_str(");");
        out
    }
}

fn js_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// The outcome of parsing one scriptlet rule line.
pub struct ParsedRule {
    pub host_patterns: String,
    pub args: ScriptletArgs,
    pub is_exception: bool,
}

struct Regexes {
    canonical_primary: regex::Regex,
    canonical_exception: regex::Regex,
    ublock_primary: regex::Regex,
    ublock_exception: regex::Regex,
}

fn regexes() -> &'static Regexes {
    static REGEXES: OnceLock<Regexes> = OnceLock::new();
    REGEXES.get_or_init(|| Regexes {
        canonical_primary: regex::Regex::new(r"^(.*)#%#//scriptlet\((.+)\)$").unwrap(),
        canonical_exception: regex::Regex::new(r"^(.*)#@%#//scriptlet\((.+)\)$").unwrap(),
        ublock_primary: regex::Regex::new(r"^(.*)##\+js\((.+)\)$").unwrap(),
        ublock_exception: regex::Regex::new(r"^(.*)#@#\+js\((.+)\)$").unwrap(),
    })
}

/// Parses a single scriptlet rule line, recognizing both the canonical
/// `#%#//scriptlet(...)` / `#@%#//scriptlet(...)` syntax and the uBlock
/// `##+js(...)` / `#@#+js(...)` syntax. uBlock-flavored rules are
/// normalized to the same [`ScriptletArgs`] shape as canonical ones.
pub fn parse_rule(line: &str) -> Result<ParsedRule> {
    let regexes = regexes();

    if let Some(captures) = regexes.canonical_exception.captures(line) {
        return Ok(ParsedRule {
            host_patterns: captures[1].to_owned(),
            args: parse_args(&captures[2]),
            is_exception: true,
        });
    }
    if let Some(captures) = regexes.canonical_primary.captures(line) {
        return Ok(ParsedRule {
            host_patterns: captures[1].to_owned(),
            args: parse_args(&captures[2]),
            is_exception: false,
        });
    }
    if let Some(captures) = regexes.ublock_exception.captures(line) {
        return Ok(ParsedRule {
            host_patterns: captures[1].to_owned(),
            args: parse_args(&captures[2]),
            is_exception: true,
        });
    }
    if let Some(captures) = regexes.ublock_primary.captures(line) {
        return Ok(ParsedRule {
            host_patterns: captures[1].to_owned(),
            args: parse_args(&captures[2]),
            is_exception: false,
        });
    }

    Err(Error::UnsupportedSyntax(line.to_owned()))
}

fn parse_args(raw: &str) -> ScriptletArgs {
    let mut parts = raw.split(',').map(normalize_arg);
    let name = parts.next().unwrap_or_default();
    ScriptletArgs {
        name,
        args: parts.collect(),
    }
}

fn normalize_arg(arg: &str) -> String {
    let trimmed = arg.trim();
    trimmed
        .strip_prefix('\'')
        .and_then(|s| s.strip_suffix('\''))
        .or_else(|| trimmed.strip_prefix('"').and_then(|s| s.strip_suffix('"')))
        .unwrap_or(trimmed)
        .to_owned()
}
