//! Query templates: scope placeholders, interactive parameters, escaping
//!
//! Driver-defined queries carry two placeholder families:
//!
//! - `#{key}` / `#{key:kind}` — resolved from the ancestor scope when a
//!   node (or its actions) is constructed. `key` names a node kind on the
//!   path to the root; its value is that ancestor's key column.
//! - `${name}` / `${name:kind}` — interactive parameters, collected from
//!   the user right before execution.
//!
//! The optional `:kind` selects the escaping rule applied to the value.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TemplateError;

/// How a substituted value is escaped into SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValueKind {
    /// Spliced verbatim
    #[default]
    Raw,
    /// Quoted identifier; `.` separates qualification levels
    Ident,
    /// String literal
    Text,
    /// Validated numeric literal
    Number,
}

impl ValueKind {
    fn parse(tag: &str) -> Self {
        match tag {
            "id" => ValueKind::Ident,
            "text" => ValueKind::Text,
            "number" => ValueKind::Number,
            _ => ValueKind::Raw,
        }
    }
}

/// A parsed placeholder occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub kind: ValueKind,
    /// The token as written, including delimiters (used for replacement)
    pub token: String,
}

fn scope_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\{([^}]*?)\}").expect("valid scope placeholder regex"))
}

fn param_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\{([^}]*?)\}").expect("valid param placeholder regex"))
}

fn parse_body(body: &str) -> (String, ValueKind) {
    match body.split_once(':') {
        Some((name, tag)) => (name.to_string(), ValueKind::parse(tag)),
        None => (body.to_string(), ValueKind::Raw),
    }
}

fn placeholders(re: &Regex, query: &str) -> Vec<Placeholder> {
    let mut seen = Vec::new();
    let mut out = Vec::new();
    for caps in re.captures_iter(query) {
        let token = caps[0].to_string();
        if seen.contains(&token) {
            continue;
        }
        seen.push(token.clone());
        let (name, kind) = parse_body(&caps[1]);
        out.push(Placeholder { name, kind, token });
    }
    out
}

/// The `#{..}` placeholders of a query, deduplicated in order of appearance
pub fn scope_placeholders(query: &str) -> Vec<Placeholder> {
    placeholders(scope_re(), query)
}

/// The `${..}` placeholders of a query, deduplicated in order of appearance
pub fn param_placeholders(query: &str) -> Vec<Placeholder> {
    placeholders(param_re(), query)
}

/// Escape `value` according to `kind` (PostgreSQL rules)
pub fn escape(kind: ValueKind, value: &str) -> Result<String, TemplateError> {
    match kind {
        ValueKind::Raw => Ok(value.to_string()),
        ValueKind::Ident => Ok(value
            .split('.')
            .map(|part| format!("\"{}\"", part.replace('"', "\"\"")))
            .collect::<Vec<_>>()
            .join(".")),
        ValueKind::Text => Ok(format!("'{}'", value.replace('\'', "''"))),
        ValueKind::Number => {
            let trimmed = value.trim();
            trimmed
                .parse::<f64>()
                .map_err(|_| TemplateError::InvalidNumber(value.to_string()))?;
            Ok(trimmed.to_string())
        }
    }
}

/// Resolve every `#{..}` placeholder from `scope` (node kind → key value)
pub fn substitute_scope(
    query: &str,
    scope: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = query.to_string();
    for ph in scope_placeholders(query) {
        let value = scope
            .get(&ph.name)
            .ok_or_else(|| TemplateError::MissingValue(ph.name.clone()))?;
        out = out.replace(&ph.token, &escape(ph.kind, value)?);
    }
    Ok(out)
}

/// Resolve every `${..}` placeholder from collected parameter `values`
pub fn substitute_params(
    query: &str,
    values: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let mut out = query.to_string();
    for ph in param_placeholders(query) {
        let value = values
            .get(&ph.name)
            .ok_or_else(|| TemplateError::MissingValue(ph.name.clone()))?;
        out = out.replace(&ph.token, &escape(ph.kind, value)?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scope(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_scope_placeholder_extraction() {
        let phs = scope_placeholders("SELECT * FROM #{schema:id}.#{table:id} WHERE x = #{table:id}");
        assert_eq!(phs.len(), 2);
        assert_eq!(phs[0].name, "schema");
        assert_eq!(phs[0].kind, ValueKind::Ident);
        assert_eq!(phs[1].token, "#{table:id}");
    }

    #[test]
    fn test_param_placeholder_kinds() {
        let phs = param_placeholders("LIMIT ${limit:number} OFFSET ${skip}");
        assert_eq!(phs[0].kind, ValueKind::Number);
        assert_eq!(phs[1].kind, ValueKind::Raw);
        assert_eq!(phs[1].name, "skip");
    }

    #[test]
    fn test_escape_ident_quotes_and_splits() {
        assert_eq!(escape(ValueKind::Ident, "public.users").unwrap(), "\"public\".\"users\"");
        assert_eq!(escape(ValueKind::Ident, "we\"ird").unwrap(), "\"we\"\"ird\"");
    }

    #[test]
    fn test_escape_text_doubles_quotes() {
        assert_eq!(escape(ValueKind::Text, "O'Brien").unwrap(), "'O''Brien'");
    }

    #[test]
    fn test_escape_number_validates() {
        assert_eq!(escape(ValueKind::Number, " 100 ").unwrap(), "100");
        assert_eq!(escape(ValueKind::Number, "2.5").unwrap(), "2.5");
        assert!(matches!(
            escape(ValueKind::Number, "100; DROP TABLE x"),
            Err(TemplateError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_substitute_scope() {
        let q = "SELECT * FROM #{schema:id}.#{table:id} LIMIT 10";
        let s = scope(&[("schema", "public"), ("table", "users")]);
        assert_eq!(
            substitute_scope(q, &s).unwrap(),
            "SELECT * FROM \"public\".\"users\" LIMIT 10"
        );
    }

    #[test]
    fn test_substitute_scope_missing_value() {
        let s = scope(&[("schema", "public")]);
        assert!(matches!(
            substitute_scope("SELECT #{table:id}", &s),
            Err(TemplateError::MissingValue(name)) if name == "table"
        ));
    }

    #[test]
    fn test_substitute_params_leaves_scope_tokens() {
        let q = "SELECT * FROM t WHERE name = ${who:text}";
        let vals = scope(&[("who", "ann")]);
        assert_eq!(
            substitute_params(q, &vals).unwrap(),
            "SELECT * FROM t WHERE name = 'ann'"
        );
        // scope placeholders are a different family and untouched here
        assert_eq!(
            substitute_params("SELECT #{x}", &HashMap::new()).unwrap(),
            "SELECT #{x}"
        );
    }

    #[test]
    fn test_repeated_placeholder_substituted_everywhere() {
        let q = "SELECT ${n:number}, ${n:number}";
        let vals = scope(&[("n", "7")]);
        assert_eq!(substitute_params(q, &vals).unwrap(), "SELECT 7, 7");
    }
}
