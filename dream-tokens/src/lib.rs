#![forbid(unsafe_code)]

//! Canonical Dream token table.
//!
//! The token definitions here are the single source of truth for every
//! generated syntax artifact: the TextMate grammar used by the VSCode
//! extension and the JFlex lexer definition used by the JetBrains plugin
//! are both derived from this table. The table can also be loaded from a
//! `tokens.json` file so editor plugins and the generators stay in sync.

use std::fs;
use std::path::Path;

use miette::Diagnostic;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("token table error: {message}")]
#[diagnostic(code(dream::tokens))]
pub struct TokenTableError {
    pub message: String,
}

impl TokenTableError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// One row of the canonical token table.
///
/// `name` keys the generated JFlex rule (`DreamTokenTypes.<NAME>`), `regex`
/// is the match pattern shared by both grammars, and `scope` is the TextMate
/// scope assigned to the match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenDef {
    pub name: String,
    pub regex: String,
    pub scope: String,
}

impl TokenDef {
    fn new(name: &str, regex: &str, scope: &str) -> Self {
        Self {
            name: name.to_string(),
            regex: regex.to_string(),
            scope: scope.to_string(),
        }
    }
}

/// The embedded canonical table, in match-priority order: comments and
/// literals before keywords, keywords before bare identifiers.
pub fn canonical_tokens() -> Vec<TokenDef> {
    vec![
        TokenDef::new("line_comment", r"//[^\n]*", "comment.line.double-slash.dream"),
        TokenDef::new("block_comment", r"/\*[\s\S]*?\*/", "comment.block.dream"),
        TokenDef::new(
            "string",
            r#""(\\.|[^"\\])*""#,
            "string.quoted.double.dream",
        ),
        TokenDef::new("char", r"'(\\.|[^'\\])'", "string.quoted.single.dream"),
        TokenDef::new(
            "number",
            r"\b\d+(\.\d+)?\b",
            "constant.numeric.dream",
        ),
        TokenDef::new(
            "keyword_control",
            r"\b(if|else|while|do|for|switch|case|default|break|continue|return|try|catch|throw|finally)\b",
            "keyword.control.dream",
        ),
        TokenDef::new(
            "keyword_declaration",
            r"\b(func|class|struct|var|let|using|import|module|export|new|this|base|static|async|await)\b",
            "keyword.declaration.dream",
        ),
        TokenDef::new(
            "type",
            r"\b(int|float|bool|char|string|void|Task|TaskResult)\b",
            "storage.type.dream",
        ),
        TokenDef::new(
            "constant",
            r"\b(true|false|null)\b",
            "constant.language.dream",
        ),
        TokenDef::new(
            "operator",
            r"(\+\+|--|&&|\|\||==|!=|<=|>=|=>|[-+*/%=<>!&|^~?])",
            "keyword.operator.dream",
        ),
        TokenDef::new(
            "identifier",
            r"\b[A-Za-z_][A-Za-z0-9_]*\b",
            "variable.other.dream",
        ),
        TokenDef::new("punctuation", r"[{}()\[\];,.:]", "punctuation.dream"),
    ]
}

/// Keywords surfaced to completion, in the order the original plugin lists
/// them. Derived from the `keyword_*`, `type`, and `constant` table rows.
pub fn keywords() -> Vec<&'static str> {
    vec![
        "func", "int", "float", "bool", "char", "string", "void", "if", "else", "while", "do",
        "for", "switch", "case", "default", "break", "continue", "return", "try", "catch",
        "throw", "finally", "class", "struct", "new", "this", "base", "static", "async", "await",
        "var", "let", "using", "import", "module", "export", "Task", "TaskResult", "true",
        "false", "null",
    ]
}

/// Load a token table from a `tokens.json` file.
pub fn load_tokens(path: &Path) -> Result<Vec<TokenDef>, TokenTableError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| TokenTableError::new(format!("read {}: {e}", path.display())))?;
    let tokens: Vec<TokenDef> = serde_json::from_str(&raw)
        .map_err(|e| TokenTableError::new(format!("parse {}: {e}", path.display())))?;
    validate(&tokens)?;
    Ok(tokens)
}

/// Serialize a table the way `tokens.json` is written on disk.
pub fn to_json(tokens: &[TokenDef]) -> Result<String, TokenTableError> {
    serde_json::to_string_pretty(tokens)
        .map_err(|e| TokenTableError::new(format!("serialize token table: {e}")))
}

/// Reject tables the generators cannot consume: empty/duplicate names and
/// patterns that are not valid regular expressions.
pub fn validate(tokens: &[TokenDef]) -> Result<(), TokenTableError> {
    let mut seen: Vec<&str> = Vec::new();
    for t in tokens {
        if t.name.is_empty() {
            return Err(TokenTableError::new("token with empty name"));
        }
        if seen.contains(&t.name.as_str()) {
            return Err(TokenTableError::new(format!("duplicate token name: {}", t.name)));
        }
        seen.push(&t.name);
        if let Err(e) = Regex::new(&t.regex) {
            return Err(TokenTableError::new(format!(
                "token {}: invalid regex {:?}: {e}",
                t.name, t.regex
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_table_validates() {
        let tokens = canonical_tokens();
        validate(&tokens).unwrap();
        assert!(tokens.iter().any(|t| t.name == "keyword_control"));
    }

    #[test]
    fn keywords_cover_declaration_forms() {
        let kws = keywords();
        for kw in ["func", "var", "class", "struct"] {
            assert!(kws.contains(&kw), "missing {kw}");
        }
    }

    #[test]
    fn json_roundtrip_preserves_order() {
        let tokens = canonical_tokens();
        let json = to_json(&tokens).unwrap();
        let back: Vec<TokenDef> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tokens);
    }

    #[test]
    fn load_rejects_duplicate_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(
            &path,
            r#"[{"name":"a","regex":"x","scope":"s"},{"name":"a","regex":"y","scope":"s"}]"#,
        )
        .unwrap();
        let err = load_tokens(&path).unwrap_err();
        assert!(err.message.contains("duplicate token name"));
    }

    #[test]
    fn load_rejects_bad_regex() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tokens.json");
        fs::write(&path, r#"[{"name":"a","regex":"(","scope":"s"}]"#).unwrap();
        let err = load_tokens(&path).unwrap_err();
        assert!(err.message.contains("invalid regex"));
    }
}
