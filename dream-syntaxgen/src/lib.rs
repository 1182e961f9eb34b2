#![forbid(unsafe_code)]

//! Syntax-artifact generators for the Dream editor plugins.
//!
//! Both outputs are derived from the canonical token table so the VSCode
//! TextMate grammar and the JetBrains JFlex lexer can never drift apart:
//! regenerating is the only supported way to change either file.

use std::fs;
use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde_json::json;
use thiserror::Error;

use dream_tokens::TokenDef;

const TM_SCHEMA: &str = "https://raw.githubusercontent.com/microsoft/vscode/master/extensions/theme-defaults/test/colorize-fixtures/TMGrammarSchema.json";

#[derive(Debug, Error, Diagnostic)]
#[error("syntaxgen error: {message}")]
#[diagnostic(code(dream::syntaxgen))]
pub struct SyntaxGenError {
    pub message: String,
}

impl SyntaxGenError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Build the TextMate grammar JSON for `source.dream`.
pub fn textmate_grammar(tokens: &[TokenDef]) -> serde_json::Value {
    let patterns: Vec<serde_json::Value> = tokens
        .iter()
        .map(|t| json!({ "name": t.scope, "match": t.regex }))
        .collect();

    json!({
        "$schema": TM_SCHEMA,
        "scopeName": "source.dream",
        "patterns": [{ "include": "#tokens" }],
        "repository": {
            "tokens": { "patterns": patterns }
        }
    })
}

/// Escape a token regex for embedding in a JFlex rule.
fn escape_flex(regex: &str) -> String {
    regex.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Build the JFlex lexer definition consumed by the JetBrains plugin.
///
/// Rules appear in table order; a token whose pattern opens a block comment
/// is emitted as a quoted literal because JFlex treats a bare leading `/`
/// as the start of an expression.
pub fn jflex_lexer(tokens: &[TokenDef]) -> String {
    let mut out = String::from(
        "package com.dream;\n\n%%\n%public\n%class DreamLexer\n%implements com.intellij.lexer.FlexLexer\n%unicode\n%function advance\n%type com.intellij.psi.tree.IElementType\n\n%%\n<YYINITIAL> {\n",
    );

    for t in tokens {
        let escaped = escape_flex(&t.regex);
        let pattern = if t.regex.starts_with("/\\*") {
            format!("\"{escaped}\"")
        } else {
            escaped
        };
        out.push_str(&format!(
            "  {pattern} {{ return DreamTokenTypes.{}; }}\n",
            t.name.to_uppercase()
        ));
    }

    out.push_str("  [\\t\\r\\n ]+ { return com.intellij.psi.TokenType.WHITE_SPACE; }\n");
    out.push_str("  . { return com.intellij.psi.TokenType.BAD_CHARACTER; }\n}\n");
    out
}

/// Paths written by [`write_artifacts`], relative to the output root.
#[derive(Clone, Debug)]
pub struct GeneratedPaths {
    pub textmate: PathBuf,
    pub jflex: PathBuf,
    pub tokens_mirror: PathBuf,
}

fn write_file(path: &Path, contents: &str) -> Result<(), SyntaxGenError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| SyntaxGenError::new(format!("create {}: {e}", parent.display())))?;
    }
    fs::write(path, contents)
        .map_err(|e| SyntaxGenError::new(format!("write {}: {e}", path.display())))
}

/// Generate all syntax artifacts under `root`: the TextMate grammar for the
/// VSCode extension, the JFlex definition for the JetBrains plugin, and a
/// mirrored `tokens.json` in the plugin resources.
pub fn write_artifacts(root: &Path, tokens: &[TokenDef]) -> Result<GeneratedPaths, SyntaxGenError> {
    let paths = GeneratedPaths {
        textmate: root.join("vscode/syntaxes/dream.tmLanguage.json"),
        jflex: root.join("idea/src/main/java/com/dream/DreamLexer.flex"),
        tokens_mirror: root.join("idea/src/main/resources/tokens.json"),
    };

    let grammar = serde_json::to_string_pretty(&textmate_grammar(tokens))
        .map_err(|e| SyntaxGenError::new(format!("serialize grammar: {e}")))?;
    write_file(&paths.textmate, &grammar)?;

    write_file(&paths.jflex, &jflex_lexer(tokens))?;

    let mirror = dream_tokens::to_json(tokens)
        .map_err(|e| SyntaxGenError::new(e.message))?;
    write_file(&paths.tokens_mirror, &mirror)?;

    Ok(paths)
}
