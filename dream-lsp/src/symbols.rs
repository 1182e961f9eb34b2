//! Symbol information sourced from the compiler's `--symbols` output.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{CompletionItemKind, Position, Range, SymbolKind};

/// One declared name in a document. `line`/`character` are already 0-based
/// in the compiler's JSON. Rebuilt wholesale on every analysis pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SymbolInfo {
    pub name: String,
    pub line: u32,
    pub character: u32,
    pub kind: SymbolInfoKind,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SymbolInfoKind {
    Func,
    Var,
    Class,
    Struct,
}

impl SymbolInfoKind {
    pub fn label(self) -> &'static str {
        match self {
            SymbolInfoKind::Func => "func",
            SymbolInfoKind::Var => "var",
            SymbolInfoKind::Class => "class",
            SymbolInfoKind::Struct => "struct",
        }
    }

    pub fn completion_kind(self) -> CompletionItemKind {
        match self {
            SymbolInfoKind::Func => CompletionItemKind::FUNCTION,
            SymbolInfoKind::Class => CompletionItemKind::CLASS,
            SymbolInfoKind::Struct => CompletionItemKind::STRUCT,
            SymbolInfoKind::Var => CompletionItemKind::VARIABLE,
        }
    }

    pub fn symbol_kind(self) -> SymbolKind {
        match self {
            SymbolInfoKind::Func => SymbolKind::FUNCTION,
            SymbolInfoKind::Class => SymbolKind::CLASS,
            SymbolInfoKind::Struct => SymbolKind::STRUCT,
            SymbolInfoKind::Var => SymbolKind::VARIABLE,
        }
    }
}

impl SymbolInfo {
    /// Selection range covering the declared name.
    pub fn range(&self) -> Range {
        Range {
            start: Position {
                line: self.line,
                character: self.character,
            },
            end: Position {
                line: self.line,
                character: self.character + self.name.chars().count() as u32,
            },
        }
    }
}

/// Parse the `--symbols` stdout. Bad JSON degrades to an empty list for
/// this pass; the compiler's diagnostics still go through.
pub fn parse_symbols_json(stdout: &str) -> Vec<SymbolInfo> {
    serde_json::from_str(stdout).unwrap_or_default()
}

fn decl_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*(func|var|class|struct)\s+([A-Za-z_][A-Za-z0-9_]*)")
            .expect("regex compile")
    })
}

/// Fallback used when the compiler produced no usable symbol JSON: a naive
/// per-line scan for declaration keywords. No scoping, no types.
pub fn scan_symbols(text: &str) -> Vec<SymbolInfo> {
    let mut out = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let Some(caps) = decl_pattern().captures(line) else {
            continue;
        };
        let kind = match &caps[1] {
            "func" => SymbolInfoKind::Func,
            "class" => SymbolInfoKind::Class,
            "struct" => SymbolInfoKind::Struct,
            _ => SymbolInfoKind::Var,
        };
        let name_match = caps.get(2).expect("name group");
        out.push(SymbolInfo {
            name: name_match.as_str().to_string(),
            line: line_no as u32,
            character: line[..name_match.start()].chars().count() as u32,
            kind,
            ty: None,
            detail: None,
        });
    }
    out
}
