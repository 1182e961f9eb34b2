//! Reconstruction of positioned diagnostics from compiler stderr.
//!
//! The compiler reports `<line>:<col>: (error|warning): <message>` with
//! 1-based coordinates, optionally followed within a small window by a
//! `help:` hint line and a `~~~~` underline marking the offending span.
//! Lines that do not match the grammar are skipped; two report lines for
//! the same document line produce two independent diagnostics.

use std::sync::OnceLock;

use regex::Regex;
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range};

/// Source label on diagnostics parsed from compiler output.
pub const SOURCE_COMPILER: &str = "DreamCompiler";
/// Source label on diagnostics synthesized by the server itself.
pub const SOURCE_SERVER: &str = "DreamLSP";

const HINT_GLYPH: &str = "\u{1f4a1}";

fn report_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+):(\d+): (error|warning): (.*)").expect("regex compile"))
}

fn hint_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"help: (.*)").expect("regex compile"))
}

/// Parse compiler stderr into diagnostics positioned within `doc_text`.
pub fn parse_diagnostics(stderr: &str, doc_text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    if stderr.is_empty() {
        return diagnostics;
    }

    let lines: Vec<&str> = stderr.split('\n').map(|l| l.trim_end_matches('\r')).collect();
    let doc_lines: Vec<&str> = doc_text.split('\n').map(|l| l.trim_end_matches('\r')).collect();

    for (i, raw) in lines.iter().enumerate() {
        let Some(caps) = report_pattern().captures(raw.trim()) else {
            continue;
        };

        let line_1based: u32 = caps[1].parse().unwrap_or(0);
        let col_1based: u32 = caps[2].parse().unwrap_or(0);
        let severity = if &caps[3] == "error" {
            DiagnosticSeverity::ERROR
        } else {
            DiagnosticSeverity::WARNING
        };
        let mut message = caps[4].to_string();

        // Hint lines trail the report by exactly three lines.
        if i + 3 < lines.len() {
            if let Some(hint) = hint_pattern().captures(lines[i + 3]) {
                message.push_str(&format!("\n{HINT_GLYPH} {}", &hint[1]));
            }
        }

        let start_line = line_1based.saturating_sub(1);
        let start_char = col_1based.saturating_sub(1);
        let mut end_char = start_char + 1;

        // A `~` underline two lines below the report marks the token span.
        if i + 2 < lines.len() && lines[i + 2].contains('~') {
            let span_line = lines[i + 2];
            let first = span_line.find('~');
            let last = span_line.rfind('~');
            if let (Some(first), Some(last)) = (first, last) {
                if last > first {
                    end_char = start_char + (last - first) as u32 + 1;
                }
            }
        }

        // Clamp to the physical line; out-of-bounds line numbers skip this.
        if let Some(doc_line) = doc_lines.get(start_line as usize) {
            end_char = end_char.min(doc_line.chars().count() as u32);
        }

        diagnostics.push(Diagnostic {
            range: Range {
                start: Position {
                    line: start_line,
                    character: start_char,
                },
                end: Position {
                    line: start_line,
                    character: end_char,
                },
            },
            severity: Some(severity),
            code: None,
            code_description: None,
            source: Some(SOURCE_COMPILER.to_string()),
            message,
            related_information: None,
            tags: None,
            data: None,
        });
    }

    diagnostics
}

/// The soft-failure diagnostic: one Error at the top of the document
/// carrying the invocation failure reason. Analysis continues on the next
/// edit as if nothing happened.
pub fn invocation_failure(message: impl Into<String>) -> Diagnostic {
    Diagnostic {
        range: Range {
            start: Position { line: 0, character: 0 },
            end: Position { line: 0, character: 0 },
        },
        severity: Some(DiagnosticSeverity::ERROR),
        code: None,
        code_description: None,
        source: Some(SOURCE_SERVER.to_string()),
        message: message.into(),
        related_information: None,
        tags: None,
        data: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "func main() {\n    let x = ;\n    let yy = 1;\n}\n";

    #[test]
    fn error_line_maps_to_zero_based_start() {
        let diags = parse_diagnostics("2:9: error: Expected expression", DOC);
        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(d.range.start, Position { line: 1, character: 8 });
        assert_eq!(d.range.end, Position { line: 1, character: 9 });
        assert_eq!(d.source.as_deref(), Some(SOURCE_COMPILER));
    }

    #[test]
    fn warning_maps_to_warning_severity() {
        let diags = parse_diagnostics("3:5: warning: unused variable 'yy'", DOC);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Some(DiagnosticSeverity::WARNING));
    }

    #[test]
    fn hint_three_lines_later_is_appended() {
        let stderr = "2:9: error: Expected expression\n    let x = ;\n        ~~~~\nhelp: Add a value after '='\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags.len(), 1);
        let msg = &diags[0].message;
        assert!(msg.starts_with("Expected expression\n"));
        assert!(msg.contains("Add a value after '='"));
    }

    #[test]
    fn tilde_span_two_lines_later_extends_end_column() {
        let stderr = "3:5: warning: unused variable 'yy'\n    let yy = 1;\n    ~~\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags.len(), 1);
        // span length 2: end = start + (1 - 0) + 1
        assert_eq!(diags[0].range.start.character, 4);
        assert_eq!(diags[0].range.end.character, 6);
    }

    #[test]
    fn single_tilde_keeps_one_character_span() {
        let stderr = "2:9: error: Expected expression\n    let x = ;\n        ~\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags[0].range.end.character, 9);
    }

    #[test]
    fn end_column_is_clamped_to_line_length() {
        let stderr = "2:9: error: Expected expression\nx\n~~~~~~~~~~~~~~~~~~~~~~~~~~~~~~\n";
        let diags = parse_diagnostics(stderr, DOC);
        // line 1 of DOC is "    let x = ;" (13 chars)
        assert_eq!(diags[0].range.end.character, 13);
    }

    #[test]
    fn out_of_bounds_line_skips_clamping() {
        let stderr = "40:3: error: boom\nx\n~~~~~~~~\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags[0].range.start.line, 39);
        assert_eq!(diags[0].range.end.character, 2 + 8);
    }

    #[test]
    fn malformed_lines_are_skipped() {
        let stderr = "note: something odd\nnot a diagnostic\n2:9: error: real one\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].message, "real one");
    }

    #[test]
    fn empty_stderr_yields_no_diagnostics() {
        assert!(parse_diagnostics("", DOC).is_empty());
    }

    #[test]
    fn two_reports_for_one_document_line_stay_independent() {
        let stderr = "2:5: error: first\n2:9: error: second\n";
        let diags = parse_diagnostics(stderr, DOC);
        assert_eq!(diags.len(), 2);
        assert_eq!(diags[0].message, "first");
        assert_eq!(diags[1].message, "second");
        assert_eq!(diags[0].range.start.line, diags[1].range.start.line);
    }

    #[test]
    fn caret_marker_report_with_hint_yields_one_error() {
        let doc = "line one\nline two\nline three\nline four\nfunc f() {\n    let x = ;\n}\n";
        let stderr = "5:10: error: Expected expression\n     let x = ;\n            ^\nhelp: Add a value after '='";
        let diags = parse_diagnostics(stderr, doc);
        assert_eq!(diags.len(), 1);
        let d = &diags[0];
        assert_eq!(d.severity, Some(DiagnosticSeverity::ERROR));
        assert!(d.message.contains("Expected expression"));
        assert!(d.message.contains("Add a value after '='"));
    }

    #[test]
    fn invocation_failure_sits_at_document_start() {
        let d = invocation_failure("parse executable not found");
        assert_eq!(d.range.start, Position { line: 0, character: 0 });
        assert_eq!(d.range.end, Position { line: 0, character: 0 });
        assert_eq!(d.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(d.source.as_deref(), Some(SOURCE_SERVER));
    }
}
