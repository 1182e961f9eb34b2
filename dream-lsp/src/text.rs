//! Position math over document text.

use tower_lsp::lsp_types::Position;

pub fn offset_from_position(text: &str, pos: Position) -> usize {
    let mut line: u32 = 0;
    let mut col: u32 = 0;
    let mut i: usize = 0;

    for ch in text.chars() {
        if line > pos.line || (line == pos.line && col >= pos.character) {
            break;
        }

        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        i += ch.len_utf8();
    }

    i
}

pub fn position_from_offset(text: &str, offset: usize) -> Position {
    let mut line: u32 = 0;
    let mut col: u32 = 0;
    let mut i: usize = 0;

    for ch in text.chars() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 0;
        } else {
            col += 1;
        }
        i += ch.len_utf8();
    }

    Position {
        line,
        character: col,
    }
}

fn is_word_char(ch: char) -> bool {
    ch == '_' || ch == '.' || ch.is_ascii_alphanumeric()
}

/// The identifier under the cursor, spanning both directions from the
/// position. Dots are included so `Console.WriteLine` resolves as one word.
pub fn word_at_position(text: &str, pos: Position) -> String {
    let Some(line) = text.split('\n').nth(pos.line as usize) else {
        return String::new();
    };
    let line = line.trim_end_matches('\r');

    let chars: Vec<char> = line.chars().collect();
    let cursor = (pos.character as usize).min(chars.len());

    let mut start = cursor;
    while start > 0 && is_word_char(chars[start - 1]) {
        start -= 1;
    }
    let mut end = cursor;
    while end < chars.len() && is_word_char(chars[end]) {
        end += 1;
    }

    chars[start..end].iter().collect()
}

/// The partial identifier immediately left of the cursor, used to filter
/// completion candidates.
pub fn ident_prefix_at(text: &str, pos: Position) -> String {
    let Some(line) = text.split('\n').nth(pos.line as usize) else {
        return String::new();
    };
    let chars: Vec<char> = line.trim_end_matches('\r').chars().collect();
    let cursor = (pos.character as usize).min(chars.len());

    let mut start = cursor;
    while start > 0 && (chars[start - 1] == '_' || chars[start - 1].is_ascii_alphanumeric()) {
        start -= 1;
    }
    chars[start..cursor].iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "func main() {\n    Console.WriteLine(msg);\n}\n";

    fn at(line: u32, character: u32) -> Position {
        Position { line, character }
    }

    #[test]
    fn word_spans_both_directions() {
        // Cursor in the middle of "WriteLine".
        assert_eq!(word_at_position(TEXT, at(1, 15)), "Console.WriteLine");
        // Cursor inside "main".
        assert_eq!(word_at_position(TEXT, at(0, 7)), "main");
    }

    #[test]
    fn word_is_empty_outside_identifiers() {
        assert_eq!(word_at_position(TEXT, at(0, 12)), "");
        assert_eq!(word_at_position(TEXT, at(9, 0)), "");
    }

    #[test]
    fn prefix_stops_at_dot() {
        assert_eq!(ident_prefix_at(TEXT, at(1, 17)), "Write");
        assert_eq!(ident_prefix_at(TEXT, at(1, 4)), "");
    }

    #[test]
    fn offset_and_position_agree() {
        let off = offset_from_position(TEXT, at(1, 4));
        assert_eq!(&TEXT[off..off + 7], "Console");
        assert_eq!(position_from_offset(TEXT, off), at(1, 4));
    }

    #[test]
    fn position_past_end_clamps_to_text_end() {
        let off = offset_from_position(TEXT, at(99, 0));
        assert_eq!(off, TEXT.len());
    }
}
