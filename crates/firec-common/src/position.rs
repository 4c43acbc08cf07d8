//! Byte offset to line/column conversion for diagnostics.
//!
//! The lexer records byte offsets only; diagnostics surface 1-indexed lines
//! and 0-indexed columns, matching what the presentation layer prints as
//! `file:line:column`.

use serde::{Deserialize, Serialize};

/// A resolved source position (1-indexed line, 0-indexed column).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: u32,
    pub column: u32,
}

impl SourcePosition {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Convert a byte offset into a `SourcePosition` by walking the source.
///
/// Offsets past the end of the source resolve to the final position. A `\n`
/// terminates a line; the character after it is column 0 of the next line.
#[must_use]
pub fn line_column_at(source: &str, offset: u32) -> SourcePosition {
    let offset = offset as usize;
    let mut line = 1u32;
    let mut column = 0u32;

    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 0;
        } else {
            column += 1;
        }
    }

    SourcePosition { line, column }
}

/// Get the text of a 1-indexed line, without its trailing newline.
#[must_use]
pub fn source_line(source: &str, line: u32) -> &str {
    source
        .lines()
        .nth(line.saturating_sub(1) as usize)
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_map_to_lines_and_columns() {
        let src = "abc\ndef\nghi";
        assert_eq!(line_column_at(src, 0), SourcePosition::new(1, 0));
        assert_eq!(line_column_at(src, 2), SourcePosition::new(1, 2));
        assert_eq!(line_column_at(src, 4), SourcePosition::new(2, 0));
        assert_eq!(line_column_at(src, 9), SourcePosition::new(3, 1));
    }

    #[test]
    fn offset_past_end_resolves_to_last_position() {
        let src = "ab\ncd";
        assert_eq!(line_column_at(src, 999), SourcePosition::new(2, 2));
    }

    #[test]
    fn source_line_fetches_by_one_indexed_line() {
        let src = "first\nsecond\nthird";
        assert_eq!(source_line(src, 1), "first");
        assert_eq!(source_line(src, 2), "second");
        assert_eq!(source_line(src, 4), "");
    }
}
