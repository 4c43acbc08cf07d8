//! Single-pass, direct-coded lexer.
//!
//! Rules are tried in a fixed priority order so that longer operators win
//! over their shorter prefixes (`**=` before `**` before `*`, `==` before
//! `=`). Identifier-shaped words are scanned whole and then classified
//! against the keyword table, so `iffy` is a single identifier.

use memchr::memchr;

use crate::token::{Token, TokenKind};

/// Operators in match priority order (longest first).
const OPERATORS: [(&str, TokenKind); 26] = [
    ("**=", TokenKind::PowerAssign),
    ("**", TokenKind::Power),
    ("+=", TokenKind::AddAssign),
    ("++", TokenKind::Increment),
    ("-=", TokenKind::SubtractAssign),
    ("--", TokenKind::Decrement),
    ("*=", TokenKind::MultiplyAssign),
    ("/=", TokenKind::DivideAssign),
    ("%=", TokenKind::ModuloAssign),
    ("==", TokenKind::Equals),
    ("!=", TokenKind::NotEquals),
    (">=", TokenKind::GreaterThanOrEqual),
    ("<=", TokenKind::LessThanOrEqual),
    ("&&", TokenKind::And),
    ("||", TokenKind::Or),
    ("+", TokenKind::Add),
    ("-", TokenKind::Subtract),
    ("*", TokenKind::Multiply),
    ("/", TokenKind::Divide),
    ("%", TokenKind::Modulo),
    (">", TokenKind::GreaterThan),
    ("<", TokenKind::LessThan),
    ("=", TokenKind::Assign),
    ("&", TokenKind::Ampersand),
    ("|", TokenKind::Pipe),
    ("!", TokenKind::Not),
];

const SEPARATORS: [(u8, TokenKind); 11] = [
    (b'(', TokenKind::OpenParen),
    (b')', TokenKind::CloseParen),
    (b'{', TokenKind::OpenBrace),
    (b'}', TokenKind::CloseBrace),
    (b'[', TokenKind::OpenBracket),
    (b']', TokenKind::CloseBracket),
    (b',', TokenKind::Comma),
    (b';', TokenKind::Semicolon),
    (b':', TokenKind::Colon),
    (b'.', TokenKind::Dot),
    (b'@', TokenKind::At),
];

/// Integer suffixes, two-digit widths first so `i16` wins over `i1` + `6`.
const INT_SUFFIXES: [&str; 8] = ["i16", "i32", "i64", "u16", "u32", "u64", "i8", "u8"];

/// Float suffixes, longest first.
const FLOAT_SUFFIXES: [&str; 4] = ["f128", "f64", "f32", "f"];

pub struct Lexer<'a> {
    source: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a str) -> Self {
        Self { source, pos: 0 }
    }

    /// Tokenize the entire source. Never fails; unmatched bytes become
    /// `Unknown` tokens.
    #[must_use]
    pub fn tokenize(mut self) -> Vec<Token> {
        let mut tokens = Vec::new();

        while self.pos < self.source.len() {
            let b = self.source.as_bytes()[self.pos];
            let next = self.source.as_bytes().get(self.pos + 1).copied();

            // Whitespace is consumed silently.
            if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
                self.pos += 1;
                continue;
            }

            // Comment tokens have top priority.
            if b == b'/' && next == Some(b'/') {
                let line_end = memchr(b'\n', &self.source.as_bytes()[self.pos..])
                    .map_or(self.source.len(), |off| self.pos + off);
                tokens.push(self.take(TokenKind::SingleLineComment, line_end - self.pos));
                continue;
            }
            if b == b'/' && next == Some(b'*') {
                tokens.push(self.take(TokenKind::MultiLineCommentStart, 2));
                continue;
            }
            if b == b'*' && next == Some(b'/') {
                tokens.push(self.take(TokenKind::MultiLineCommentEnd, 2));
                continue;
            }

            if let Some(kind) = SEPARATORS
                .iter()
                .find(|(sep, _)| *sep == b)
                .map(|(_, kind)| *kind)
            {
                tokens.push(self.take(kind, 1));
                continue;
            }

            if let Some((kind, len)) = self.match_operator() {
                tokens.push(self.take(kind, len));
                continue;
            }

            if b.is_ascii_digit() {
                tokens.push(self.scan_number());
                continue;
            }

            // String literals, including the optional r/f/b prefix flags.
            if b == b'"' || matches!(b, b'r' | b'f' | b'b') {
                if let Some(len) = self.match_string_literal() {
                    tokens.push(self.take(TokenKind::StringLiteral, len));
                    continue;
                }
                if b == b'"' {
                    // Unterminated string: the quote itself is unknown and
                    // lexing continues after it.
                    tokens.push(self.take(TokenKind::Unknown, 1));
                    continue;
                }
            }

            if b == b'_' || b.is_ascii_alphabetic() {
                tokens.push(self.scan_word());
                continue;
            }

            // No rule matched: one Unknown token per character.
            let ch_len = self.source[self.pos..]
                .chars()
                .next()
                .map_or(1, char::len_utf8);
            tokens.push(self.take(TokenKind::Unknown, ch_len));
        }

        tokens
    }

    fn take(&mut self, kind: TokenKind, len: usize) -> Token {
        let start = self.pos;
        self.pos += len;
        Token::new(kind, &self.source[start..self.pos], start as u32)
    }

    fn match_operator(&self) -> Option<(TokenKind, usize)> {
        let rest = &self.source[self.pos..];
        OPERATORS
            .iter()
            .find(|(text, _)| rest.starts_with(text))
            .map(|(text, kind)| (*kind, text.len()))
    }

    /// Match a string literal at the cursor: up to three distinct prefix
    /// flags from `{r, f, b}`, then a double-quoted body with backslash
    /// escapes. Returns the total length, or `None` if this is not a
    /// (terminated) string literal.
    fn match_string_literal(&self) -> Option<usize> {
        let bytes = self.source.as_bytes();
        let mut cursor = self.pos;
        let mut seen = [false; 3];

        while cursor - self.pos < 3 {
            let slot = match bytes.get(cursor) {
                Some(b'r') => 0,
                Some(b'f') => 1,
                Some(b'b') => 2,
                _ => break,
            };
            if seen[slot] {
                return None;
            }
            seen[slot] = true;
            cursor += 1;
        }

        if bytes.get(cursor) != Some(&b'"') {
            return None;
        }
        cursor += 1;

        while cursor < bytes.len() {
            match bytes[cursor] {
                b'\\' => cursor += 2,
                b'"' => return Some(cursor + 1 - self.pos),
                _ => cursor += 1,
            }
        }
        None
    }

    /// Scan an integer or float literal with an optional width suffix.
    /// A literal with a decimal point and an `f*` suffix is a `FloatLiteral`;
    /// a bare decimal is a `DoubleLiteral` (the language default double).
    fn scan_number(&mut self) -> Token {
        let bytes = self.source.as_bytes();
        let mut cursor = self.pos;

        while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
            cursor += 1;
        }

        let has_fraction = bytes.get(cursor) == Some(&b'.')
            && bytes.get(cursor + 1).is_some_and(u8::is_ascii_digit);
        if has_fraction {
            cursor += 1;
            while bytes.get(cursor).is_some_and(u8::is_ascii_digit) {
                cursor += 1;
            }
            let rest = &self.source[cursor..];
            for suffix in FLOAT_SUFFIXES {
                if rest.starts_with(suffix) && !is_word_byte(bytes.get(cursor + suffix.len())) {
                    return self.take(TokenKind::FloatLiteral, cursor + suffix.len() - self.pos);
                }
            }
            return self.take(TokenKind::DoubleLiteral, cursor - self.pos);
        }

        let rest = &self.source[cursor..];
        for suffix in INT_SUFFIXES {
            if rest.starts_with(suffix) && !is_word_byte(bytes.get(cursor + suffix.len())) {
                return self.take(TokenKind::IntegerLiteral, cursor + suffix.len() - self.pos);
            }
        }
        self.take(TokenKind::IntegerLiteral, cursor - self.pos)
    }

    fn scan_word(&mut self) -> Token {
        let bytes = self.source.as_bytes();
        let mut cursor = self.pos;
        while is_word_byte(bytes.get(cursor)) {
            cursor += 1;
        }
        let kind = TokenKind::classify_word(&self.source[self.pos..cursor]);
        self.take(kind, cursor - self.pos)
    }
}

fn is_word_byte(b: Option<&u8>) -> bool {
    b.is_some_and(|b| *b == b'_' || b.is_ascii_alphanumeric())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source).tokenize().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn longest_operator_wins() {
        assert_eq!(
            kinds("**= ** * += ++ + == ="),
            vec![
                TokenKind::PowerAssign,
                TokenKind::Power,
                TokenKind::Multiply,
                TokenKind::AddAssign,
                TokenKind::Increment,
                TokenKind::Add,
                TokenKind::Equals,
                TokenKind::Assign,
            ]
        );
    }

    #[test]
    fn keyword_prefixed_word_is_one_identifier() {
        let tokens = Lexer::new("iffy if").tokenize();
        assert_eq!(tokens[0].kind, TokenKind::Identifier);
        assert_eq!(tokens[0].lexeme, "iffy");
        assert_eq!(tokens[1].kind, TokenKind::If);
    }

    #[test]
    fn numeric_suffixes_select_literal_kind() {
        assert_eq!(kinds("1 2i64 3u8"), vec![TokenKind::IntegerLiteral; 3]);
        assert_eq!(
            kinds("1.5 1.5f 1.5f64 1.5f128"),
            vec![
                TokenKind::DoubleLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
                TokenKind::FloatLiteral,
            ]
        );
    }
}
