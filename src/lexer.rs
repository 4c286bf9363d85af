//! Tokenizer for C-family sources.
//!
//! The rewriter only needs token boundaries, so this is a lexer in the
//! loosest sense: no preprocessing, no keyword table, no literal decoding.

use thiserror::Error;
use tracing::warn;

use crate::file::FileBuffer;
use crate::position::{Position, Span};
use crate::token::{Token, TokenKind};

#[derive(Debug, Error)]
pub enum LexError {
    #[error("{file}: unterminated block comment starting at {position}")]
    UnterminatedComment { file: String, position: Position },
}

/// Produces the token stream for a file
pub trait Lexer: Send + Sync {
    fn tokenize(&self, buffer: &FileBuffer) -> Result<Vec<Token>, LexError>;
}

/// Punctuators longer than one character, longest first.
///
/// `>>` is deliberately absent so nested template argument lists close one
/// `>` at a time.
const PUNCTUATORS: &[&str] = &[
    "...", "->", "::", "++", "--", "==", "!=", "<=", ">=", "&&", "||", "+=", "-=", "*=", "/=",
    "%=", "&=", "|=", "^=", "<<",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CppLexer;

impl CppLexer {
    pub fn new() -> Self {
        Self
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || !c.is_ascii()
}

impl Lexer for CppLexer {
    fn tokenize(&self, buffer: &FileBuffer) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        let mut open_comment: Option<Position> = None;

        for (line_number, line) in buffer.lines().iter().enumerate() {
            let chars: Vec<(usize, char)> = line.char_indices().collect();
            let at = |i: usize| chars.get(i).map(|&(_, c)| c);
            let mut i = 0;

            while i < chars.len() {
                if open_comment.is_some() {
                    if at(i) == Some('*') && at(i + 1) == Some('/') {
                        open_comment = None;
                        i += 2;
                    } else {
                        i += 1;
                    }
                    continue;
                }

                let c = chars[i].1;
                let start = i;

                if c.is_whitespace() {
                    i += 1;
                    continue;
                }
                if c == '/' && at(i + 1) == Some('/') {
                    break;
                }
                if c == '/' && at(i + 1) == Some('*') {
                    open_comment = Some(Position::new(line_number, chars[i].0));
                    i += 2;
                    continue;
                }

                let kind = if is_ident_char(c) && !c.is_ascii_digit() {
                    while at(i).is_some_and(is_ident_char) {
                        i += 1;
                    }
                    TokenKind::Identifier
                } else if c.is_ascii_digit() || (c == '.' && at(i + 1).is_some_and(|n| n.is_ascii_digit())) {
                    while at(i).is_some_and(|n| is_ident_char(n) || n == '.' || n == '\'') {
                        i += 1;
                    }
                    TokenKind::Number
                } else if c == '"' || c == '\'' {
                    i += 1;
                    let mut closed = false;
                    while let Some(n) = at(i) {
                        i += 1;
                        if n == '\\' {
                            i += 1;
                        } else if n == c {
                            closed = true;
                            break;
                        }
                    }
                    i = i.min(chars.len());
                    if !closed {
                        warn!(file = %buffer.id, line = line_number, "unterminated literal");
                    }
                    // User-defined literal suffix, e.g. "text"sv
                    while at(i).is_some_and(is_ident_char) {
                        i += 1;
                    }
                    if c == '"' {
                        TokenKind::StringLiteral
                    } else {
                        TokenKind::CharLiteral
                    }
                } else {
                    let rest = &line[chars[i].0..];
                    let width = PUNCTUATORS
                        .iter()
                        .find(|p| rest.starts_with(*p))
                        .map_or(1, |p| p.len());
                    i += width;
                    TokenKind::Punctuation
                };

                let span = Span::new(
                    Position::new(line_number, chars[start].0),
                    Position::new(line_number, chars[i - 1].0),
                );
                tokens.push(Token::new(kind, span));
            }
        }

        match open_comment {
            Some(position) => Err(LexError::UnterminatedComment {
                file: buffer.id.clone(),
                position,
            }),
            None => Ok(tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::token::TokenIndex;

    fn lex(text: &str) -> TokenIndex {
        let buffer = Arc::new(FileBuffer::from_text("lex.cpp", text));
        let tokens = CppLexer::new().tokenize(&buffer).unwrap();
        TokenIndex::new(buffer, tokens)
    }

    fn texts(index: &TokenIndex) -> Vec<String> {
        (0..index.len()).map(|i| index.text_of(i)).collect()
    }

    #[test]
    fn test_member_access_tokens() {
        let index = lex("m_tokens->append(sb.to_byte_string());");

        assert_eq!(
            texts(&index),
            vec!["m_tokens", "->", "append", "(", "sb", ".", "to_byte_string", "(", ")", ")", ";"]
        );
        assert_eq!(index.token(1).unwrap().kind, TokenKind::Punctuation);
    }

    #[test]
    fn test_templates_close_one_bracket_at_a_time() {
        let index = lex("Vector<Vector<int>> rows;");

        assert_eq!(texts(&index), vec!["Vector", "<", "Vector", "<", "int", ">", ">", "rows", ";"]);
    }

    #[test]
    fn test_literals_with_suffix_and_escapes() {
        let index = lex(r#"auto s = "a\"b"sv; char c = '\'';"#);

        assert_eq!(index.text_of(3), r#""a\"b"sv"#);
        assert_eq!(index.token(3).unwrap().kind, TokenKind::StringLiteral);
        assert_eq!(index.text_of(8), r"'\''");
        assert_eq!(index.token(8).unwrap().kind, TokenKind::CharLiteral);
    }

    #[test]
    fn test_numbers() {
        let index = lex("x = 1'000 + 0x1F + .5f;");

        assert_eq!(texts(&index), vec!["x", "=", "1'000", "+", "0x1F", "+", ".5f", ";"]);
        assert_eq!(index.token(2).unwrap().kind, TokenKind::Number);
    }

    #[test]
    fn test_comments_are_skipped() {
        let index = lex("a /* b\n c */ d // e\nf");

        assert_eq!(texts(&index), vec!["a", "d", "f"]);
        assert_eq!(index.token(1).unwrap().span.start, Position::new(1, 6));
        assert_eq!(index.text_between(0, 1), " /* b\n c */ ");
    }

    #[test]
    fn test_unterminated_comment_is_reported() {
        let buffer = FileBuffer::from_text("bad.h", "int x; /* never\nclosed");

        match CppLexer::new().tokenize(&buffer) {
            Err(LexError::UnterminatedComment { file, position }) => {
                assert_eq!(file, "bad.h");
                assert_eq!(position, Position::new(0, 7));
            }
            other => panic!("Expected LexError::UnterminatedComment, got {:?}", other),
        }
    }

    #[test]
    fn test_spans_use_byte_columns() {
        let index = lex("\u{e9}t\u{e9} x");

        // "été" is 5 bytes; the last character starts at byte 3
        assert_eq!(index.token(0).unwrap().span.end, Position::new(0, 3));
        assert_eq!(index.text_of(0), "\u{e9}t\u{e9}");
        assert_eq!(index.token(1).unwrap().span.start, Position::new(0, 6));
    }
}
