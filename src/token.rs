use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::file::FileBuffer;
use crate::position::{Position, Span, char_end};

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    Identifier,
    Number,
    StringLiteral,
    CharLiteral,
    Punctuation,
}

/// A lexical unit and the span of source text it covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// The ordered tokens of one file, with lookup by covered position
///
/// Tokens are ordered by position and never overlap. The index shares the
/// file's text so token text can be rebuilt from the original lines.
#[derive(Debug, Clone)]
pub struct TokenIndex {
    buffer: Arc<FileBuffer>,
    tokens: Vec<Token>,
}

impl TokenIndex {
    pub fn new(buffer: Arc<FileBuffer>, tokens: Vec<Token>) -> Self {
        Self { buffer, tokens }
    }

    pub fn file(&self) -> &str {
        &self.buffer.id
    }

    pub fn buffer(&self) -> &FileBuffer {
        &self.buffer
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Index of the token whose span contains `position`
    ///
    /// Returns `None` when the position sits in whitespace or a comment.
    /// If a degenerate span makes several tokens match, the first wins.
    pub fn token_at(&self, position: Position) -> Option<usize> {
        let candidate = self.tokens.partition_point(|t| t.span.end < position);
        self.tokens
            .get(candidate)
            .filter(|t| t.span.contains(position))
            .map(|_| candidate)
    }

    /// Literal text of a token, multi-line spans joined with `\n`
    pub fn text_of(&self, index: usize) -> String {
        match self.tokens.get(index) {
            Some(token) => {
                let end = token.span.end;
                let end_line = self.buffer.line(end.line).unwrap_or("");
                self.slice(token.span.start, Position::new(end.line, char_end(end_line, end.column)))
            }
            None => String::new(),
        }
    }

    /// Whether the token at `index` is exactly `text`
    pub fn is_text(&self, index: usize, text: &str) -> bool {
        self.tokens.get(index).is_some() && self.text_of(index) == text
    }

    /// Literal gap between two tokens (whitespace, newlines, comments)
    ///
    /// Empty when the tokens are adjacent or `b` does not follow `a`.
    pub fn text_between(&self, a: usize, b: usize) -> String {
        let (Some(first), Some(second)) = (self.tokens.get(a), self.tokens.get(b)) else {
            return String::new();
        };
        let end = first.span.end;
        let end_line = self.buffer.line(end.line).unwrap_or("");
        let from = Position::new(end.line, char_end(end_line, end.column));
        if from > second.span.start {
            return String::new();
        }
        self.slice(from, second.span.start)
    }

    /// Text from `from` up to (not including) `to`
    fn slice(&self, from: Position, to: Position) -> String {
        let line_text = |n: usize| self.buffer.line(n).unwrap_or("");

        if from.line == to.line {
            return line_text(from.line)
                .get(from.column..to.column)
                .unwrap_or("")
                .to_string();
        }

        let mut parts = Vec::with_capacity(to.line - from.line + 1);
        parts.push(line_text(from.line).get(from.column..).unwrap_or(""));
        for n in from.line + 1..to.line {
            parts.push(line_text(n));
        }
        parts.push(line_text(to.line).get(..to.column).unwrap_or(""));
        parts.join("\n")
    }
}
