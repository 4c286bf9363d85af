use serde::{Deserialize, Serialize};

/// Position in a source file (line and column numbers)
///
/// Ordering compares the line first, then the column, which is exactly the
/// order tokens appear in a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (0-indexed)
    pub line: usize,
    /// Column number (0-indexed, in bytes)
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Extent of a token in a source file
///
/// Both endpoints are inclusive: `end` is the position of the last character,
/// not one past it. A span may cover several lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    /// Position of the first character
    pub start: Position,
    /// Position of the last character
    pub end: Position,
}

impl Span {
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Check whether `position` falls inside this span, endpoints included
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Whether the span starts and ends on the same line
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }
}

/// Byte offset just past the character starting at `column` in `line`
///
/// Inclusive span ends point at the first byte of the last character, so
/// slicing needs the width of that character. Columns past the end of the
/// line are returned unchanged.
pub fn char_end(line: &str, column: usize) -> usize {
    line.get(column..)
        .and_then(|rest| rest.chars().next())
        .map_or(column, |c| column + c.len_utf8())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ordering_line_first() {
        let earlier = Position::new(1, 40);
        let later = Position::new(2, 0);

        assert!(earlier < later);
        assert!(Position::new(2, 3) < Position::new(2, 4));
    }

    #[test]
    fn test_span_contains_endpoints() {
        let span = Span::new(Position::new(0, 4), Position::new(0, 9));

        assert!(span.contains(Position::new(0, 4)));
        assert!(span.contains(Position::new(0, 9)));
        assert!(!span.contains(Position::new(0, 3)));
        assert!(!span.contains(Position::new(0, 10)));
    }

    #[test]
    fn test_span_contains_multiline() {
        // Block spanning lines 1..=3
        let span = Span::new(Position::new(1, 10), Position::new(3, 2));

        assert!(span.contains(Position::new(2, 0)));
        assert!(span.contains(Position::new(1, 80)));
        assert!(!span.contains(Position::new(3, 3)));
        assert!(!span.is_single_line());
    }

    #[test]
    fn test_char_end_multibyte() {
        let line = "a\u{e9}b";

        assert_eq!(char_end(line, 0), 1);
        // 'é' is two bytes wide
        assert_eq!(char_end(line, 1), 3);
        assert_eq!(char_end(line, 10), 10);
    }
}
