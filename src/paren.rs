use tracing::debug;

use crate::position::Position;
use crate::token::TokenIndex;

/// A balanced parenthesized argument list found after a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalancedSpan {
    /// Token index of the opening `(`
    pub open: usize,
    /// Token index of the matching `)`
    pub close: usize,
    /// Position of the matching `)`
    pub end: Position,
}

/// Find the parenthesized list that follows the token covering `position`
///
/// The token right after the covering token must be `(`. Scanning counts
/// nesting depth and stops when it returns to zero.
///
/// # Returns
/// * `Some(BalancedSpan)` - Opening and matching closing paren
/// * `None` - No token at `position`, no `(` after it, or the token stream
///   ends before the parens balance
pub fn scan_balanced(index: &TokenIndex, position: Position) -> Option<BalancedSpan> {
    let start = index.token_at(position)?;
    let open = start + 1;
    if !index.is_text(open, "(") {
        return None;
    }

    let mut depth = 0usize;
    for i in open..index.len() {
        match index.text_of(i).as_str() {
            "(" => depth += 1,
            ")" => {
                depth -= 1;
                if depth == 0 {
                    let end = index.token(i)?.span.end;
                    return Some(BalancedSpan { open, close: i, end });
                }
            }
            _ => {}
        }
    }

    debug!(file = index.file(), at = %position, "unbalanced parentheses");
    None
}

/// Literal text between the parens following the token at `position`
///
/// The outer pair is dropped; nested parens and the original spacing
/// between tokens are kept, so `f(a, b, (c, d), e)` yields
/// `a, b, (c, d), e`.
pub fn extract_inner_text(index: &TokenIndex, position: Position) -> Option<String> {
    let span = scan_balanced(index, position)?;
    let mut text = String::new();

    for i in span.open + 1..span.close {
        if i > span.open + 1 {
            text.push_str(&index.text_between(i - 1, i));
        }
        text.push_str(&index.text_of(i));
    }

    Some(text)
}
