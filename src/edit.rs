use std::collections::BTreeMap;

use thiserror::Error;

/// Lines to insert before a given line of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineInsertion {
    /// Index of the line the new lines go before (may equal the line count)
    pub at: usize,
    /// Lines to insert, in order
    pub lines: Vec<String>,
}

impl LineInsertion {
    pub fn new(at: usize, lines: Vec<String>) -> Self {
        Self { at, lines }
    }
}

/// Error types for edit operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    /// Insertion point past the end of the file
    #[error("Insertion at line {at} out of bounds (line count: {len})")]
    OutOfBounds { at: usize, len: usize },
}

/// Merge insertions that share an index and sort them by index descending
///
/// Insertions at the same index keep their relative order, so the first
/// one given ends up first in the file.
///
/// # Example
/// ```
/// use dialect_rewriter::{LineInsertion, coalesce_insertions};
/// let merged = coalesce_insertions(vec![
///     LineInsertion::new(1, vec!["a".to_string()]),
///     LineInsertion::new(4, vec!["b".to_string()]),
///     LineInsertion::new(1, vec!["c".to_string()]),
/// ]);
/// assert_eq!(merged[0].at, 4);
/// assert_eq!(merged[1].lines, vec!["a".to_string(), "c".to_string()]);
/// ```
pub fn coalesce_insertions(insertions: Vec<LineInsertion>) -> Vec<LineInsertion> {
    let mut by_index: BTreeMap<usize, Vec<String>> = BTreeMap::new();
    for insertion in insertions {
        by_index.entry(insertion.at).or_default().extend(insertion.lines);
    }

    by_index
        .into_iter()
        .rev()
        .filter(|(_, lines)| !lines.is_empty())
        .map(|(at, lines)| LineInsertion { at, lines })
        .collect()
}

/// Apply insertions to `lines`, all indices referring to the original lines
///
/// Insertions are applied from the bottom of the file up so that earlier
/// indices stay valid. Every insertion is validated before any is applied.
///
/// # Returns
/// * `Ok(usize)` - Number of lines inserted
/// * `Err(EditError)` - An index was past the end; `lines` is untouched
pub fn apply_insertions(lines: &mut Vec<String>, insertions: Vec<LineInsertion>) -> Result<usize, EditError> {
    let len = lines.len();
    if let Some(bad) = insertions.iter().find(|i| i.at > len) {
        return Err(EditError::OutOfBounds { at: bad.at, len });
    }

    let mut inserted = 0;
    for insertion in coalesce_insertions(insertions) {
        inserted += insertion.lines.len();
        let tail = lines.split_off(insertion.at);
        lines.extend(insertion.lines);
        lines.extend(tail);
    }
    Ok(inserted)
}
