//! Declaration lookup.
//!
//! [`DeclarationTable`] is a lexical approximation of a real front end's
//! name lookup: it knows nothing about scopes, only about token shapes that
//! look like `Type name;`. A parser-backed implementation of
//! [`DeclarationOracle`] can replace it on the session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::position::Position;
use crate::token::{TokenIndex, TokenKind};

/// Where a name was declared
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationReference {
    pub file: String,
    pub position: Position,
}

/// Maps a usage position to the declaration of the name used there
pub trait DeclarationOracle: Send + Sync {
    fn resolve_declaration(&self, file: &str, position: Position) -> Option<DeclarationReference>;
}

/// Words that can precede a name without being its type
const NOT_A_TYPE: &[&str] = &[
    "return", "else", "case", "goto", "new", "delete", "throw", "co_return", "co_yield",
    "co_await", "sizeof", "typedef", "using", "namespace", "class", "struct", "enum", "union",
    "public", "private", "protected", "operator", "template", "typename", "if", "while", "for",
    "switch", "do", "default",
];

/// Tokens that may follow a declared name
const DECLARATOR_FOLLOW: &[&str] = &[";", "=", ",", ")", "{", ":"];

#[derive(Debug, Clone)]
struct Declared {
    file: String,
    name_at: Position,
    type_at: Position,
}

/// Declarations found by scanning every file of a session
#[derive(Debug, Clone)]
pub struct DeclarationTable<'a> {
    files: &'a HashMap<String, TokenIndex>,
    order: Vec<String>,
    by_name: HashMap<String, Vec<Declared>>,
}

impl<'a> DeclarationTable<'a> {
    /// Scan `files` for declarations; `order` decides cross-file precedence
    pub fn build(order: &[String], files: &'a HashMap<String, TokenIndex>) -> Self {
        let mut by_name: HashMap<String, Vec<Declared>> = HashMap::new();

        for id in order {
            let Some(index) = files.get(id) else { continue };
            for name in 0..index.len() {
                if let Some(type_start) = declared_type_start(index, name) {
                    let (Some(name_token), Some(type_token)) = (index.token(name), index.token(type_start)) else {
                        continue;
                    };
                    by_name.entry(index.text_of(name)).or_default().push(Declared {
                        file: id.clone(),
                        name_at: name_token.span.start,
                        type_at: type_token.span.start,
                    });
                }
            }
        }

        Self {
            files,
            order: order.to_vec(),
            by_name,
        }
    }

    pub fn declaration_count(&self) -> usize {
        self.by_name.values().map(Vec::len).sum()
    }
}

impl DeclarationOracle for DeclarationTable<'_> {
    fn resolve_declaration(&self, file: &str, position: Position) -> Option<DeclarationReference> {
        let index = self.files.get(file)?;
        let token = index.token_at(position)?;
        if index.token(token)?.kind != TokenKind::Identifier {
            return None;
        }
        let name = index.text_of(token);
        let candidates = self.by_name.get(&name)?;

        let same_file = || candidates.iter().filter(|d| d.file == file);
        let found = same_file()
            .filter(|d| d.name_at <= position)
            .last()
            .or_else(|| same_file().next())
            .or_else(|| {
                self.order
                    .iter()
                    .filter(|id| id.as_str() != file)
                    .find_map(|id| candidates.iter().find(|d| &d.file == id))
            })?;

        trace!(name = %name, file = %found.file, at = %found.type_at, "resolved declaration");
        Some(DeclarationReference {
            file: found.file.clone(),
            position: found.type_at,
        })
    }
}

/// If the identifier at `name` is being declared, the index of the first
/// token of its type
fn declared_type_start(index: &TokenIndex, name: usize) -> Option<usize> {
    if index.token(name)?.kind != TokenKind::Identifier || name == 0 {
        return None;
    }
    let next = index.token(name + 1).map(|_| index.text_of(name + 1))?;
    if !DECLARATOR_FOLLOW.contains(&next.as_str()) {
        return None;
    }

    // Step back over `const`, `&`, `*` qualifiers between type and name
    let mut i = name - 1;
    while matches!(index.text_of(i).as_str(), "const" | "&" | "*" | "&&") {
        i = i.checked_sub(1)?;
    }

    let mut start = type_name_start(index, i)?;

    // Qualified names: `Outer::Inner name`
    while start >= 2 && index.is_text(start - 1, "::") {
        let outer = start - 2;
        if index.token(outer)?.kind != TokenKind::Identifier {
            break;
        }
        start = outer;
    }

    Some(start)
}

/// Start of the type name whose last token is at `last`, walking back over
/// a template argument list when `last` closes one
fn type_name_start(index: &TokenIndex, last: usize) -> Option<usize> {
    let mut i = last;
    if index.is_text(i, ">") {
        let mut depth = 0usize;
        loop {
            match index.text_of(i).as_str() {
                ">" => depth += 1,
                "<" => {
                    depth -= 1;
                    if depth == 0 {
                        break;
                    }
                }
                ";" | "{" | "}" => return None,
                _ => {}
            }
            i = i.checked_sub(1)?;
        }
        i = i.checked_sub(1)?;
    }

    let token = index.token(i)?;
    let text = index.text_of(i);
    if token.kind != TokenKind::Identifier || NOT_A_TYPE.contains(&text.as_str()) {
        return None;
    }
    Some(i)
}
