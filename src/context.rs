use std::collections::HashMap;

use tracing::trace;

use crate::oracle::DeclarationOracle;
use crate::position::Position;
use crate::token::TokenIndex;

/// The receiver side of a `receiver.member` or `receiver->member` access
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberAccess {
    /// Literal text of the receiver token
    pub receiver: String,
    /// `.` or `->`
    pub operator: String,
    /// Start of the receiver token
    pub receiver_at: Position,
    /// Token index of the receiver
    pub receiver_token: usize,
}

/// Answers lexical-context questions about member accesses
///
/// Looks up tokens in any file of the session, so a receiver used in one
/// file can be resolved to a declaration in another.
pub struct ContextResolver<'a> {
    files: &'a HashMap<String, TokenIndex>,
    oracle: &'a dyn DeclarationOracle,
}

impl<'a> ContextResolver<'a> {
    pub fn new(files: &'a HashMap<String, TokenIndex>, oracle: &'a dyn DeclarationOracle) -> Self {
        Self { files, oracle }
    }

    /// The member access whose member name covers `position`
    ///
    /// `None` when the token before the member is not `.` or `->`, e.g. a
    /// free function that happens to share the method's name.
    pub fn member_access(&self, file: &str, position: Position) -> Option<MemberAccess> {
        let index = self.files.get(file)?;
        let member = index.token_at(position)?;
        let operator_token = member.checked_sub(1)?;
        let receiver_token = member.checked_sub(2)?;

        let operator = index.text_of(operator_token);
        if operator != "." && operator != "->" {
            return None;
        }

        Some(MemberAccess {
            receiver: index.text_of(receiver_token),
            operator,
            receiver_at: index.token(receiver_token)?.span.start,
            receiver_token,
        })
    }

    /// Best-effort declared type of the receiver of the member at `position`
    ///
    /// This is the text of the token found at the declaration site the
    /// oracle reports, not a checked type: a receiver declared through an
    /// alias or `auto` yields that spelling instead.
    pub fn receiver_type_name(&self, file: &str, position: Position) -> Option<String> {
        let access = self.member_access(file, position)?;
        let name = self.declared_type_name(file, access.receiver_at)?;

        trace!(file, receiver = %access.receiver, declared = %name, "receiver type");
        Some(name)
    }

    /// Text at the declaration site of the name used at `position`
    pub fn declared_type_name(&self, file: &str, position: Position) -> Option<String> {
        let declaration = self.oracle.resolve_declaration(file, position)?;
        let declaring = self.files.get(&declaration.file)?;
        let token = declaring.token_at(declaration.position)?;
        Some(declaring.text_of(token))
    }

    /// Literal text of the receiver of the member at `position`
    pub fn object_text(&self, file: &str, position: Position) -> Option<String> {
        self.member_access(file, position).map(|access| access.receiver)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::file::FileBuffer;
    use crate::lexer::{CppLexer, Lexer};
    use crate::oracle::{DeclarationReference, DeclarationTable};

    fn files(sources: &[(&str, &str)]) -> (Vec<String>, HashMap<String, TokenIndex>) {
        let mut map = HashMap::new();
        for (id, text) in sources {
            let buffer = Arc::new(FileBuffer::from_text(*id, text));
            let tokens = CppLexer::new().tokenize(&buffer).unwrap();
            map.insert(id.to_string(), TokenIndex::new(buffer, tokens));
        }
        (sources.iter().map(|(id, _)| id.to_string()).collect(), map)
    }

    /// Always points at a fixed declaration, whatever the query
    struct FixedOracle(DeclarationReference);

    impl DeclarationOracle for FixedOracle {
        fn resolve_declaration(&self, _file: &str, _position: Position) -> Option<DeclarationReference> {
            Some(self.0.clone())
        }
    }

    #[test]
    fn test_receiver_type_name_string_builder() {
        let (order, map) = files(&[("a.cpp", "StringBuilder builder;\nbuilder.append('x');")]);
        let table = DeclarationTable::build(&order, &map);
        let resolver = ContextResolver::new(&map, &table);

        let name = resolver.receiver_type_name("a.cpp", Position::new(1, 8));

        assert_eq!(name.as_deref(), Some("StringBuilder"));
    }

    #[test]
    fn test_receiver_type_name_arrow_and_cross_file() {
        let (order, map) = files(&[
            ("Parser.cpp", "void Parser::run()\n{\n    this->m_nodes.append(node);\n}"),
            ("Parser.h", "class Parser {\n    Vector<Node> m_nodes;\n};"),
        ]);
        let table = DeclarationTable::build(&order, &map);
        let resolver = ContextResolver::new(&map, &table);

        assert_eq!(resolver.receiver_type_name("Parser.cpp", Position::new(2, 18)).as_deref(), Some("Vector"));
        assert_eq!(resolver.object_text("Parser.cpp", Position::new(2, 18)).as_deref(), Some("m_nodes"));
    }

    #[test]
    fn test_declared_type_name_of_plain_name() {
        let (order, map) = files(&[("a.cpp", "void f(char c)\n{\n    out.append(c);\n}")]);
        let table = DeclarationTable::build(&order, &map);
        let resolver = ContextResolver::new(&map, &table);

        assert_eq!(resolver.declared_type_name("a.cpp", Position::new(2, 15)).as_deref(), Some("char"));
        assert!(resolver.declared_type_name("a.cpp", Position::new(2, 4)).is_none());
    }

    #[test]
    fn test_free_function_is_not_member_access() {
        let (order, map) = files(&[("a.cpp", "Vector<int> v;\nappend(v, 1);")]);
        let table = DeclarationTable::build(&order, &map);
        let resolver = ContextResolver::new(&map, &table);

        assert!(resolver.member_access("a.cpp", Position::new(1, 0)).is_none());
        assert!(resolver.receiver_type_name("a.cpp", Position::new(1, 0)).is_none());
        assert!(resolver.object_text("a.cpp", Position::new(1, 0)).is_none());
    }

    #[test]
    fn test_undeclared_receiver() {
        let (order, map) = files(&[("a.cpp", "mystery.append(1);")]);
        let table = DeclarationTable::build(&order, &map);
        let resolver = ContextResolver::new(&map, &table);

        assert!(resolver.receiver_type_name("a.cpp", Position::new(0, 8)).is_none());
        assert_eq!(resolver.object_text("a.cpp", Position::new(0, 8)).as_deref(), Some("mystery"));
    }

    #[test]
    fn test_member_access_details() {
        let (_, map) = files(&[("a.cpp", "  list->extend(other);")]);
        let oracle = FixedOracle(DeclarationReference {
            file: "a.cpp".to_string(),
            position: Position::new(0, 2),
        });
        let resolver = ContextResolver::new(&map, &oracle);

        let access = resolver.member_access("a.cpp", Position::new(0, 8)).unwrap();

        assert_eq!(access.receiver, "list");
        assert_eq!(access.operator, "->");
        assert_eq!(access.receiver_at, Position::new(0, 2));
        // The fixed oracle points back at the receiver itself
        assert_eq!(resolver.receiver_type_name("a.cpp", Position::new(0, 8)).as_deref(), Some("list"));
    }

    #[test]
    fn test_oracle_pointing_at_whitespace() {
        let (_, map) = files(&[("a.cpp", "x.append(1);")]);
        let oracle = FixedOracle(DeclarationReference {
            file: "a.cpp".to_string(),
            position: Position::new(5, 0),
        });
        let resolver = ContextResolver::new(&map, &oracle);

        assert!(resolver.receiver_type_name("a.cpp", Position::new(0, 2)).is_none());
    }
}
