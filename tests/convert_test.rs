use dialect_rewriter::{
    ConvertError, Header, Injection, MemorySource, Position, Requirement, Session, extract_inner_text,
};

fn session(files: &[(&str, &str)]) -> Session {
    let mut source = MemorySource::new();
    for (id, text) in files {
        source.insert(*id, *text);
    }
    let mut session = Session::new(source);
    for (id, _) in files {
        session.add_file(*id).unwrap();
    }
    session
}

fn convert(files: &[(&str, &str)]) -> Vec<String> {
    session(files).convert(files[0].0).unwrap().lines
}

const HEADER: &str = "#pragma once

#include <AK/Optional.h>
#include \"Token.h\"

class Lexer {
public:
    Optional<Token> next();
    StringView source() const { return m_source; }

private:
    StringView m_source;
    Vector<Token> m_tokens;
    u8 m_flags { 0 };
};";

#[test]
fn test_idempotent_on_converted_text() {
    let first = session(&[("Lexer.h", HEADER)]).convert("Lexer.h").unwrap();

    let converted = first.text();
    let second = session(&[("Lexer.h", converted.as_str())]).convert("Lexer.h").unwrap();

    assert_eq!(second.lines, first.lines);
    assert!(second.injected.is_empty());
}

#[test]
fn test_extend_expands_to_block() {
    let lines = convert(&[(
        "a.cpp",
        "#include \"a.h\"\nvoid f(Items& items, Source& source)\n{\n        items.extend(source.values());\n}",
    )]);

    assert_eq!(
        &lines[3..6],
        &[
            "        { auto items_extension = source.values();",
            "        items.insert(items.end(), items_extension.begin(), items_extension.end());",
            "        }",
        ]
    );
}

#[test]
fn test_append_depends_on_receiver() {
    let lines = convert(&[
        (
            "Builder.cpp",
            "void Builder::run()\n{\n    m_out.append('x');\n    m_out.append(\"xyz\");\n    m_parts.append('x');\n}",
        ),
        ("Builder.h", "class Builder {\n    StringBuilder m_out;\n    Vector<char> m_parts;\n};"),
    ]);

    assert_eq!(lines[2], "    m_out.push_back('x');");
    assert_eq!(lines[3], "    m_out.append(\"xyz\");");
    assert_eq!(lines[4], "    m_parts.insert(m_parts.end(), 'x');");
}

#[test]
fn test_unbalanced_parens_keep_other_rewrites() {
    let lines = convert(&[("a.cpp", "void g()\n{\n    items.extend(Vector<int>(foo(bar(\n}")]);

    assert_eq!(lines[2], "    items.extend(std::vector<int>(foo(bar(");
}

#[test]
fn test_missing_insertion_point_is_reported() {
    let conversion = session(&[("a.cpp", "int f()\n{\n    VERIFY(true);\n}")]).convert("a.cpp").unwrap();

    assert_eq!(conversion.injection, Injection::Skipped);
    assert_eq!(conversion.lines[2], "    assert(true);");
    assert!(conversion.requirements.contains(Requirement::Header(Header::Cassert)));
    assert!(!conversion.lines.iter().any(|line| line.starts_with("#include")));
}

#[test]
fn test_requirements_grow_with_input() {
    let body = [
        "Vector<int> a;",
        "int plain;",
        "Optional<int> b;",
        "OwnPtr<int> c;",
        "int other;",
        "ByteString d;",
    ];

    let mut previous = 0;
    for end in 1..=body.len() {
        let text = body[..end].join("\n");
        let conversion = session(&[("a.cpp", text.as_str())]).convert("a.cpp").unwrap();
        let count = conversion.requirements.len();
        assert!(count >= previous, "requirements shrank at line {}", end);
        previous = count;
    }
    assert_eq!(previous, 4);
}

#[test]
fn test_token_lookup_between_and_inside_tokens() {
    let session = session(&[("a.cpp", "int  value = 42;")]);
    let index = session.tokens("a.cpp").unwrap();

    assert!(index.token_at(Position::new(0, 3)).is_none());
    assert!(index.token_at(Position::new(0, 4)).is_none());
    for column in 5..10 {
        let token = index.token_at(Position::new(0, column)).unwrap();
        assert!(index.token(token).unwrap().span.contains(Position::new(0, column)));
        assert_eq!(index.text_of(token), "value");
    }
}

#[test]
fn test_extract_inner_text_round_trip() {
    let session = session(&[("a.cpp", "f(a, b, (c, d), e)")]);
    let index = session.tokens("a.cpp").unwrap();

    assert_eq!(extract_inner_text(index, Position::new(0, 0)).as_deref(), Some("a, b, (c, d), e"));
}

#[test]
fn test_missing_file_aborts() {
    let mut session = Session::new(MemorySource::new().with_file("a.cpp", "int x;"));
    session.add_file("a.cpp").unwrap();

    let error = session.add_file("Gone.h").unwrap_err();

    assert!(matches!(error, ConvertError::File(_)));
    assert!(error.to_string().contains("Gone.h"));
}
