//! Rewrite rules and the requirements they record.
//!
//! A [`RuleSet`] is an ordered table. Every line runs through each rule in
//! turn, and a rule sees the text left by the rules before it. Rules come
//! in three shapes:
//!
//! * [`LexicalRule`]: fixed substring in, fixed substring out.
//! * [`ContextRule`]: the replacement depends on what the receiver of a
//!   member call was declared as.
//! * [`StructuralRule`]: one line becomes a block of several lines.
//!
//! Each firing records [`Requirement`]s (headers, using-directives,
//! synthesized declarations) in a [`Requirements`] accumulator that only
//! ever grows while a file is converted.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{ReceiverClass, RewriteOptions};
use crate::context::ContextResolver;
use crate::paren;
use crate::position::{Position, char_end};
use crate::token::{TokenIndex, TokenKind};

/// A header the converted file has to include
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Header {
    Cassert,
    Cstdint,
    Memory,
    Optional,
    String,
    StringView,
    Utility,
    Vector,
    /// Local replacement for the reference-counting pointers
    IntrusivePtr,
    /// Local helpers (`assert_cast`, `join_strings`)
    Util,
}

impl Header {
    /// The `#include` line for this header
    ///
    /// Local headers are addressed through `prefix`, system headers ignore it.
    pub fn include_line(&self, prefix: &str) -> String {
        let system = match self {
            Header::Cassert => "cassert",
            Header::Cstdint => "cstdint",
            Header::Memory => "memory",
            Header::Optional => "optional",
            Header::String => "string",
            Header::StringView => "string_view",
            Header::Utility => "utility",
            Header::Vector => "vector",
            Header::IntrusivePtr => return format!("#include \"{}intrusive_ptr.hh\"", prefix),
            Header::Util => return format!("#include \"{}util.hh\"", prefix),
        };
        format!("#include <{}>", system)
    }
}

/// A using-directive the converted file needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum UsingDirective {
    StringViewLiterals,
}

impl UsingDirective {
    pub fn line(&self) -> &'static str {
        match self {
            UsingDirective::StringViewLiterals => "using namespace std::literals;",
        }
    }
}

/// A block of declarations synthesized into the converted file
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SyntheticDecl {
    FixedWidthAliases,
}

impl SyntheticDecl {
    pub fn lines(&self) -> &'static [&'static str] {
        match self {
            SyntheticDecl::FixedWidthAliases => &[
                "using u8 = std::uint8_t;",
                "using u16 = std::uint16_t;",
                "using u32 = std::uint32_t;",
                "using u64 = std::uint64_t;",
                "using i8 = std::int8_t;",
                "using i16 = std::int16_t;",
                "using i32 = std::int32_t;",
                "using i64 = std::int64_t;",
                "using FlatPtr = std::uintptr_t;",
            ],
        }
    }
}

/// Something a rule firing obliges the file rewriter to inject
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Requirement {
    Header(Header),
    Using(UsingDirective),
    Declaration(SyntheticDecl),
}

/// Accumulated requirements of one file's conversion
///
/// Insertion is idempotent and nothing is ever removed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Requirements {
    tags: BTreeSet<Requirement>,
    debug_constants: Vec<String>,
}

impl Requirements {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a requirement; `true` if it was not already present
    pub fn require(&mut self, requirement: Requirement) -> bool {
        self.tags.insert(requirement)
    }

    pub fn require_all(&mut self, requirements: &[Requirement]) {
        self.tags.extend(requirements.iter().copied());
    }

    pub fn contains(&self, requirement: Requirement) -> bool {
        self.tags.contains(&requirement)
    }

    pub fn headers(&self) -> impl Iterator<Item = Header> + '_ {
        self.tags.iter().filter_map(|tag| match tag {
            Requirement::Header(header) => Some(*header),
            _ => None,
        })
    }

    pub fn using_directives(&self) -> impl Iterator<Item = UsingDirective> + '_ {
        self.tags.iter().filter_map(|tag| match tag {
            Requirement::Using(directive) => Some(*directive),
            _ => None,
        })
    }

    pub fn declarations(&self) -> impl Iterator<Item = SyntheticDecl> + '_ {
        self.tags.iter().filter_map(|tag| match tag {
            Requirement::Declaration(decl) => Some(*decl),
            _ => None,
        })
    }

    /// Remember a debug-switch identifier, keeping first-seen order
    pub fn note_debug_constant(&mut self, name: &str) {
        if !self.debug_constants.iter().any(|known| known == name) {
            self.debug_constants.push(name.to_string());
        }
    }

    pub fn debug_constants(&self) -> &[String] {
        &self.debug_constants
    }

    pub fn len(&self) -> usize {
        self.tags.len() + self.debug_constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// How a pattern must sit relative to neighbouring identifier characters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    /// Match anywhere
    Raw,
    /// A pattern starting (ending) with an identifier character must not be
    /// preceded (followed) by one
    Word,
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

impl Boundary {
    fn allows(&self, text: &str, at: usize, pattern: &str) -> bool {
        if *self == Boundary::Raw {
            return true;
        }
        let starts_ident = pattern.chars().next().is_some_and(is_ident_char);
        let ends_ident = pattern.chars().next_back().is_some_and(is_ident_char);
        let before = text[..at].chars().next_back();
        let after = text[at + pattern.len()..].chars().next();

        !(starts_ident && before.is_some_and(is_ident_char)) && !(ends_ident && after.is_some_and(is_ident_char))
    }
}

/// Byte offsets of the non-overlapping occurrences of `pattern`, left to right
pub fn find_occurrences(text: &str, pattern: &str, boundary: Boundary) -> Vec<usize> {
    let mut found = Vec::new();
    if pattern.is_empty() {
        return found;
    }

    let mut from = 0;
    while let Some(offset) = text[from..].find(pattern) {
        let at = from + offset;
        if boundary.allows(text, at, pattern) {
            found.push(at);
            from = at + pattern.len();
        } else {
            from = char_end(text, at);
        }
    }
    found
}

/// Replace the `pattern.len()` bytes at each offset in `hits`
fn splice(text: &str, pattern: &str, hits: &[usize], replacements: &[String]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for (&at, replacement) in hits.iter().zip(replacements) {
        out.push_str(&text[last..at]);
        out.push_str(replacement);
        last = at + pattern.len();
    }
    out.push_str(&text[last..]);
    out
}

/// One original line as handed to the rule set
#[derive(Debug, Clone, Copy)]
pub struct LineInput<'a> {
    pub file: &'a str,
    /// Line number in the original file (0-indexed)
    pub number: usize,
    /// Original text of the line
    pub text: &'a str,
}

/// Read-only services available to rules
pub struct RuleContext<'a> {
    pub resolver: &'a ContextResolver<'a>,
    /// Token index of the file being converted
    pub index: &'a TokenIndex,
    pub options: &'a RewriteOptions,
}

/// A trigger occurrence located in the original text
#[derive(Debug, Clone, Copy)]
pub struct Occurrence<'a> {
    pub file: &'a str,
    /// Position of the trigger's first character in the original file
    pub position: Position,
    /// Original text of the line
    pub line: &'a str,
}

/// Outcome of a context-conditioned rule for one occurrence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Replace the trigger text with this
    Replace(String),
    /// Leave the occurrence alone
    Keep,
    /// Context could not be established; use the rule's fallback
    Unresolved,
}

/// Unconditional substitution
#[derive(Debug, Clone)]
pub struct LexicalRule {
    pub pattern: &'static str,
    pub replacement: &'static str,
    pub boundary: Boundary,
    pub requires: &'static [Requirement],
}

impl LexicalRule {
    pub const fn word(pattern: &'static str, replacement: &'static str, requires: &'static [Requirement]) -> Self {
        Self {
            pattern,
            replacement,
            boundary: Boundary::Word,
            requires,
        }
    }

    pub const fn raw(pattern: &'static str, replacement: &'static str, requires: &'static [Requirement]) -> Self {
        Self {
            pattern,
            replacement,
            boundary: Boundary::Raw,
            requires,
        }
    }

    pub fn apply(&self, line: &str, acc: &mut Requirements) -> String {
        let hits = find_occurrences(line, self.pattern, self.boundary);
        if hits.is_empty() {
            return line.to_string();
        }
        acc.require_all(self.requires);
        let replacements = vec![self.replacement.to_string(); hits.len()];
        splice(line, self.pattern, &hits, &replacements)
    }
}

/// Substitution decided per occurrence from the receiver's declaration
pub struct ContextRule {
    pub name: &'static str,
    /// Text that triggers the rule and that a decision replaces
    pub trigger: &'static str,
    pub boundary: Boundary,
    /// Replacement when the context is unresolved; `None` keeps the trigger
    pub fallback: Option<&'static str>,
    pub requires: &'static [Requirement],
    pub decide: fn(&Occurrence<'_>, &RuleContext<'_>) -> Decision,
}

impl ContextRule {
    /// Apply to `line`
    ///
    /// `original` is `None` once the line has been expanded into several,
    /// in which case no occurrence can be placed in the original text.
    pub fn apply(
        &self,
        line: &str,
        original: Option<&LineInput<'_>>,
        ctx: &RuleContext<'_>,
        acc: &mut Requirements,
    ) -> String {
        let hits = find_occurrences(line, self.trigger, self.boundary);
        if hits.is_empty() {
            return line.to_string();
        }

        // The k-th occurrence in the edited text is the k-th in the original,
        // as long as earlier rules neither added nor removed one.
        let located = original.and_then(|input| {
            let columns = find_occurrences(input.text, self.trigger, self.boundary);
            (columns.len() == hits.len()).then_some((input, columns))
        });

        let replacements: Vec<String> = (0..hits.len())
            .map(|k| {
                let decision = match &located {
                    Some((input, columns)) => (self.decide)(
                        &Occurrence {
                            file: input.file,
                            position: Position::new(input.number, columns[k]),
                            line: input.text,
                        },
                        ctx,
                    ),
                    None => Decision::Unresolved,
                };
                trace!(rule = self.name, ?decision, "context decision");
                match decision {
                    Decision::Replace(text) => text,
                    Decision::Keep => self.trigger.to_string(),
                    Decision::Unresolved => self.fallback.unwrap_or(self.trigger).to_string(),
                }
            })
            .collect();

        if replacements.iter().any(|r| r != self.trigger) {
            acc.require_all(self.requires);
        }
        splice(line, self.trigger, &hits, &replacements)
    }
}

/// Rewrite that turns one line into a block
pub struct StructuralRule {
    pub name: &'static str,
    pub trigger: &'static str,
    pub requires: &'static [Requirement],
    pub expand: fn(&Occurrence<'_>, &RuleContext<'_>) -> Option<Vec<String>>,
}

impl StructuralRule {
    /// The replacement block, or `None` to leave the line as it is
    ///
    /// Expansion reads argument text from the token stream, so it only
    /// fires on a line no earlier rule has edited.
    pub fn apply(
        &self,
        line: &str,
        original: Option<&LineInput<'_>>,
        ctx: &RuleContext<'_>,
        acc: &mut Requirements,
    ) -> Option<Vec<String>> {
        let input = original?;
        if line != input.text {
            return None;
        }
        let hits = find_occurrences(line, self.trigger, Boundary::Word);
        if hits.len() != 1 {
            if hits.len() > 1 {
                debug!(rule = self.name, line = input.number, "several occurrences, not expanding");
            }
            return None;
        }

        let occurrence = Occurrence {
            file: input.file,
            position: Position::new(input.number, hits[0]),
            line: input.text,
        };
        let block = (self.expand)(&occurrence, ctx);
        match &block {
            Some(_) => acc.require_all(self.requires),
            None => debug!(rule = self.name, line = input.number, "expansion abandoned"),
        }
        block
    }
}

pub enum Rule {
    Lexical(LexicalRule),
    Contextual(ContextRule),
    Structural(StructuralRule),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Lexical,
    Contextual,
    Structural,
}

impl Rule {
    pub fn name(&self) -> &'static str {
        match self {
            Rule::Lexical(rule) => rule.pattern,
            Rule::Contextual(rule) => rule.name,
            Rule::Structural(rule) => rule.name,
        }
    }

    pub fn kind(&self) -> RuleKind {
        match self {
            Rule::Lexical(_) => RuleKind::Lexical,
            Rule::Contextual(_) => RuleKind::Contextual,
            Rule::Structural(_) => RuleKind::Structural,
        }
    }
}

/// Ordered rule table applied to every body line
pub struct RuleSet {
    rules: Vec<Rule>,
}

const VECTOR: &[Requirement] = &[Requirement::Header(Header::Vector)];
const STRING: &[Requirement] = &[Requirement::Header(Header::String)];
const STRING_VIEW: &[Requirement] = &[Requirement::Header(Header::StringView)];
const STRING_AND_UTIL: &[Requirement] = &[Requirement::Header(Header::String), Requirement::Header(Header::Util)];
const CASSERT: &[Requirement] = &[Requirement::Header(Header::Cassert)];
const INTRUSIVE_PTR: &[Requirement] = &[Requirement::Header(Header::IntrusivePtr)];
const MEMORY: &[Requirement] = &[Requirement::Header(Header::Memory)];
const OPTIONAL: &[Requirement] = &[Requirement::Header(Header::Optional)];
const UTILITY: &[Requirement] = &[Requirement::Header(Header::Utility)];
const UTIL: &[Requirement] = &[Requirement::Header(Header::Util)];
const FIXED_WIDTH: &[Requirement] = &[
    Requirement::Header(Header::Cstdint),
    Requirement::Declaration(SyntheticDecl::FixedWidthAliases),
];
const NONE: &[Requirement] = &[];

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    /// The default catalog
    ///
    /// Structural rules come first because they need the untouched line;
    /// longer lexical patterns come before the shorter ones they contain.
    pub fn standard() -> Self {
        use Rule::{Contextual, Lexical, Structural};

        Self::new(vec![
            Structural(StructuralRule {
                name: "extend",
                trigger: "extend(",
                requires: NONE,
                expand: expand_extend,
            }),
            Contextual(ContextRule {
                name: "append",
                trigger: "append(",
                boundary: Boundary::Word,
                fallback: Some("push_back("),
                requires: NONE,
                decide: append_by_receiver,
            }),
            Lexical(LexicalRule::word("Vector", "std::vector", VECTOR)),
            Lexical(LexicalRule::word("StringView", "std::string_view", STRING_VIEW)),
            Lexical(LexicalRule::word("StringBuilder", "std::string", STRING)),
            Lexical(LexicalRule::word("ByteString::join", "join_strings", STRING_AND_UTIL)),
            Lexical(LexicalRule::word("ByteString::formatted", "fmt::format", STRING)),
            Lexical(LexicalRule::word("ByteString", "std::string", STRING)),
            Lexical(LexicalRule::word("DeprecatedFlyString", "std::string", STRING)),
            Lexical(LexicalRule::word("String", "std::string", STRING)),
            Lexical(LexicalRule::word("VERIFY_NOT_REACHED()", "assert(false)", CASSERT)),
            Lexical(LexicalRule::word("VERIFY(", "assert(", CASSERT)),
            Lexical(LexicalRule::word("RefCounted", "intrusive_ref_counter", INTRUSIVE_PTR)),
            Lexical(LexicalRule::word("NonnullRefPtr", "intrusive_ptr", INTRUSIVE_PTR)),
            Lexical(LexicalRule::word("RefPtr", "intrusive_ptr", INTRUSIVE_PTR)),
            Lexical(LexicalRule::word("NonnullOwnPtr", "std::unique_ptr", MEMORY)),
            Lexical(LexicalRule::word("OwnPtr", "std::unique_ptr", MEMORY)),
            Lexical(LexicalRule::word("Optional", "std::optional", OPTIONAL)),
            Lexical(LexicalRule::raw("\"sv;", "\";", NONE)),
            Lexical(LexicalRule::raw(" move(", " std::move(", UTILITY)),
            Lexical(LexicalRule::raw("(move(", "(std::move(", UTILITY)),
            Lexical(LexicalRule::word("ptr()", "get()", NONE)),
            Lexical(LexicalRule::word("to_byte_string()", "to_string()", NONE)),
            Lexical(LexicalRule::word("is_empty()", "empty()", NONE)),
            Lexical(LexicalRule::word("verify_cast", "assert_cast", UTIL)),
            Lexical(LexicalRule::word("u8", "u8", FIXED_WIDTH)),
            Lexical(LexicalRule::word("u16", "u16", FIXED_WIDTH)),
            Lexical(LexicalRule::word("u32", "u32", FIXED_WIDTH)),
            Lexical(LexicalRule::word("u64", "u64", FIXED_WIDTH)),
            Lexical(LexicalRule::word("i8", "i8", FIXED_WIDTH)),
            Lexical(LexicalRule::word("i16", "i16", FIXED_WIDTH)),
            Lexical(LexicalRule::word("i32", "i32", FIXED_WIDTH)),
            Lexical(LexicalRule::word("i64", "i64", FIXED_WIDTH)),
            Lexical(LexicalRule::word("FlatPtr", "FlatPtr", FIXED_WIDTH)),
        ])
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Run one line through every rule, in order
    pub fn apply(&self, input: &LineInput<'_>, ctx: &RuleContext<'_>, acc: &mut Requirements) -> Vec<String> {
        let mut lines = vec![input.text.to_string()];

        for rule in &self.rules {
            let original = (lines.len() == 1).then_some(input);
            let mut next = Vec::with_capacity(lines.len());
            for line in lines {
                match rule {
                    Rule::Lexical(lexical) => next.push(lexical.apply(&line, acc)),
                    Rule::Contextual(contextual) => next.push(contextual.apply(&line, original, ctx, acc)),
                    Rule::Structural(structural) => match structural.apply(&line, original, ctx, acc) {
                        Some(block) => next.extend(block),
                        None => next.push(line),
                    },
                }
            }
            lines = next;
        }

        lines
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::standard()
    }
}

/// Record every `SOMETHING_DEBUG` identifier on `line`
pub fn collect_debug_constants(line: &str, acc: &mut Requirements) {
    for word in line.split(|c: char| !is_ident_char(c)) {
        let is_switch = word.len() > "_DEBUG".len()
            && word.ends_with("_DEBUG")
            && word.starts_with(|c: char| c.is_ascii_uppercase())
            && word.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_');
        if is_switch {
            acc.note_debug_constant(word);
        }
    }
}

/// Whether the call at `occurrence` has exactly one argument and it is a
/// single character: a character literal or a name declared as `char`
fn single_char_argument(occurrence: &Occurrence<'_>, ctx: &RuleContext<'_>) -> bool {
    let Some(span) = paren::scan_balanced(ctx.index, occurrence.position) else {
        return false;
    };
    if span.close != span.open + 2 {
        return false;
    }
    let Some(argument) = ctx.index.token(span.open + 1) else {
        return false;
    };

    match argument.kind {
        TokenKind::CharLiteral => true,
        TokenKind::Identifier => {
            ctx.resolver.declared_type_name(occurrence.file, argument.span.start).as_deref() == Some("char")
        }
        _ => false,
    }
}

/// `append(` differs by receiver: a string builder appends one character
/// with `push_back`, a sequence appends through `insert` at its end
fn append_by_receiver(occurrence: &Occurrence<'_>, ctx: &RuleContext<'_>) -> Decision {
    let Some(access) = ctx.resolver.member_access(occurrence.file, occurrence.position) else {
        return Decision::Keep;
    };
    let Some(declared) = ctx.resolver.receiver_type_name(occurrence.file, occurrence.position) else {
        return Decision::Unresolved;
    };

    match ctx.options.classify(&declared) {
        ReceiverClass::StringBuilder if single_char_argument(occurrence, ctx) => {
            Decision::Replace("push_back(".to_string())
        }
        ReceiverClass::StringBuilder => {
            debug!(
                file = occurrence.file,
                at = %occurrence.position,
                receiver = %access.receiver,
                "string builder append kept, argument is not a single char"
            );
            Decision::Keep
        }
        ReceiverClass::Sequence => Decision::Replace(format!(
            "insert({}{}end(), ",
            access.receiver, access.operator
        )),
        ReceiverClass::Other => Decision::Unresolved,
    }
}

/// `recv.extend(expr)` becomes a block binding `expr` to a temporary and
/// inserting its range at the end of `recv`
fn expand_extend(occurrence: &Occurrence<'_>, ctx: &RuleContext<'_>) -> Option<Vec<String>> {
    let access = ctx.resolver.member_access(occurrence.file, occurrence.position)?;
    if ctx.index.token(access.receiver_token)?.kind != TokenKind::Identifier
        || access.receiver_at.line != occurrence.position.line
    {
        return None;
    }

    // Only a receiver that starts the statement can be hoisted
    let indent = occurrence.line.get(..access.receiver_at.column)?;
    if !indent.trim().is_empty() {
        return None;
    }

    let span = paren::scan_balanced(ctx.index, occurrence.position)?;
    if span.end.line != occurrence.position.line {
        return None;
    }
    let argument = paren::extract_inner_text(ctx.index, occurrence.position)?;
    if argument.trim().is_empty() {
        return None;
    }
    let rest = occurrence.line.get(char_end(occurrence.line, span.end.column)..)?;

    let receiver = ctx.resolver.object_text(occurrence.file, occurrence.position)?;
    let op = &access.operator;
    let temporary = format!("{}_extension", receiver);

    Some(vec![
        format!("{indent}{{ auto {temporary} = {argument};"),
        format!("{indent}{receiver}{op}insert({receiver}{op}end(), {temporary}.begin(), {temporary}.end()){rest}"),
        format!("{indent}}}"),
    ])
}
