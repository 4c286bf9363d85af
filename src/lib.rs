// Position tracking module
pub mod position;

// Source buffers and file sources
pub mod file;

// Source kind detection and include naming
pub mod language;

// Tokens and the per-file token index
pub mod token;

// Built-in tokenizer
pub mod lexer;

// Declaration lookup
pub mod oracle;

// Balanced parenthesis scanning
pub mod paren;

// Member-access context queries
pub mod context;

// Session options
pub mod config;

// Rewrite rules and requirement tags
pub mod rules;

// Line insertion engine
pub mod edit;

// Per-file line rewriter
pub mod rewrite;

// Multi-file conversion session
pub mod session;

// Conversion reports
pub mod report;

// Re-exports
pub use position::{Position, Span};
pub use file::{FileBuffer, FileError, FileSource, FsSource, MemorySource, checksum, read_file};
pub use language::{SourceKind, detect_source_kind, local_include_name};
pub use token::{Token, TokenIndex, TokenKind};
pub use lexer::{CppLexer, LexError, Lexer};
pub use oracle::{DeclarationOracle, DeclarationReference, DeclarationTable};
pub use paren::{BalancedSpan, extract_inner_text, scan_balanced};
pub use context::{ContextResolver, MemberAccess};
pub use config::{ReceiverClass, RewriteOptions};
pub use rules::{Header, Requirement, Requirements, Rule, RuleKind, RuleSet};
pub use edit::{EditError, LineInsertion, apply_insertions, coalesce_insertions};
pub use rewrite::{Conversion, FileRewriter, Injection};
pub use session::{ConvertError, Session};
pub use report::{ConversionReport, generate_execution_id};
