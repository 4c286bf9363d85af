use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::RewriteOptions;
use crate::context::ContextResolver;
use crate::file::{FileError, FileSource};
use crate::language::detect_source_kind;
use crate::lexer::{CppLexer, LexError, Lexer};
use crate::oracle::{DeclarationOracle, DeclarationTable};
use crate::rewrite::{Conversion, FileRewriter};
use crate::rules::RuleSet;
use crate::token::TokenIndex;

/// Error types for a conversion session
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    File(#[from] FileError),
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("File was never added to the session: {0}")]
    UnknownFile(String),
}

/// A set of files converted together
///
/// Every file that may hold a declaration must be added before `convert`
/// is called, since receivers are resolved across all added files.
pub struct Session {
    source: Box<dyn FileSource>,
    lexer: Box<dyn Lexer>,
    oracle: Option<Box<dyn DeclarationOracle>>,
    order: Vec<String>,
    files: HashMap<String, TokenIndex>,
    options: RewriteOptions,
    rules: RuleSet,
}

impl Session {
    pub fn new(source: impl FileSource + 'static) -> Self {
        Self {
            source: Box::new(source),
            lexer: Box::new(CppLexer::new()),
            oracle: None,
            order: Vec::new(),
            files: HashMap::new(),
            options: RewriteOptions::default(),
            rules: RuleSet::standard(),
        }
    }

    pub fn with_options(mut self, options: RewriteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_lexer(mut self, lexer: impl Lexer + 'static) -> Self {
        self.lexer = Box::new(lexer);
        self
    }

    /// Replace the built-in declaration table
    pub fn with_oracle(mut self, oracle: impl DeclarationOracle + 'static) -> Self {
        self.oracle = Some(Box::new(oracle));
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    pub fn set_output_include_prefix(&mut self, prefix: impl Into<String>) {
        self.options.include_prefix = prefix.into();
    }

    /// Load and tokenize a file; adding the same id twice is a no-op
    pub fn add_file(&mut self, id: impl Into<String>) -> Result<(), ConvertError> {
        let id = id.into();
        if self.files.contains_key(&id) {
            debug!(file = %id, "already in session");
            return Ok(());
        }

        let kind = detect_source_kind(&id);
        if !kind.is_supported() {
            warn!(file = %id, "unrecognized extension, treating as C++");
        }

        let buffer = Arc::new(self.source.load(&id)?);
        let tokens = self.lexer.tokenize(&buffer)?;
        info!(file = %id, kind = %kind, lines = buffer.lines().len(), tokens = tokens.len(), "added file");

        self.files.insert(id.clone(), TokenIndex::new(buffer, tokens));
        self.order.push(id);
        Ok(())
    }

    /// File ids in the order they were added
    pub fn file_ids(&self) -> &[String] {
        &self.order
    }

    pub fn tokens(&self, id: &str) -> Option<&TokenIndex> {
        self.files.get(id)
    }

    /// Convert one added file
    pub fn convert(&self, target: &str) -> Result<Conversion, ConvertError> {
        let index = self
            .files
            .get(target)
            .ok_or_else(|| ConvertError::UnknownFile(target.to_string()))?;

        let table;
        let oracle: &dyn DeclarationOracle = match &self.oracle {
            Some(oracle) => oracle.as_ref(),
            None => {
                table = DeclarationTable::build(&self.order, &self.files);
                debug!(declarations = table.declaration_count(), "built declaration table");
                &table
            }
        };

        let resolver = ContextResolver::new(&self.files, oracle);
        let conversion = FileRewriter::new(index, &resolver, &self.rules, &self.options).rewrite();
        info!(
            file = target,
            lines_in = index.buffer().lines().len(),
            lines_out = conversion.lines.len(),
            requirements = conversion.requirements.len(),
            "converted"
        );
        Ok(conversion)
    }
}
