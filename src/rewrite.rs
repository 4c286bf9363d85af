use serde::Serialize;
use tracing::{debug, warn};

use crate::config::RewriteOptions;
use crate::context::ContextResolver;
use crate::edit::{LineInsertion, apply_insertions};
use crate::language::local_include_name;
use crate::rules::{LineInput, Requirement, Requirements, RuleContext, RuleSet, UsingDirective, collect_debug_constants};
use crate::token::TokenIndex;

/// Marker of string-view literals somewhere in a file
const STRING_VIEW_LITERAL: &str = "\"sv";

/// Whether headers and declarations could be injected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Injection {
    /// Injected before the output line at `insertion_point` (pre-injection index)
    Applied { insertion_point: usize },
    /// No include line and no `#pragma once`; nothing was injected
    Skipped,
}

/// Result of converting one file
#[derive(Debug, Clone)]
pub struct Conversion {
    pub file: String,
    /// Converted lines, without newlines
    pub lines: Vec<String>,
    /// Everything the rules asked for while converting
    pub requirements: Requirements,
    /// Lines actually injected after the line pass
    pub injected: Vec<String>,
    pub injection: Injection,
}

impl Conversion {
    /// The converted file, every line newline-terminated
    pub fn text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line);
            text.push('\n');
        }
        text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    LeadingIncludes,
    Body,
}

/// Output indices recorded while walking the leading include block
#[derive(Debug, Default)]
struct Anchors {
    first_include: Option<usize>,
    after_includes: Option<usize>,
    once_guard: Option<usize>,
}

fn is_include(line: &str) -> bool {
    line.trim_start().starts_with("#include")
}

/// Lines that can sit among leading includes without ending the block
///
/// They still go through the rules; only the include anchors care.
fn is_leading_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty()
        || trimmed.starts_with("//")
        || trimmed.starts_with("/*")
        || trimmed.starts_with('*')
        || trimmed.starts_with('#')
}

fn has_line(lines: &[String], wanted: &str) -> bool {
    lines.iter().any(|line| line.trim() == wanted)
}

/// Converts one file of a session
pub struct FileRewriter<'a> {
    ctx: RuleContext<'a>,
    rules: &'a RuleSet,
}

impl<'a> FileRewriter<'a> {
    pub fn new(
        index: &'a TokenIndex,
        resolver: &'a ContextResolver<'a>,
        rules: &'a RuleSet,
        options: &'a RewriteOptions,
    ) -> Self {
        Self {
            ctx: RuleContext {
                resolver,
                index,
                options,
            },
            rules,
        }
    }

    /// Walk every line, then inject what the rules required
    pub fn rewrite(&self) -> Conversion {
        let buffer = self.ctx.index.buffer();
        let file = buffer.id.as_str();
        let mut out = Vec::with_capacity(buffer.lines().len());
        let mut acc = Requirements::new();
        let mut anchors = Anchors::default();
        let mut phase = Phase::LeadingIncludes;

        for (number, line) in buffer.lines().iter().enumerate() {
            collect_debug_constants(line, &mut acc);

            if is_include(line) {
                let leading = phase == Phase::LeadingIncludes;
                if leading {
                    anchors.first_include.get_or_insert(out.len());
                }
                if let Some(rewritten) = self.rewrite_include(line) {
                    out.push(rewritten);
                }
                if leading {
                    anchors.after_includes = Some(out.len());
                }
                continue;
            }

            if line.trim() == "#pragma once" {
                if phase == Phase::LeadingIncludes {
                    anchors.once_guard.get_or_insert(out.len());
                }
                out.push(line.clone());
                continue;
            }

            if phase == Phase::LeadingIncludes && !is_leading_line(line) {
                debug!(file, line = number, "leaving include block");
                phase = Phase::Body;
            }

            let input = LineInput {
                file,
                number,
                text: line,
            };
            out.extend(self.rules.apply(&input, &self.ctx, &mut acc));
        }

        if buffer.text().contains(STRING_VIEW_LITERAL) {
            acc.require(Requirement::Using(UsingDirective::StringViewLiterals));
        }

        self.inject(out, acc, anchors)
    }

    /// Structural rewrite of an `#include` line; `None` drops the line
    fn rewrite_include(&self, line: &str) -> Option<String> {
        let options = self.ctx.options;
        let target = line.trim_start()["#include".len()..].trim_start();

        if let Some(path) = target.strip_prefix('<') {
            let Some(end) = path.find('>') else {
                warn!(file = self.ctx.index.file(), line, "no closing '>' in include");
                return Some(line.to_string());
            };
            let name = &path[..end];
            if options.dropped_include_prefixes.iter().any(|p| name.starts_with(p.as_str())) {
                return None;
            }
            if let Some(local) = options
                .local_include_prefixes
                .iter()
                .find_map(|p| name.strip_prefix(p.as_str()))
            {
                return Some(format!("#include \"{}\"", local_include_name(local)));
            }
            return Some(line.to_string());
        }

        if let Some(path) = target.strip_prefix('"') {
            let Some(end) = path.rfind('"') else {
                warn!(file = self.ctx.index.file(), line, "no closing '\"' in include");
                return Some(line.to_string());
            };
            let name = &path[..end];
            let prefix = options.include_prefix.as_str();
            let converted = name.ends_with(".hh") || (!prefix.is_empty() && name.starts_with(prefix));
            if converted {
                return Some(line.to_string());
            }
            return Some(format!("#include \"{}{}\"", prefix, local_include_name(name)));
        }

        Some(line.to_string())
    }

    fn inject(&self, mut out: Vec<String>, acc: Requirements, anchors: Anchors) -> Conversion {
        let file = self.ctx.index.file().to_string();
        let mut injected = Vec::new();
        let injection = match anchors.first_include.or(anchors.once_guard.map(|guard| guard + 1)) {
            Some(point) => {
                let after_includes = anchors.after_includes.unwrap_or(point);
                let headers = self.missing_headers(&out, &acc);
                let trailer = missing_trailer(&out, &acc);
                let lines: Vec<String> = headers.iter().chain(&trailer).cloned().collect();
                let insertions = vec![
                    LineInsertion::new(point, headers),
                    LineInsertion::new(after_includes, trailer),
                ];

                match apply_insertions(&mut out, insertions) {
                    Ok(count) => {
                        debug!(file = %file, count, point, "injected lines");
                        injected = lines;
                        Injection::Applied { insertion_point: point }
                    }
                    Err(e) => {
                        warn!(file = %file, error = %e, "injection failed");
                        Injection::Skipped
                    }
                }
            }
            None => {
                if !acc.is_empty() {
                    warn!(file = %file, "no include or #pragma once line, nothing injected");
                }
                Injection::Skipped
            }
        };

        Conversion {
            file,
            lines: out,
            requirements: acc,
            injected,
            injection,
        }
    }

    fn missing_headers(&self, out: &[String], acc: &Requirements) -> Vec<String> {
        let prefix = self.ctx.options.include_prefix.as_str();
        acc.headers()
            .map(|header| header.include_line(prefix))
            .filter(|line| !has_line(out, line))
            .collect()
    }
}

/// Declarations, using-directives and debug switches not already present
fn missing_trailer(out: &[String], acc: &Requirements) -> Vec<String> {
    let mut trailer: Vec<String> = Vec::new();
    for decl in acc.declarations() {
        let lines = decl.lines();
        if !lines.first().is_some_and(|first| has_line(out, first)) {
            trailer.extend(lines.iter().map(|line| line.to_string()));
        }
    }
    for directive in acc.using_directives() {
        if !has_line(out, directive.line()) {
            trailer.push(directive.line().to_string());
        }
    }
    for name in acc.debug_constants() {
        let declaration = format!("constexpr bool {} = false;", name);
        if !has_line(out, &declaration) {
            trailer.push(declaration);
        }
    }
    trailer
}
