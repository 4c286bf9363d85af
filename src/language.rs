use serde::{Deserialize, Serialize};
use std::path::Path;

/// Kind of C-family source file, detected from its extension
///
/// The rewriter only understands C and C++ sources; anything else is still
/// converted but the session logs a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceKind {
    /// Header (.h, .hh, .hpp, .hxx)
    Header,
    /// Implementation file (.c, .cc, .cpp, .cxx)
    Implementation,
    /// Unknown or unsupported file type
    Unknown,
}

impl SourceKind {
    /// Get the file extensions associated with this kind
    ///
    /// # Returns
    /// A slice of extension strings (without the dot)
    pub fn extensions(&self) -> &[&str] {
        match self {
            SourceKind::Header => &["h", "hh", "hpp", "hxx"],
            SourceKind::Implementation => &["c", "cc", "cpp", "cxx"],
            SourceKind::Unknown => &[],
        }
    }

    pub fn name(&self) -> &str {
        match self {
            SourceKind::Header => "header",
            SourceKind::Implementation => "implementation",
            SourceKind::Unknown => "unknown",
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, SourceKind::Unknown)
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Detect the source kind from a file path
///
/// # Examples
/// ```
/// use dialect_rewriter::{SourceKind, detect_source_kind};
/// assert_eq!(detect_source_kind("Parser.h"), SourceKind::Header);
/// assert_eq!(detect_source_kind("src/main.cc"), SourceKind::Implementation);
/// assert_eq!(detect_source_kind("notes.txt"), SourceKind::Unknown);
/// ```
pub fn detect_source_kind<P: AsRef<Path>>(path: P) -> SourceKind {
    let extension = path
        .as_ref()
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("");

    match extension {
        "h" | "hh" | "hpp" | "hxx" => SourceKind::Header,
        "c" | "cc" | "cpp" | "cxx" => SourceKind::Implementation,
        _ => SourceKind::Unknown,
    }
}

/// Map an included file name onto the converted tree's naming
///
/// Names are case-folded and `.h` headers become `.hh`, the extension the
/// converted headers are written with.
///
/// ```
/// use dialect_rewriter::local_include_name;
/// assert_eq!(local_include_name("Parser.h"), "parser.hh");
/// assert_eq!(local_include_name("AST/Node.hh"), "ast/node.hh");
/// ```
pub fn local_include_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    match lowered.strip_suffix(".h") {
        Some(stem) => format!("{}.hh", stem),
        None => lowered,
    }
}
