use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

/// Original text of one source file
///
/// The text is kept both as newline-stripped lines (what the rewriter walks)
/// and as one concatenated string (for whole-file checks).
#[derive(Debug, Clone)]
pub struct FileBuffer {
    /// Identifier the file was registered under
    pub id: String,
    lines: Vec<String>,
    text: String,
    /// BLAKE3 hash of the text (hex-encoded)
    pub checksum: String,
}

impl FileBuffer {
    pub fn from_text(id: impl Into<String>, text: &str) -> Self {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        let mut joined = String::with_capacity(text.len() + 1);
        for line in &lines {
            joined.push_str(line);
            joined.push('\n');
        }

        Self {
            id: id.into(),
            lines,
            checksum: checksum(&joined),
            text: joined,
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn line(&self, number: usize) -> Option<&str> {
        self.lines.get(number).map(String::as_str)
    }

    /// Whole file, every line newline-terminated
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// BLAKE3 hash of `text`, hex-encoded
pub fn checksum(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

/// Error types for file operations
#[derive(Debug, Error)]
pub enum FileError {
    #[error("File not found: {0}")]
    NotFound(String),
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid UTF-8 in file: {0}")]
    InvalidUtf8(String),
}

/// Where source text comes from
///
/// The only file-system dependency of a conversion; tests swap in
/// [`MemorySource`].
pub trait FileSource {
    fn load(&self, id: &str) -> Result<FileBuffer, FileError>;
}

/// Reads files from disk, optionally relative to a project root
#[derive(Debug, Clone, Default)]
pub struct FsSource {
    root: Option<PathBuf>,
}

impl FsSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: Some(root.into()) }
    }

    /// Resolve a file identifier against the root
    ///
    /// Identifiers that already live under the root are taken as-is, so
    /// absolute paths and root-relative names address the same file.
    pub fn resolve(&self, id: &str) -> PathBuf {
        let path = Path::new(id);
        match &self.root {
            Some(root) if !path.starts_with(root) => root.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl FileSource for FsSource {
    fn load(&self, id: &str) -> Result<FileBuffer, FileError> {
        let path = self.resolve(id);
        debug!(id, path = %path.display(), "loading source file");
        let content = read_file(&path)?;
        Ok(FileBuffer::from_text(id, &content))
    }
}

/// In-memory file contents keyed by identifier
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, String>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: impl Into<String>, content: impl Into<String>) {
        self.files.insert(id.into(), content.into());
    }

    pub fn with_file(mut self, id: impl Into<String>, content: impl Into<String>) -> Self {
        self.insert(id, content);
        self
    }
}

impl FileSource for MemorySource {
    fn load(&self, id: &str) -> Result<FileBuffer, FileError> {
        self.files
            .get(id)
            .map(|content| FileBuffer::from_text(id, content))
            .ok_or_else(|| FileError::NotFound(id.to_string()))
    }
}

/// Read a file from disk with UTF-8 validation
///
/// # Arguments
/// * `path` - Path to the file to read
///
/// # Returns
/// * `Ok(String)` - File content
/// * `Err(FileError)` - File not found, I/O error, or invalid UTF-8
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<String, FileError> {
    let path_ref = path.as_ref();

    if !path_ref.exists() {
        return Err(FileError::NotFound(path_ref.display().to_string()));
    }

    let bytes = fs::read(path_ref).map_err(|source| FileError::Io {
        path: path_ref.display().to_string(),
        source,
    })?;

    String::from_utf8(bytes).map_err(|_| FileError::InvalidUtf8(path_ref.display().to_string()))
}
