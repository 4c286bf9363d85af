use std::path::Path;

use serde::{Deserialize, Serialize};

/// Settings for one conversion session
///
/// Every field has a default, so a JSON options file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewriteOptions {
    /// Prefix for rewritten quoted includes and locally provided headers
    pub include_prefix: String,
    /// Angle-bracket include prefixes whose lines are removed
    pub dropped_include_prefixes: Vec<String>,
    /// Angle-bracket include prefixes rewritten to quoted local names
    pub local_include_prefixes: Vec<String>,
    /// Declared names treated as string builders by context rules
    pub string_builder_types: Vec<String>,
    /// Declared names treated as generic sequences by context rules
    pub sequence_types: Vec<String>,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            include_prefix: "cpp_parser/".to_string(),
            dropped_include_prefixes: vec!["AK/".to_string()],
            local_include_prefixes: vec!["LibCpp/".to_string()],
            string_builder_types: vec!["StringBuilder".to_string()],
            sequence_types: vec!["Vector".to_string()],
        }
    }
}

/// How a receiver's declared name is treated by context rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverClass {
    StringBuilder,
    Sequence,
    Other,
}

impl RewriteOptions {
    pub fn classify(&self, declared: &str) -> ReceiverClass {
        if self.string_builder_types.iter().any(|t| t == declared) {
            ReceiverClass::StringBuilder
        } else if self.sequence_types.iter().any(|t| t == declared) {
            ReceiverClass::Sequence
        } else {
            ReceiverClass::Other
        }
    }

    /// Load options from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let text = crate::file::read_file(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
