use serde::Serialize;

use crate::file::checksum;
use crate::rewrite::{Conversion, Injection};

/// Generate a unique execution ID (UUID v4)
pub fn generate_execution_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Summary of one conversion run
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub execution_id: String,
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_checksum: Option<String>,
    pub lines_in: usize,
    pub lines_out: usize,
    /// Include lines injected at the insertion point
    pub headers: Vec<String>,
    pub injection_skipped: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionReport {
    pub fn success(execution_id: String, input_checksum: String, lines_in: usize, conversion: &Conversion) -> Self {
        Self {
            execution_id,
            file: conversion.file.clone(),
            success: true,
            input_checksum: Some(input_checksum),
            output_checksum: Some(checksum(&conversion.text())),
            lines_in,
            lines_out: conversion.lines.len(),
            headers: conversion
                .injected
                .iter()
                .filter(|line| line.starts_with("#include"))
                .cloned()
                .collect(),
            injection_skipped: conversion.injection == Injection::Skipped,
            error: None,
        }
    }

    pub fn failure(execution_id: String, file: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            execution_id,
            file: file.into(),
            success: false,
            input_checksum: None,
            output_checksum: None,
            lines_in: 0,
            lines_out: 0,
            headers: Vec::new(),
            injection_skipped: false,
            error: Some(error.into()),
        }
    }

    /// Short human-readable form
    pub fn summary(&self) -> String {
        if !self.success {
            return format!("Error: {}", self.error.as_deref().unwrap_or("Unknown error"));
        }

        let mut summary = format!(
            "Converted {} ({} -> {} lines)\nHeaders injected: {}",
            self.file,
            self.lines_in,
            self.lines_out,
            self.headers.len()
        );
        if self.injection_skipped {
            summary.push_str("\nNo include or #pragma once line; nothing injected");
        }
        summary
    }
}
