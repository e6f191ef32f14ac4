//! Output formatter trait for CLI results.

use anyhow::Result;
use pharscope_core::ArchiveInfo;
use pharscope_core::CompressionTally;
use pharscope_core::SignatureReport;
use pharscope_core::diff::LineStyle;
use pharscope_core::extraction::ExtractionReport;
use serde::Serialize;
use std::path::Path;

/// Outcome of the `diff` command.
#[derive(Debug)]
pub struct DiffSummary<'a> {
    pub a: &'a Path,
    pub b: &'a Path,
    pub mode: &'a str,
    /// `None` when equality could not be decided (public-key signed).
    pub equal: Option<bool>,
    /// Difference lines; empty when the archives are equal.
    pub lines: Vec<(LineStyle, String)>,
    pub tallies: (CompressionTally, CompressionTally),
}

/// Common output formatter trait
pub trait OutputFormatter {
    /// Format extraction result
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()>;

    /// Format archive facts
    fn format_info(&self, info: &ArchiveInfo) -> Result<()>;

    /// Format comparison result
    fn format_diff(&self, summary: &DiffSummary<'_>) -> Result<()>;

    /// Format signature check result
    ///
    /// `failure` is set when the command is about to fail because of this
    /// result.
    fn format_verification(
        &self,
        archive: &Path,
        report: &SignatureReport,
        failure: Option<&str>,
    ) -> Result<()>;

    /// Report a failed `operation`
    fn format_error(&self, operation: &str, error: &anyhow::Error);

    /// Format warning message
    fn format_warning(&self, message: &str);
}

/// Generic JSON output structure
#[derive(Debug, Serialize)]
pub struct JsonOutput<T> {
    pub operation: String,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(operation: impl Into<String>, data: T) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Success,
            data: Some(data),
            error: None,
        }
    }

    /// Envelope for a failed operation that still produced `data`.
    pub fn failure(operation: impl Into<String>, data: T, error: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            status: Status::Error,
            data: Some(data),
            error: Some(error.into()),
        }
    }

    pub fn error(operation: impl Into<String>, error: impl Into<String>) -> JsonOutput<()> {
        JsonOutput {
            operation: operation.into(),
            status: Status::Error,
            data: None,
            error: Some(error.into()),
        }
    }
}
