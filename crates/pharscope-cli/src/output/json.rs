//! JSON output formatter for machine-readable results.

use super::formatter::DiffSummary;
use super::formatter::JsonOutput;
use super::formatter::OutputFormatter;
use crate::error::ReportedFailure;
use anyhow::Result;
use pharscope_core::ArchiveInfo;
use pharscope_core::CompressionTally;
use pharscope_core::SignatureReport;
use pharscope_core::diff::LineStyle;
use pharscope_core::extraction::ExtractionReport;
use pharscope_core::metadata::ArchiveMetadata;
use pharscope_core::metadata::FileEntry;
use serde::Serialize;
use std::io::Write;
use std::io::{self};
use std::path::Path;

pub struct JsonFormatter;

impl JsonFormatter {
    fn output<T: Serialize>(value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        writeln!(io::stdout(), "{json}")?;
        Ok(())
    }
}

#[derive(Serialize)]
struct TallyPair<'a> {
    a: &'a CompressionTally,
    b: &'a CompressionTally,
}

impl OutputFormatter for JsonFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        #[derive(Serialize)]
        struct ExtractionOutput {
            files_extracted: usize,
            directories_created: usize,
            bytes_written: u64,
            signature_verified: bool,
            side_channel_written: bool,
            duration_ms: u128,
        }

        let data = ExtractionOutput {
            files_extracted: report.files_extracted,
            directories_created: report.directories_created,
            bytes_written: report.bytes_written,
            signature_verified: report.signature_verified,
            side_channel_written: report.side_channel_written,
            duration_ms: report.duration.as_millis(),
        };

        let output = JsonOutput::success("extract", data);
        Self::output(&output)
    }

    fn format_info(&self, info: &ArchiveInfo) -> Result<()> {
        #[derive(Serialize)]
        struct InfoOutput<'a> {
            archive: String,
            metadata: &'a ArchiveMetadata,
            files: Vec<&'a FileEntry>,
            compression: CompressionTally,
        }

        let data = InfoOutput {
            archive: info.path().display().to_string(),
            metadata: info.metadata(),
            files: info.files().iter().collect(),
            compression: info.compression_tally(),
        };

        let output = JsonOutput::success("info", data);
        Self::output(&output)
    }

    fn format_diff(&self, summary: &DiffSummary<'_>) -> Result<()> {
        #[derive(Serialize)]
        struct DiffOutput<'a> {
            a: String,
            b: String,
            mode: &'a str,
            equal: Option<bool>,
            differences: Vec<&'a str>,
            compression: TallyPair<'a>,
        }

        let data = DiffOutput {
            a: summary.a.display().to_string(),
            b: summary.b.display().to_string(),
            mode: summary.mode,
            equal: summary.equal,
            differences: summary
                .lines
                .iter()
                .filter(|(style, _)| *style != LineStyle::Header)
                .map(|(_, line)| line.as_str())
                .collect(),
            compression: TallyPair {
                a: &summary.tallies.0,
                b: &summary.tallies.1,
            },
        };

        let output = JsonOutput::success("diff", data);
        Self::output(&output)
    }

    fn format_verification(
        &self,
        archive: &Path,
        report: &SignatureReport,
        failure: Option<&str>,
    ) -> Result<()> {
        #[derive(Serialize)]
        struct VerifyOutput<'a> {
            archive: String,
            signed: bool,
            #[serde(flatten)]
            report: &'a SignatureReport,
        }

        let data = VerifyOutput {
            archive: archive.display().to_string(),
            signed: report.is_signed(),
            report,
        };

        let output = match failure {
            Some(error) => JsonOutput::failure("verify", data, error),
            None => JsonOutput::success("verify", data),
        };
        Self::output(&output)
    }

    fn format_error(&self, operation: &str, error: &anyhow::Error) {
        if error.is::<ReportedFailure>() {
            return;
        }
        let output = JsonOutput::<()>::error(operation, format!("{error:#}"));
        let _ = Self::output(&output);
    }

    fn format_warning(&self, message: &str) {
        #[derive(Serialize)]
        struct WarningData {
            message: String,
        }

        let output = JsonOutput::success(
            "warning",
            WarningData {
                message: message.to_string(),
            },
        );
        let _ = Self::output(&output);
    }
}
