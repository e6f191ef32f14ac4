//! Human-readable output formatter with colors and styling.

use super::formatter::DiffSummary;
use super::formatter::OutputFormatter;
use crate::progress::humanize_bytes;
use anyhow::Result;
use console::Term;
use console::style;
use pharscope_core::ArchiveInfo;
use pharscope_core::SignatureReport;
use pharscope_core::diff::LineStyle;
use pharscope_core::diff::LineWriter;
use pharscope_core::extraction::ExtractionReport;
use std::path::Path;

/// Diff sink that colors lines by style on a terminal.
pub struct TermLineWriter<'a> {
    term: &'a Term,
    use_colors: bool,
}

impl<'a> TermLineWriter<'a> {
    pub const fn new(term: &'a Term, use_colors: bool) -> Self {
        Self { term, use_colors }
    }

    fn render(&self, line_style: LineStyle, line: &str) -> String {
        if !self.use_colors {
            return line.to_string();
        }
        match line_style {
            LineStyle::Plain => line.to_string(),
            LineStyle::Header => style(line).bold().to_string(),
            LineStyle::Removed => style(line).red().to_string(),
            LineStyle::Added => style(line).green().to_string(),
        }
    }
}

impl LineWriter for TermLineWriter<'_> {
    fn write_styled(&mut self, line_style: LineStyle, line: &str) -> std::io::Result<()> {
        self.term.write_line(&self.render(line_style, line))
    }
}

pub struct HumanFormatter {
    verbose: bool,
    quiet: bool,
    use_colors: bool,
    term: Term,
}

impl HumanFormatter {
    pub fn new(verbose: bool, quiet: bool) -> Self {
        Self {
            verbose,
            quiet,
            use_colors: console::colors_enabled(),
            term: Term::stdout(),
        }
    }

    fn headline(&self, ok: bool, message: &str) {
        if self.use_colors {
            let mark = if ok {
                style("✓").green().bold()
            } else {
                style("✗").red().bold()
            };
            let _ = self.term.write_line(&format!("{mark} {message}"));
        } else {
            let _ = self.term.write_line(message);
        }
    }

    fn field(&self, name: &str, value: impl std::fmt::Display) {
        let _ = self.term.write_line(&format!("  {name:<13}{value}"));
    }
}

impl OutputFormatter for HumanFormatter {
    fn format_extraction_result(&self, report: &ExtractionReport) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        self.headline(true, "Extraction complete");
        self.field("Files:", report.files_extracted);
        self.field("Directories:", report.directories_created);
        self.field("Total size:", humanize_bytes(report.bytes_written));
        if report.signature_verified {
            self.field("Signature:", "verified");
        }

        if self.verbose {
            self.field("Duration:", format!("{:?}", report.duration));
        }

        Ok(())
    }

    fn format_info(&self, info: &ArchiveInfo) -> Result<()> {
        if self.quiet {
            return Ok(());
        }

        let metadata = info.metadata();
        let _ = self
            .term
            .write_line(&format!("Archive: {}", info.path().display()));
        self.field("API version:", metadata.version.as_deref().unwrap_or("unknown"));
        match &metadata.signature {
            Some(sig) => self.field("Signature:", format!("{} {}", sig.hash_type, sig.hash)),
            None => self.field("Signature:", "none"),
        }
        self.field(
            "Metadata:",
            metadata.normalized_metadata.as_deref().unwrap_or("none"),
        );
        self.field("Files:", info.files().len());
        self.field("Compression:", info.compression_tally());

        if self.verbose
            && let Some(stub) = &metadata.stub
        {
            let _ = self.term.write_line("");
            let _ = self.term.write_line("Stub:");
            for line in stub.lines() {
                let _ = self.term.write_line(&format!("  {line}"));
            }
        }

        if !info.files().is_empty() {
            let _ = self.term.write_line("");
            for entry in info.files() {
                let _ = self.term.write_line(&format!(
                    "  {:<5}{:>10}  {}",
                    entry.compression.label(),
                    humanize_bytes(entry.compressed_size),
                    entry.path
                ));
            }
        }

        Ok(())
    }

    fn format_diff(&self, summary: &DiffSummary<'_>) -> Result<()> {
        match summary.equal {
            Some(true) => {
                if !self.quiet {
                    self.headline(true, "Archives are identical");
                }
                return Ok(());
            }
            Some(false) => self.headline(false, "Archives differ"),
            None => self.format_warning("Equality cannot be decided for public-key signed archives"),
        }

        if self.quiet {
            return Ok(());
        }

        let mut sink = TermLineWriter::new(&self.term, self.use_colors);
        let _ = self.term.write_line("");
        for (line_style, line) in &summary.lines {
            sink.write_styled(*line_style, line)?;
        }

        let (a, b) = &summary.tallies;
        if a != b || self.verbose {
            let _ = self.term.write_line("");
            let _ = self.term.write_line("Compression:");
            let _ = self
                .term
                .write_line(&format!("  {}: {a}", summary.a.display()));
            let _ = self
                .term
                .write_line(&format!("  {}: {b}", summary.b.display()));
        }

        Ok(())
    }

    fn format_verification(
        &self,
        archive: &Path,
        report: &SignatureReport,
        _failure: Option<&str>,
    ) -> Result<()> {
        let (Some(algorithm), Some(hash)) = (&report.algorithm, &report.hash) else {
            self.format_warning(&format!("{} is not signed", archive.display()));
            return Ok(());
        };

        if report.verified {
            if self.quiet {
                return Ok(());
            }
            self.headline(true, &format!("Signature verified: {}", archive.display()));
        } else {
            self.headline(false, &format!("Signature mismatch: {}", archive.display()));
        }
        if !self.quiet {
            self.field("Algorithm:", algorithm);
            self.field("Hash:", hash);
        }
        Ok(())
    }

    fn format_error(&self, _operation: &str, error: &anyhow::Error) {
        // Shown even in quiet mode, on stderr so stdout stays clean.
        let term = Term::stderr();
        let label = if self.use_colors && term.is_term() {
            style("Error:").red().bold().to_string()
        } else {
            "Error:".to_string()
        };
        let _ = term.write_line(&format!("{label} {}", render_error(error)));
    }

    fn format_warning(&self, message: &str) {
        if self.quiet {
            return;
        }

        if self.use_colors {
            let _ = self
                .term
                .write_line(&format!("{} {message}", style("⚠").yellow().bold()));
        } else {
            let _ = self.term.write_line(&format!("WARNING: {message}"));
        }
    }
}

/// Error message followed by its causes, one per line.
fn render_error(error: &anyhow::Error) -> String {
    use std::fmt::Write as _;

    let mut text = error.to_string();
    for cause in error.chain().skip(1) {
        let _ = write!(text, "\n  Caused by: {cause}");
    }
    text
}
