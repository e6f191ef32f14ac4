//! Human-readable differences between two inspected archives.
//!
//! Every strategy writes to a [`LineWriter`]. Finding differences is not an
//! error: a strategy either writes the differences or the
//! [`NO_DIFFERENCES`] line. Only I/O and tool invocation failures are
//! returned as errors.
//!
//! The side-channel file is never part of a diff.

mod checksum;
mod external;
mod filename;

use std::io::Write;

use crate::ArchiveInfo;
use crate::InspectConfig;
use crate::Result;

pub use checksum::ChecksumDiffer;
pub use external::ExternalToolDiffer;
pub use filename::FilenameDiff;
pub use filename::FilenameDiffer;

/// Line written when two archives show no differences.
pub const NO_DIFFERENCES: &str = "No differences";

/// How a line should be presented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    /// Ordinary text.
    Plain,
    /// Section or hunk header.
    Header,
    /// Present only in the first archive.
    Removed,
    /// Present only in the second archive.
    Added,
}

/// Line-oriented output sink. Styling is up to the implementation.
pub trait LineWriter {
    /// Writes one line (without trailing newline) with a style hint.
    fn write_styled(&mut self, style: LineStyle, line: &str) -> std::io::Result<()>;

    /// Writes one plain line.
    fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        self.write_styled(LineStyle::Plain, line)
    }
}

impl LineWriter for Vec<String> {
    fn write_styled(&mut self, _style: LineStyle, line: &str) -> std::io::Result<()> {
        self.push(line.to_string());
        Ok(())
    }
}

impl LineWriter for Vec<(LineStyle, String)> {
    fn write_styled(&mut self, style: LineStyle, line: &str) -> std::io::Result<()> {
        self.push((style, line.to_string()));
        Ok(())
    }
}

/// Unstyled sink over any [`Write`].
#[derive(Debug)]
pub struct IoLineWriter<W: Write> {
    inner: W,
}

impl<W: Write> IoLineWriter<W> {
    /// Wraps `inner`.
    pub const fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Returns the wrapped writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> LineWriter for IoLineWriter<W> {
    fn write_styled(&mut self, _style: LineStyle, line: &str) -> std::io::Result<()> {
        writeln!(self.inner, "{line}")
    }
}

/// A way of presenting differences between two archives.
pub trait DiffStrategy {
    /// Writes the differences between `a` and `b` to `sink`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the sink, the extracted trees, or an
    /// external tool fail.
    fn diff(&self, a: &ArchiveInfo, b: &ArchiveInfo, sink: &mut dyn LineWriter) -> Result<()>;
}

/// Built-in diff strategies.
///
/// # Examples
///
/// ```
/// use pharscope_core::InspectConfig;
/// use pharscope_core::diff::DiffMode;
///
/// let mode: DiffMode = "list".parse().unwrap();
/// let _strategy = mode.strategy(&InspectConfig::default());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffMode {
    /// Per-file checksum listing, unified diff.
    Checksum,
    /// Paths present on one side only.
    List,
    /// GNU `diff` over the extracted trees.
    Gnu,
    /// Caller-supplied command template.
    Command(String),
}

impl DiffMode {
    /// Builds the strategy for this mode.
    #[must_use]
    pub fn strategy(&self, config: &InspectConfig) -> Box<dyn DiffStrategy> {
        match self {
            Self::Checksum => Box::new(ChecksumDiffer::new()),
            Self::List => Box::new(FilenameDiffer),
            Self::Gnu => Box::new(ExternalToolDiffer::new(config.gnu_diff_template.clone())),
            Self::Command(template) => Box::new(ExternalToolDiffer::new(template.clone())),
        }
    }

    /// Mode name as accepted by [`str::parse`].
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Checksum => "checksum",
            Self::List => "list",
            Self::Gnu => "gnu",
            Self::Command(_) => "command",
        }
    }
}

impl std::str::FromStr for DiffMode {
    type Err = String;

    /// Parses `checksum`, `list`, `gnu`; anything else is a command template.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("empty diff mode".to_string()),
            "checksum" => Ok(Self::Checksum),
            "list" => Ok(Self::List),
            "gnu" => Ok(Self::Gnu),
            template => Ok(Self::Command(template.to_string())),
        }
    }
}

/// Labels used for `a` and `b` in output: display names, or full paths when
/// the names collide.
pub(crate) fn labels(a: &ArchiveInfo, b: &ArchiveInfo) -> (String, String) {
    if a.display_name() == b.display_name() {
        (
            a.path().display().to_string(),
            b.path().display().to_string(),
        )
    } else {
        (a.display_name().to_string(), b.display_name().to_string())
    }
}
