//! Checksum listing diff.

use std::fmt::Write as _;
use std::path::Path;

use sha2::Digest;
use sha2::Sha256;
use similar::ChangeTag;
use similar::TextDiff;

use super::DiffStrategy;
use super::LineStyle;
use super::LineWriter;
use super::NO_DIFFERENCES;
use super::labels;
use crate::ArchiveInfo;
use crate::Result;

/// Renders one `path  sha256  size` line per extracted file and shows a
/// unified diff of the two renderings. Only changed lines are written.
///
/// By default only contents are compared, so two archives holding the same
/// files with different per-file compression show no differences. Enable
/// [`with_compression`](Self::with_compression) to also list each file's
/// compression and stored size.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumDiffer {
    with_compression: bool,
}

impl ChecksumDiffer {
    /// Content-only differ.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            with_compression: false,
        }
    }

    /// Also compare compression algorithm and compressed size.
    #[must_use]
    pub const fn with_compression(mut self, enabled: bool) -> Self {
        self.with_compression = enabled;
        self
    }

    /// Per-file summary of `info`, one line per file, sorted by path.
    pub fn render(&self, info: &ArchiveInfo) -> Result<String> {
        let root = info.root()?;
        let mut out = String::new();
        for relative in info.extracted_files()? {
            let contents = std::fs::read(root.join(&relative))?;
            let path = archive_path(&relative);
            let _ = write!(
                out,
                "{path}  {}  {}",
                hex::encode(Sha256::digest(&contents)),
                contents.len()
            );
            if self.with_compression {
                match info.files().get(&path) {
                    Some(entry) => {
                        let _ = write!(out, "  {}  {}", entry.compression, entry.compressed_size);
                    }
                    None => out.push_str("  ?  ?"),
                }
            }
            out.push('\n');
        }
        Ok(out)
    }
}

impl DiffStrategy for ChecksumDiffer {
    fn diff(&self, a: &ArchiveInfo, b: &ArchiveInfo, sink: &mut dyn LineWriter) -> Result<()> {
        let left = self.render(a)?;
        let right = self.render(b)?;
        let text_diff = TextDiff::from_lines(left.as_str(), right.as_str());

        let mut unified = text_diff.unified_diff();
        unified.context_radius(0);
        let hunks: Vec<_> = unified.iter_hunks().collect();
        if hunks.is_empty() {
            sink.write_line(NO_DIFFERENCES)?;
            return Ok(());
        }

        let (a_label, b_label) = labels(a, b);
        sink.write_styled(LineStyle::Header, &format!("--- {a_label}"))?;
        sink.write_styled(LineStyle::Header, &format!("+++ {b_label}"))?;
        for hunk in hunks {
            sink.write_styled(LineStyle::Header, &hunk.header().to_string())?;
            for change in hunk.iter_changes() {
                let text = change.value().trim_end_matches(['\r', '\n']);
                match change.tag() {
                    ChangeTag::Delete => sink.write_styled(LineStyle::Removed, &format!("-{text}"))?,
                    ChangeTag::Insert => sink.write_styled(LineStyle::Added, &format!("+{text}"))?,
                    ChangeTag::Equal => {}
                }
            }
        }
        Ok(())
    }
}

/// Forward-slash form of a relative path, as stored in the archive.
fn archive_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
