//! Path-set comparison.

use serde::Serialize;

use super::DiffStrategy;
use super::LineStyle;
use super::LineWriter;
use super::NO_DIFFERENCES;
use super::labels;
use crate::ArchiveInfo;
use crate::Result;

/// Paths present in only one of two archives, sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilenameDiff {
    /// In the first archive only.
    pub only_in_a: Vec<String>,
    /// In the second archive only.
    pub only_in_b: Vec<String>,
}

impl FilenameDiff {
    /// Combined count of both lists.
    #[must_use]
    pub fn total(&self) -> usize {
        self.only_in_a.len() + self.only_in_b.len()
    }

    /// Returns `true` when both archives hold the same paths.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Compares the sets of file paths and ignores file contents.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameDiffer;

impl FilenameDiffer {
    /// Computes both set differences.
    #[must_use]
    pub fn compute(a: &ArchiveInfo, b: &ArchiveInfo) -> FilenameDiff {
        let left = a.files().paths();
        let right = b.files().paths();
        FilenameDiff {
            only_in_a: left.difference(&right).map(|p| (*p).to_string()).collect(),
            only_in_b: right.difference(&left).map(|p| (*p).to_string()).collect(),
        }
    }
}

impl DiffStrategy for FilenameDiffer {
    fn diff(&self, a: &ArchiveInfo, b: &ArchiveInfo, sink: &mut dyn LineWriter) -> Result<()> {
        let diff = Self::compute(a, b);
        if diff.is_empty() {
            sink.write_line(NO_DIFFERENCES)?;
            return Ok(());
        }

        let (a_label, b_label) = labels(a, b);
        for (label, paths, style, marker) in [
            (&a_label, &diff.only_in_a, LineStyle::Removed, '-'),
            (&b_label, &diff.only_in_b, LineStyle::Added, '+'),
        ] {
            sink.write_styled(
                LineStyle::Header,
                &format!("Files only in {label} ({}):", paths.len()),
            )?;
            for path in paths {
                sink.write_styled(style, &format!("{marker} {path}"))?;
            }
        }
        sink.write_line(&format!("{} file(s) differ", diff.total()))?;
        Ok(())
    }
}
