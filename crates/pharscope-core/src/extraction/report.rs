//! Extraction operation reporting.

use std::time::Duration;

use serde::Serialize;

/// Report of one extraction.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Number of files written.
    pub files_extracted: usize,

    /// Number of directory entries created.
    pub directories_created: usize,

    /// Total bytes written to disk, excluding the side-channel file.
    pub bytes_written: u64,

    /// Whether the signature was checked before writing.
    pub signature_verified: bool,

    /// Whether the side-channel file was written.
    pub side_channel_written: bool,

    /// Duration of the extraction.
    pub duration: Duration,
}

impl ExtractionReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns total number of entries written.
    #[must_use]
    pub const fn total_items(&self) -> usize {
        self.files_extracted + self.directories_created
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_report() {
        let report = ExtractionReport::new();
        assert_eq!(report.files_extracted, 0);
        assert_eq!(report.bytes_written, 0);
        assert!(!report.signature_verified);
    }

    #[test]
    fn test_total_items() {
        let report = ExtractionReport {
            files_extracted: 10,
            directories_created: 5,
            ..Default::default()
        };
        assert_eq!(report.total_items(), 15);
    }
}
