//! In-process extraction: the body of the `extract` entry point.

use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use super::EntryPath;
use super::ExtractionReport;
use crate::PharError;
use crate::Result;
use crate::error::InvalidArchiveReason;
use crate::metadata::SideChannel;
use crate::phar::PharArchive;
use crate::signature::verify_block;

/// Options for [`extract_to`].
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Write the metadata side-channel file next to the extracted files.
    pub internal: bool,

    /// Maximum number of components in an entry path.
    pub max_path_depth: usize,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            internal: false,
            max_path_depth: 32,
        }
    }
}

impl ExtractOptions {
    /// Options used by the extraction subprocess.
    #[must_use]
    pub fn internal() -> Self {
        Self {
            internal: true,
            ..Default::default()
        }
    }
}

/// Reads `archive` and writes its contents under `dest`.
///
/// Signed archives are verified first; a signature that does not match the
/// contents fails the extraction before anything is written.
///
/// # Errors
///
/// Returns [`PharError::InvalidArchive`] when the archive cannot be read,
/// is malformed, holds an unsafe or duplicate entry path, or fails its
/// signature check. I/O failures while writing propagate as
/// [`PharError::Io`].
///
/// # Examples
///
/// ```no_run
/// use pharscope_core::extraction::ExtractOptions;
/// use pharscope_core::extraction::extract_to;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let report = extract_to(Path::new("app.phar"), Path::new("out"), &ExtractOptions::default())?;
/// println!("{} files", report.files_extracted);
/// # Ok(())
/// # }
/// ```
pub fn extract_to(archive: &Path, dest: &Path, options: &ExtractOptions) -> Result<ExtractionReport> {
    let start = Instant::now();
    let phar = PharArchive::open(archive)?;
    let mut report = ExtractionReport::new();

    if let Some(block) = phar.signature() {
        if !verify_block(archive, phar.signed_bytes(), block)? {
            return Err(PharError::invalid(
                archive,
                InvalidArchiveReason::SignatureMismatch,
            ));
        }
        report.signature_verified = true;
    }

    // Validate every path before touching the destination.
    let mut seen = HashSet::new();
    let mut planned = Vec::with_capacity(phar.entries().len());
    for entry in phar.entries() {
        let path = EntryPath::validate(&entry.name, options.max_path_depth)
            .map_err(|msg| PharError::malformed(archive, msg))?;
        if !seen.insert(path.clone()) {
            return Err(PharError::malformed(
                archive,
                format!("duplicate entry {}", entry.name),
            ));
        }
        planned.push((entry, path));
    }

    std::fs::create_dir_all(dest)?;
    for (entry, path) in planned {
        let target = path.resolve(dest);
        if entry.is_dir() {
            std::fs::create_dir_all(&target)?;
            report.directories_created += 1;
            continue;
        }

        let contents = phar.contents(entry)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, &contents)?;
        report.files_extracted += 1;
        report.bytes_written += contents.len() as u64;
    }

    if options.internal {
        let record = SideChannel {
            metadata: phar.archive_metadata(),
            files: phar.file_entries(),
        };
        record.write_to(dest)?;
        report.side_channel_written = true;
    }

    report.duration = start.elapsed();
    debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = report.files_extracted,
        bytes = report.bytes_written,
        "extracted archive"
    );
    Ok(report)
}
