//! Error conversion utilities for CLI.
//!
//! Converts pharscope-core's typed errors (thiserror) into user-friendly
//! contextual errors (anyhow) with actionable guidance.

use anyhow::anyhow;
use pharscope_core::PharError;
use pharscope_core::error::InvalidArchiveReason;
use std::path::Path;

/// A failure already included in the command's formatted result.
///
/// Human output still prints it; JSON output has carried it in the result
/// envelope.
#[derive(Debug)]
pub struct ReportedFailure(pub String);

impl std::fmt::Display for ReportedFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ReportedFailure {}

/// Converts `PharError` to user-friendly anyhow error with context
pub fn convert_phar_error(err: PharError, archive: &Path) -> anyhow::Error {
    match err {
        PharError::InvalidArchive { path, reason } => convert_invalid(&path, reason),
        PharError::IncomparableArchives { path } => {
            anyhow!(
                "Cannot compare '{}': it is signed with a private key\n\
                 HINT: Each build produces a different signature. Use --mode list or \
                 --mode gnu to see content differences instead.",
                path.display()
            )
        }
        PharError::ToolInvocationFailure { tool, reason } => {
            anyhow!(
                "Failed to run '{tool}': {reason}\n\
                 HINT: Check that the program is installed and on PATH."
            )
        }
        PharError::SignatureConfiguration(msg) => {
            anyhow!(
                "Cannot verify signature of '{}': {msg}\n\
                 HINT: Public-key signatures need the openssl or rsa feature enabled.",
                archive.display()
            )
        }
        PharError::Io(io_err) => {
            anyhow!(
                "I/O error while processing '{}': {}",
                archive.display(),
                io_err
            )
        }
        _ => anyhow::Error::from(err)
            .context(format!("Error processing archive '{}'", archive.display())),
    }
}

fn convert_invalid(path: &Path, reason: InvalidArchiveReason) -> anyhow::Error {
    match reason {
        InvalidArchiveReason::FileNotFound => {
            anyhow!("Archive not found: {}", path.display())
        }
        InvalidArchiveReason::NotReadable => {
            anyhow!(
                "Archive is not readable: {}\n\
                 HINT: Check the file permissions.",
                path.display()
            )
        }
        InvalidArchiveReason::MissingPublicKey => {
            anyhow!(
                "Public key missing for '{}'\n\
                 HINT: OpenSSL-signed archives need their key next to them as '{}.pubkey'.",
                path.display(),
                path.display()
            )
        }
        InvalidArchiveReason::SignatureMismatch => {
            anyhow!(
                "Signature of '{}' does not match its contents\n\
                 HINT: The archive was modified after signing. Do not use it.",
                path.display()
            )
        }
        InvalidArchiveReason::ExtractionFailed { stderr } => {
            anyhow!(
                "Extraction of '{}' failed: {}\n\
                 HINT: Run 'pharscope extract' on the archive to see the full error.",
                path.display(),
                stderr.trim()
            )
        }
        reason => {
            anyhow!(
                "Invalid archive '{}': {}\n\
                 HINT: The archive may be corrupted or malformed.",
                path.display(),
                reason
            )
        }
    }
}

/// Adds context to a generic error about archive operations
pub fn add_archive_context<T>(
    result: Result<T, PharError>,
    archive: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_phar_error(e, archive))
}

/// Converts an error raised while comparing `a` with `b`.
///
/// Errors that carry an archive path name that archive; the rest name both.
pub fn convert_comparison_error(err: PharError, a: &Path, b: &Path) -> anyhow::Error {
    if let Some(path) = err.archive_path().map(Path::to_path_buf) {
        return convert_phar_error(err, &path);
    }
    match err {
        PharError::Io(io_err) => {
            anyhow!(
                "I/O error while comparing '{}' and '{}': {}",
                a.display(),
                b.display(),
                io_err
            )
        }
        other => convert_phar_error(other, a)
            .context(format!("Failed to compare '{}' and '{}'", a.display(), b.display())),
    }
}

/// Like [`add_archive_context`] for operations on two archives.
pub fn add_comparison_context<T>(
    result: Result<T, PharError>,
    a: &Path,
    b: &Path,
) -> anyhow::Result<T> {
    result.map_err(|e| convert_comparison_error(e, a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::path::PathBuf;

    fn invalid(reason: InvalidArchiveReason) -> PharError {
        PharError::InvalidArchive {
            path: PathBuf::from("app.phar"),
            reason,
        }
    }

    #[test]
    fn test_convert_file_not_found() {
        let converted =
            convert_phar_error(invalid(InvalidArchiveReason::FileNotFound), Path::new("app.phar"));
        let msg = format!("{converted:?}");
        assert!(msg.contains("Archive not found"));
        assert!(msg.contains("app.phar"));
    }

    #[test]
    fn test_convert_signature_mismatch() {
        let converted = convert_phar_error(
            invalid(InvalidArchiveReason::SignatureMismatch),
            Path::new("app.phar"),
        );
        let msg = format!("{converted:?}");
        assert!(msg.contains("does not match"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_missing_public_key() {
        let converted = convert_phar_error(
            invalid(InvalidArchiveReason::MissingPublicKey),
            Path::new("app.phar"),
        );
        let msg = format!("{converted:?}");
        assert!(msg.contains("app.phar.pubkey"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_malformed() {
        let converted = convert_phar_error(
            invalid(InvalidArchiveReason::Malformed("truncated manifest".into())),
            Path::new("app.phar"),
        );
        let msg = format!("{converted:?}");
        assert!(msg.contains("truncated manifest"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_extraction_failed_keeps_stderr() {
        let converted = convert_phar_error(
            invalid(InvalidArchiveReason::ExtractionFailed {
                stderr: "Error: bad things\n".into(),
            }),
            Path::new("app.phar"),
        );
        let msg = format!("{converted:?}");
        assert!(msg.contains("bad things"));
    }

    #[test]
    fn test_convert_incomparable() {
        let err = PharError::IncomparableArchives {
            path: PathBuf::from("signed.phar"),
        };
        let msg = format!("{:?}", convert_phar_error(err, Path::new("signed.phar")));
        assert!(msg.contains("signed.phar"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_tool_failure() {
        let err = PharError::ToolInvocationFailure {
            tool: "difftool".into(),
            reason: "No such file or directory".into(),
        };
        let msg = format!("{:?}", convert_phar_error(err, Path::new("a.phar")));
        assert!(msg.contains("difftool"));
        assert!(msg.contains("HINT"));
    }

    #[test]
    fn test_convert_io_error() {
        let err = PharError::Io(io::Error::other("disk full"));
        let msg = format!("{:?}", convert_phar_error(err, Path::new("a.phar")));
        assert!(msg.contains("I/O error"));
        assert!(msg.contains("disk full"));
    }

    #[test]
    fn test_add_archive_context_passes_ok() {
        let result: Result<u32, PharError> = Ok(7);
        assert_eq!(add_archive_context(result, Path::new("a.phar")).ok(), Some(7));
    }

    #[test]
    fn test_comparison_error_names_failing_archive() {
        let err = PharError::InvalidArchive {
            path: PathBuf::from("b.phar"),
            reason: InvalidArchiveReason::FileNotFound,
        };
        let msg = format!(
            "{:?}",
            convert_comparison_error(err, Path::new("a.phar"), Path::new("b.phar"))
        );
        assert!(msg.contains("Archive not found: b.phar"));
        assert!(!msg.contains("a.phar"));
    }

    #[test]
    fn test_comparison_error_names_both_without_path() {
        let err = PharError::Io(io::Error::other("disk full"));
        let msg = format!(
            "{:?}",
            convert_comparison_error(err, Path::new("a.phar"), Path::new("b.phar"))
        );
        assert!(msg.contains("'a.phar' and 'b.phar'"));
        assert!(msg.contains("disk full"));

        let err = PharError::ToolInvocationFailure {
            tool: "difftool".into(),
            reason: "exited with status 2".into(),
        };
        let msg = format!(
            "{:#}",
            convert_comparison_error(err, Path::new("a.phar"), Path::new("b.phar"))
        );
        assert!(msg.starts_with("Failed to compare 'a.phar' and 'b.phar'"));
        assert!(msg.contains("difftool"));
    }
}
