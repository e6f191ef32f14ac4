//! Error types for archive inspection, comparison, and verification.

use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using `PharError`.
pub type Result<T> = std::result::Result<T, PharError>;

/// Why an archive could not be used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidArchiveReason {
    /// The archive path does not exist.
    FileNotFound,
    /// The archive exists but cannot be read.
    NotReadable,
    /// The extraction subprocess exited with a failure status.
    ExtractionFailed {
        /// Diagnostic text captured from the subprocess stderr.
        stderr: String,
    },
    /// The bytes are not a well-formed archive.
    Malformed(String),
    /// An OpenSSL-signed archive has no `.pubkey` sidecar next to it.
    MissingPublicKey,
    /// The stored signature does not match the archive contents.
    SignatureMismatch,
    /// The extracted tree lacks a readable metadata side-channel file.
    MissingSideChannel(String),
}

impl std::fmt::Display for InvalidArchiveReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FileNotFound => write!(f, "file not found"),
            Self::NotReadable => write!(f, "file is not readable"),
            Self::ExtractionFailed { stderr } => {
                let stderr = stderr.trim();
                if stderr.is_empty() {
                    write!(f, "extraction failed")
                } else {
                    write!(f, "extraction failed: {stderr}")
                }
            }
            Self::Malformed(msg) => write!(f, "malformed archive: {msg}"),
            Self::MissingPublicKey => write!(f, "public key sidecar file is missing"),
            Self::SignatureMismatch => write!(f, "signature does not match archive contents"),
            Self::MissingSideChannel(msg) => write!(f, "metadata side-channel unreadable: {msg}"),
        }
    }
}

/// Errors raised by the inspection engine.
#[derive(Error, Debug)]
pub enum PharError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The archive is unusable for any further operation.
    #[error("invalid archive {}: {reason}", path.display())]
    InvalidArchive {
        /// Path of the offending archive.
        path: PathBuf,
        /// What went wrong.
        reason: InvalidArchiveReason,
    },

    /// Equality was requested on an archive signed with an asymmetric key.
    #[error("cannot compare {}: archive is signed with a public key", path.display())]
    IncomparableArchives {
        /// Archive carrying the public key.
        path: PathBuf,
    },

    /// An external program could not be run or gave an unusable result.
    #[error("failed to invoke `{tool}`: {reason}")]
    ToolInvocationFailure {
        /// Program name as given in the command line.
        tool: String,
        /// What went wrong.
        reason: String,
    },

    /// The verifier cannot be set up (key sidecar, algorithm, or backend).
    #[error("signature configuration error: {0}")]
    SignatureConfiguration(String),

    /// The archive's extracted tree was already disposed.
    #[error("archive {} was already closed", path.display())]
    ArchiveClosed {
        /// Path of the closed archive.
        path: PathBuf,
    },

    /// The metadata side-channel could not be (de)serialized.
    #[error("side-channel serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PharError {
    pub(crate) fn invalid(path: impl Into<PathBuf>, reason: InvalidArchiveReason) -> Self {
        Self::InvalidArchive {
            path: path.into(),
            reason,
        }
    }

    pub(crate) fn malformed(path: impl Into<PathBuf>, msg: impl Into<String>) -> Self {
        Self::invalid(path, InvalidArchiveReason::Malformed(msg.into()))
    }

    /// Returns `true` if the archive involved cannot be used any further.
    ///
    /// `IncomparableArchives` only invalidates the equality call that raised
    /// it; other queries on the same archive remain valid.
    ///
    /// # Examples
    ///
    /// ```
    /// use pharscope_core::PharError;
    /// use pharscope_core::error::InvalidArchiveReason;
    /// use std::path::PathBuf;
    ///
    /// let err = PharError::InvalidArchive {
    ///     path: PathBuf::from("app.phar"),
    ///     reason: InvalidArchiveReason::FileNotFound,
    /// };
    /// assert!(err.is_fatal_for_archive());
    ///
    /// let err = PharError::IncomparableArchives {
    ///     path: PathBuf::from("app.phar"),
    /// };
    /// assert!(!err.is_fatal_for_archive());
    /// ```
    #[must_use]
    pub const fn is_fatal_for_archive(&self) -> bool {
        matches!(
            self,
            Self::InvalidArchive { .. } | Self::ArchiveClosed { .. }
        )
    }

    /// Returns the invalid-archive reason, if applicable.
    #[must_use]
    pub const fn invalid_reason(&self) -> Option<&InvalidArchiveReason> {
        match self {
            Self::InvalidArchive { reason, .. } => Some(reason),
            _ => None,
        }
    }

    /// Archive the error is about, when it names one.
    #[must_use]
    pub fn archive_path(&self) -> Option<&Path> {
        match self {
            Self::InvalidArchive { path, .. }
            | Self::IncomparableArchives { path }
            | Self::ArchiveClosed { path } => Some(path.as_path()),
            _ => None,
        }
    }

    /// Returns a context string for this error, if available.
    ///
    /// # Examples
    ///
    /// ```
    /// use pharscope_core::PharError;
    ///
    /// let err = PharError::SignatureConfiguration("unknown algorithm".to_string());
    /// assert_eq!(err.context(), Some("unknown algorithm"));
    /// ```
    #[must_use]
    pub fn context(&self) -> Option<&str> {
        match self {
            Self::SignatureConfiguration(msg) => Some(msg),
            Self::ToolInvocationFailure { reason, .. } => Some(reason),
            Self::InvalidArchive {
                reason: InvalidArchiveReason::ExtractionFailed { stderr },
                ..
            } => Some(stderr),
            Self::InvalidArchive {
                reason: InvalidArchiveReason::Malformed(msg),
                ..
            } => Some(msg),
            _ => None,
        }
    }
}
