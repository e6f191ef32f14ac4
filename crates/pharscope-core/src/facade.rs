//! Single-request entry points: compare two archives, verify one.

use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::ArchiveInfo;
use crate::InspectConfig;
use crate::Result;
use crate::diff::DiffMode;
use crate::diff::DiffStrategy;
use crate::diff::LineWriter;
use crate::extraction::ArchiveExtractor;
use crate::info::CompressionTally;
use crate::phar::PharArchive;
use crate::signature::verify_block;

/// Two archives opened for comparison.
///
/// # Examples
///
/// ```no_run
/// use pharscope_core::ArchiveComparison;
/// use pharscope_core::InspectConfig;
/// use pharscope_core::diff::DiffMode;
/// use pharscope_core::diff::IoLineWriter;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let config = InspectConfig::default();
/// let mut comparison = ArchiveComparison::open("old.phar", "new.phar", &config)?;
/// if !comparison.equal()? {
///     let mut out = IoLineWriter::new(std::io::stdout());
///     comparison.diff(&DiffMode::Checksum, &mut out)?;
/// }
/// comparison.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveComparison {
    config: InspectConfig,
    a: ArchiveInfo,
    b: ArchiveInfo,
}

impl ArchiveComparison {
    /// Extracts both archives, each in its own child process.
    ///
    /// If the second archive fails, the first one's tree is removed before
    /// the error is returned.
    pub fn open<A, B>(a: A, b: B, config: &InspectConfig) -> Result<Self>
    where
        A: AsRef<Path>,
        B: AsRef<Path>,
    {
        let extractor = ArchiveExtractor::from_config(config);
        let a = ArchiveInfo::open(a.as_ref(), &extractor)?;
        let b = ArchiveInfo::open(b.as_ref(), &extractor)?;
        Ok(Self::from_parts(a, b, config))
    }

    /// Compares two already inspected archives.
    #[must_use]
    pub fn from_parts(a: ArchiveInfo, b: ArchiveInfo, config: &InspectConfig) -> Self {
        Self {
            config: config.clone(),
            a,
            b,
        }
    }

    /// First archive.
    #[must_use]
    pub const fn first(&self) -> &ArchiveInfo {
        &self.a
    }

    /// Second archive.
    #[must_use]
    pub const fn second(&self) -> &ArchiveInfo {
        &self.b
    }

    /// Reproducible-build equality, see [`ArchiveInfo::equals`].
    pub fn equal(&self) -> Result<bool> {
        let equal = self.a.equals(&self.b)?;
        debug!(a = %self.a.display_name(), b = %self.b.display_name(), equal, "compared archives");
        Ok(equal)
    }

    /// Writes the differences according to `mode`.
    pub fn diff(&self, mode: &DiffMode, sink: &mut dyn LineWriter) -> Result<()> {
        self.diff_with(mode.strategy(&self.config).as_ref(), sink)
    }

    /// Writes the differences using a custom strategy.
    pub fn diff_with(&self, strategy: &dyn DiffStrategy, sink: &mut dyn LineWriter) -> Result<()> {
        strategy.diff(&self.a, &self.b, sink)
    }

    /// Compression tallies of both archives.
    #[must_use]
    pub fn compression_tallies(&self) -> (CompressionTally, CompressionTally) {
        (self.a.compression_tally(), self.b.compression_tally())
    }

    /// Removes both extracted trees. Both are attempted even if the first
    /// fails; the first error is returned.
    pub fn close(&mut self) -> Result<()> {
        let first = self.a.close();
        let second = self.b.close();
        first.and(second)
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureReport {
    /// Algorithm label, `None` for unsigned archives.
    pub algorithm: Option<String>,
    /// Stored signature as upper-case hex.
    pub hash: Option<String>,
    /// Whether the signature matches; always `false` when unsigned.
    pub verified: bool,
}

impl SignatureReport {
    /// Returns `true` if the archive carries a signature.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.algorithm.is_some()
    }
}

/// Checks the signature of the archive at `path`.
///
/// A signature that does not match is reported with `verified: false`.
///
/// # Errors
///
/// Returns [`crate::PharError::InvalidArchive`] for unreadable or malformed
/// archives, and [`crate::PharError::SignatureConfiguration`] when the
/// verifier cannot be set up.
pub fn verify_signature(path: impl AsRef<Path>) -> Result<SignatureReport> {
    let path = path.as_ref();
    let archive = PharArchive::open(path)?;
    let Some(block) = archive.signature() else {
        debug!(archive = %path.display(), "archive is not signed");
        return Ok(SignatureReport {
            algorithm: None,
            hash: None,
            verified: false,
        });
    };

    let verified = verify_block(path, archive.signed_bytes(), block)?;
    Ok(SignatureReport {
        algorithm: Some(block.algorithm.label().to_string()),
        hash: Some(block.hash_hex()),
        verified,
    })
}
