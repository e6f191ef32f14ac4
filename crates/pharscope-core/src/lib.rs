//! PHAR archive inspection, comparison, and signature verification.
//!
//! `pharscope-core` answers three questions about self-contained PHP
//! application archives:
//!
//! - are two builds of an archive the same (reproducible-build equality)?
//! - if not, how do they differ?
//! - does an archive's trailing signature match its contents?
//!
//! Archives are never read in the inspecting process. Each one is extracted
//! by a child process (the toolchain's `extract --internal` command) into a
//! private temporary directory, together with a JSON side-channel file
//! carrying the archive's metadata.
//!
//! # Examples
//!
//! ```no_run
//! use pharscope_core::ArchiveComparison;
//! use pharscope_core::InspectConfig;
//! use pharscope_core::verify_signature;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = InspectConfig::default();
//! let comparison = ArchiveComparison::open("build-1.phar", "build-2.phar", &config)?;
//! println!("identical builds: {}", comparison.equal()?);
//!
//! let report = verify_signature("build-1.phar")?;
//! println!("signature ok: {}", report.verified);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod diff;
pub mod error;
pub mod extraction;
pub mod facade;
pub mod info;
pub mod metadata;
pub mod phar;
pub mod signature;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::InspectConfig;
pub use error::PharError;
pub use error::Result;
pub use facade::ArchiveComparison;
pub use facade::SignatureReport;
pub use facade::verify_signature;
pub use info::ArchiveInfo;
pub use info::CompressionTally;
pub use info::FileTable;
pub use metadata::ArchiveMetadata;
pub use metadata::FileEntry;
pub use metadata::SideChannel;
pub use phar::CompressionAlgorithm;
pub use phar::SignatureAlgorithm;
