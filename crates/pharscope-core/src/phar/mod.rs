//! PHAR container format: manifest, per-entry compression, signature block.

pub mod compression;
pub mod reader;
pub mod signature;

use std::ffi::OsString;
use std::path::Path;
use std::path::PathBuf;

pub use compression::CompressionAlgorithm;
pub use reader::PharArchive;
pub use reader::PharEntry;
pub use signature::SignatureAlgorithm;
pub use signature::SignatureBlock;

/// Location of the public key sidecar for `archive`: `<archive>.pubkey`.
///
/// # Examples
///
/// ```
/// use pharscope_core::phar::public_key_path;
/// use std::path::Path;
///
/// assert_eq!(
///     public_key_path(Path::new("dist/app.phar")),
///     Path::new("dist/app.phar.pubkey")
/// );
/// ```
#[must_use]
pub fn public_key_path(archive: &Path) -> PathBuf {
    let mut name = OsString::from(archive.as_os_str());
    name.push(".pubkey");
    PathBuf::from(name)
}
