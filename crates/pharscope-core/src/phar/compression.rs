//! Per-entry compression used inside PHAR archives.
//!
//! Every entry carries its own compression flag in the manifest, so two
//! archives holding identical files can still differ in how each file was
//! stored. That difference is part of build reproducibility.

use std::io::Read;

use serde::Deserialize;
use serde::Serialize;

/// Mask selecting the compression bits of an entry's flags.
pub const COMPRESSION_MASK: u32 = 0x0000_F000;

/// Largest buffer reserved up front for one decompressed entry.
const MAX_PREALLOCATION: usize = 1024 * 1024;

/// Compression algorithm of a single archive entry.
///
/// The discriminants are the native flag values stored in the manifest.
///
/// | Algorithm | Flag     | Label  |
/// |-----------|----------|--------|
/// | None      | `0x0000` | `None` |
/// | Gz        | `0x1000` | `GZ`   |
/// | Bz2       | `0x2000` | `BZ2`  |
///
/// # Examples
///
/// ```
/// use pharscope_core::CompressionAlgorithm;
///
/// let algo = CompressionAlgorithm::from_flags(0x1000 | 0o644).unwrap();
/// assert_eq!(algo, CompressionAlgorithm::Gz);
/// assert_eq!(algo.label(), "GZ");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Stored as-is.
    #[serde(rename = "None")]
    None,
    /// Raw deflate stream.
    #[serde(rename = "GZ")]
    Gz,
    /// Bzip2 stream.
    #[serde(rename = "BZ2")]
    Bz2,
}

impl CompressionAlgorithm {
    /// All algorithms, in label order.
    pub const ALL: [Self; 3] = [Self::None, Self::Gz, Self::Bz2];

    /// Native flag value.
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::None => 0,
            Self::Gz => 0x1000,
            Self::Bz2 => 0x2000,
        }
    }

    /// Decodes the compression bits of an entry's flags.
    ///
    /// Returns `None` for unknown compression bits (e.g. both set).
    #[must_use]
    pub const fn from_flags(flags: u32) -> Option<Self> {
        match flags & COMPRESSION_MASK {
            0 => Some(Self::None),
            0x1000 => Some(Self::Gz),
            0x2000 => Some(Self::Bz2),
            _ => None,
        }
    }

    /// Display label, as used in compression tallies.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Gz => "GZ",
            Self::Bz2 => "BZ2",
        }
    }

    /// Parses a label (case-insensitive).
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|algo| algo.label().eq_ignore_ascii_case(label))
    }

    /// Decompresses `data`, which must hold exactly one entry's stream.
    ///
    /// `size` is the uncompressed size declared in the manifest. Output is
    /// cut off one byte past it so the caller can detect a mismatch without
    /// inflating a crafted stream in full.
    pub(crate) fn decompress(self, data: &[u8], size: u32) -> std::io::Result<Vec<u8>> {
        let limit = u64::from(size) + 1;
        let mut out = Vec::with_capacity((size as usize).min(MAX_PREALLOCATION));
        match self {
            Self::None => out.extend_from_slice(data),
            Self::Gz => {
                flate2::read::DeflateDecoder::new(data)
                    .take(limit)
                    .read_to_end(&mut out)?;
            }
            Self::Bz2 => {
                bzip2::read::BzDecoder::new(data)
                    .take(limit)
                    .read_to_end(&mut out)?;
            }
        }
        Ok(out)
    }
}

impl std::fmt::Display for CompressionAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_codes_round_trip() {
        for algo in CompressionAlgorithm::ALL {
            assert_eq!(CompressionAlgorithm::from_flags(algo.code()), Some(algo));
        }
    }

    #[test]
    fn test_from_flags_ignores_permissions() {
        assert_eq!(
            CompressionAlgorithm::from_flags(0o755 | 0x2000),
            Some(CompressionAlgorithm::Bz2)
        );
        assert_eq!(
            CompressionAlgorithm::from_flags(0o644),
            Some(CompressionAlgorithm::None)
        );
        assert_eq!(CompressionAlgorithm::from_flags(0x3000), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(CompressionAlgorithm::None.label(), "None");
        assert_eq!(CompressionAlgorithm::from_label("gz"), Some(CompressionAlgorithm::Gz));
        assert_eq!(CompressionAlgorithm::from_label("BZ2"), Some(CompressionAlgorithm::Bz2));
        assert_eq!(CompressionAlgorithm::from_label("zstd"), None);
    }

    #[test]
    fn test_decompress_gz() {
        let mut enc =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"hello phar").unwrap();
        let data = enc.finish().unwrap();

        let out = CompressionAlgorithm::Gz.decompress(&data, 10).unwrap();
        assert_eq!(out, b"hello phar");
    }

    #[test]
    fn test_decompress_bz2() {
        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
        enc.write_all(b"hello phar").unwrap();
        let data = enc.finish().unwrap();

        let out = CompressionAlgorithm::Bz2.decompress(&data, 10).unwrap();
        assert_eq!(out, b"hello phar");
    }

    #[test]
    fn test_decompress_stops_past_declared_size() {
        let payload = vec![0u8; 64 * 1024];
        let mut enc =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::best());
        enc.write_all(&payload).unwrap();
        let data = enc.finish().unwrap();

        let out = CompressionAlgorithm::Gz.decompress(&data, 16).unwrap();
        assert_eq!(out.len(), 17);

        let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::best());
        enc.write_all(&payload).unwrap();
        let data = enc.finish().unwrap();
        let out = CompressionAlgorithm::Bz2.decompress(&data, 100).unwrap();
        assert_eq!(out.len(), 101);
    }

    #[test]
    fn test_decompress_huge_declared_size_does_not_preallocate() {
        let mut enc =
            flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(b"tiny").unwrap();
        let data = enc.finish().unwrap();

        let out = CompressionAlgorithm::Gz.decompress(&data, u32::MAX).unwrap();
        assert_eq!(out, b"tiny");
        assert!(out.capacity() < 2 * MAX_PREALLOCATION);
    }

    #[test]
    fn test_decompress_garbage_fails() {
        assert!(CompressionAlgorithm::Bz2.decompress(b"not bzip2", 0).is_err());
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&CompressionAlgorithm::Gz).unwrap();
        assert_eq!(json, "\"GZ\"");
        let back: CompressionAlgorithm = serde_json::from_str("\"BZ2\"").unwrap();
        assert_eq!(back, CompressionAlgorithm::Bz2);
    }
}
