//! Archive facts and the metadata side-channel file.
//!
//! The extraction subprocess writes a [`SideChannel`] record as JSON into the
//! extracted tree at [`SIDE_CHANNEL_FILE`]. It is the only structured data
//! passed from the child back to the inspecting process.

use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::CompressionAlgorithm;
use crate::PharError;
use crate::Result;
use crate::error::InvalidArchiveReason;

/// Reserved path of the side-channel file, relative to the extraction root.
pub const SIDE_CHANNEL_FILE: &str = ".phar_meta.json";

/// Signature hash and the algorithm that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignatureInfo {
    /// Upper-case hex digest or RSA signature.
    pub hash: String,
    /// Algorithm label, e.g. `SHA-256` or `OpenSSL`.
    pub hash_type: String,
}

/// Global archive facts.
///
/// Immutable once loaded. A present `pub_key_content` means the archive was
/// signed with an asymmetric key and cannot be content-compared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveMetadata {
    /// Signature block, if any.
    pub signature: Option<SignatureInfo>,
    /// Bootstrap text.
    pub stub: Option<String>,
    /// Manifest API version.
    pub version: Option<String>,
    /// Opaque serialized custom metadata.
    pub normalized_metadata: Option<String>,
    /// Contents of the `.pubkey` sidecar for asymmetrically signed archives.
    pub pub_key_content: Option<String>,
}

impl ArchiveMetadata {
    /// Signature hash, if the archive is signed.
    #[must_use]
    pub fn signature_hash(&self) -> Option<&str> {
        self.signature.as_ref().map(|sig| sig.hash.as_str())
    }

    /// Returns `true` when the archive carries a public key.
    #[must_use]
    pub const fn is_publicly_signed(&self) -> bool {
        self.pub_key_content.is_some()
    }
}

/// One file of the archive's file table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// Archive-relative path, unique within the archive.
    pub path: String,
    /// How the file is stored.
    pub compression: CompressionAlgorithm,
    /// Stored size in bytes.
    pub compressed_size: u64,
    /// Uncompressed size in bytes.
    #[serde(default)]
    pub size: u64,
    /// CRC32 of the uncompressed contents.
    #[serde(default)]
    pub crc32: u32,
}

/// Record written to the side-channel file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideChannel {
    /// Global facts.
    #[serde(flatten)]
    pub metadata: ArchiveMetadata,
    /// File table in manifest order. Missing in legacy records.
    #[serde(default)]
    pub files: Vec<FileEntry>,
}

impl SideChannel {
    /// Serializes the record to its JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a record from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the record into `root`.
    pub fn write_to(&self, root: &Path) -> Result<()> {
        std::fs::write(root.join(SIDE_CHANNEL_FILE), self.to_json()?)?;
        Ok(())
    }

    /// Loads the record written into `root` by the extraction of `archive`.
    pub fn read_from(root: &Path, archive: &Path) -> Result<Self> {
        let missing = |msg: String| {
            PharError::invalid(archive, InvalidArchiveReason::MissingSideChannel(msg))
        };
        let json = std::fs::read_to_string(root.join(SIDE_CHANNEL_FILE))
            .map_err(|e| missing(e.to_string()))?;
        Self::from_json(&json).map_err(|e| missing(e.to_string()))
    }

    /// Loads the record like [`read_from`](Self::read_from), then removes the
    /// file so the tree holds only archive contents.
    pub fn take_from(root: &Path, archive: &Path) -> Result<Self> {
        let record = Self::read_from(root, archive)?;
        std::fs::remove_file(root.join(SIDE_CHANNEL_FILE))?;
        Ok(record)
    }
}
