//! In-process PHAR reader.
//!
//! This is the archive-reading primitive used by the extraction entry point.
//! It keeps all state in the returned [`PharArchive`] value; nothing is
//! registered globally, but inspection still happens in a child process (see
//! [`crate::extraction::ArchiveExtractor`]) so that callers never need to load
//! two archives in one address space.

use std::io::ErrorKind;
use std::path::Path;
use std::path::PathBuf;

use tracing::debug;

use crate::PharError;
use crate::Result;
use crate::error::InvalidArchiveReason;
use crate::metadata::ArchiveMetadata;
use crate::metadata::FileEntry;
use crate::metadata::SignatureInfo;
use crate::phar::CompressionAlgorithm;
use crate::phar::SignatureBlock;
use crate::phar::public_key_path;

/// Token terminating the stub.
const HALT_TOKEN: &[u8] = b"__HALT_COMPILER();";

/// Global flag set when the archive carries a signature block.
pub const FLAG_SIGNED: u32 = 0x0001_0000;

/// Fixed-size part of one manifest entry (six `u32` fields).
const ENTRY_FIXED_LEN: usize = 24;

/// One manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PharEntry {
    /// Archive-relative path.
    pub name: String,
    /// Uncompressed size in bytes.
    pub size: u32,
    /// Modification time (Unix seconds).
    pub timestamp: u32,
    /// Stored (compressed) size in bytes.
    pub compressed_size: u32,
    /// CRC32 of the uncompressed contents.
    pub crc32: u32,
    /// Raw flags: permissions and compression bits.
    pub flags: u32,
    /// Per-entry serialized metadata.
    pub metadata: Vec<u8>,
    /// Compression decoded from `flags`.
    pub compression: CompressionAlgorithm,
    data_offset: usize,
}

impl PharEntry {
    /// Directory markers end in `/` and hold no data.
    #[must_use]
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Unix permission bits.
    #[must_use]
    pub const fn permissions(&self) -> u32 {
        self.flags & 0o777
    }
}

/// A fully parsed archive held in memory.
#[derive(Debug)]
pub struct PharArchive {
    path: PathBuf,
    data: Vec<u8>,
    stub_len: usize,
    api_version: u16,
    global_flags: u32,
    alias: String,
    metadata: Vec<u8>,
    entries: Vec<PharEntry>,
    signature: Option<SignatureBlock>,
    public_key: Option<String>,
}

impl PharArchive {
    /// Reads and parses the archive at `path`.
    ///
    /// Asymmetrically signed archives additionally require the
    /// `<path>.pubkey` sidecar file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::NotFound => InvalidArchiveReason::FileNotFound,
                _ => InvalidArchiveReason::NotReadable,
            };
            PharError::invalid(path, reason)
        })?;

        let mut archive = Self::parse(path, data)?;

        if archive
            .signature
            .as_ref()
            .is_some_and(|sig| sig.algorithm.is_asymmetric())
        {
            let key_path = public_key_path(path);
            let key = std::fs::read(&key_path).map_err(|e| {
                debug!(key = %key_path.display(), error = %e, "public key sidecar unavailable");
                PharError::invalid(path, InvalidArchiveReason::MissingPublicKey)
            })?;
            archive.public_key = Some(String::from_utf8_lossy(&key).into_owned());
        }

        Ok(archive)
    }

    /// Parses archive bytes already in memory. `path` is used for error
    /// reporting only; no sidecar files are read.
    pub fn parse(path: &Path, data: Vec<u8>) -> Result<Self> {
        let stub_len = find_stub_end(&data)
            .ok_or_else(|| PharError::malformed(path, "no __HALT_COMPILER(); token found"))?;

        let mut cursor = Cursor::new(&data, stub_len, path);
        let manifest_len = cursor.u32()? as usize;
        let manifest_start = cursor.pos;
        let data_start = manifest_start
            .checked_add(manifest_len)
            .filter(|end| *end <= data.len())
            .ok_or_else(|| PharError::malformed(path, "manifest length exceeds file size"))?;

        let file_count = cursor.u32()? as usize;
        if file_count.saturating_mul(ENTRY_FIXED_LEN + 4) > manifest_len {
            return Err(PharError::malformed(
                path,
                format!("manifest too short for {file_count} entries"),
            ));
        }
        let api_version = cursor.u16_be()?;
        let global_flags = cursor.u32()?;
        let alias = cursor.string()?;
        let metadata = cursor.block()?;

        let signature = if global_flags & FLAG_SIGNED == 0 {
            None
        } else {
            Some(SignatureBlock::locate(&data).map_err(|msg| PharError::malformed(path, msg))?)
        };
        let data_end = signature.as_ref().map_or(data.len(), |sig| sig.signed_len);

        let mut entries = Vec::with_capacity(file_count);
        let mut offset = data_start;
        for _ in 0..file_count {
            let name = cursor.string()?;
            let size = cursor.u32()?;
            let timestamp = cursor.u32()?;
            let compressed_size = cursor.u32()?;
            let crc32 = cursor.u32()?;
            let flags = cursor.u32()?;
            let entry_metadata = cursor.block()?;

            let compression = CompressionAlgorithm::from_flags(flags).ok_or_else(|| {
                PharError::malformed(path, format!("unknown compression flags {flags:#x} for {name}"))
            })?;

            let data_offset = offset;
            offset = offset
                .checked_add(compressed_size as usize)
                .filter(|end| *end <= data_end)
                .ok_or_else(|| {
                    PharError::malformed(path, format!("contents of {name} exceed archive bounds"))
                })?;

            entries.push(PharEntry {
                name,
                size,
                timestamp,
                compressed_size,
                crc32,
                flags,
                metadata: entry_metadata,
                compression,
                data_offset,
            });
        }

        if cursor.pos > data_start {
            return Err(PharError::malformed(path, "manifest entries overrun manifest length"));
        }

        debug!(
            archive = %path.display(),
            entries = entries.len(),
            signed = signature.is_some(),
            "parsed archive manifest"
        );

        Ok(Self {
            path: path.to_path_buf(),
            data,
            stub_len,
            api_version,
            global_flags,
            alias,
            metadata,
            entries,
            signature,
            public_key: None,
        })
    }

    /// Path the archive was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stub bytes, including the halt token.
    #[must_use]
    pub fn stub(&self) -> &[u8] {
        &self.data[..self.stub_len]
    }

    /// Manifest API version as `major.minor.release`.
    #[must_use]
    pub fn version(&self) -> String {
        format!(
            "{}.{}.{}",
            self.api_version >> 12,
            (self.api_version >> 8) & 0xF,
            (self.api_version >> 4) & 0xF
        )
    }

    /// Global manifest flags.
    #[must_use]
    pub const fn global_flags(&self) -> u32 {
        self.global_flags
    }

    /// Archive alias.
    #[must_use]
    pub fn alias(&self) -> &str {
        &self.alias
    }

    /// Serialized global metadata (empty when absent).
    #[must_use]
    pub fn metadata(&self) -> &[u8] {
        &self.metadata
    }

    /// All manifest entries, in manifest order.
    #[must_use]
    pub fn entries(&self) -> &[PharEntry] {
        &self.entries
    }

    /// Signature block, if the archive is signed.
    #[must_use]
    pub const fn signature(&self) -> Option<&SignatureBlock> {
        self.signature.as_ref()
    }

    /// Bytes covered by the signature.
    #[must_use]
    pub fn signed_bytes(&self) -> &[u8] {
        let end = self
            .signature
            .as_ref()
            .map_or(self.data.len(), |sig| sig.signed_len);
        &self.data[..end]
    }

    /// Contents of the `.pubkey` sidecar, read for asymmetric signatures.
    #[must_use]
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// Decompressed contents of `entry`, checked against its CRC32.
    pub fn contents(&self, entry: &PharEntry) -> Result<Vec<u8>> {
        let end = entry.data_offset + entry.compressed_size as usize;
        let raw = &self.data[entry.data_offset..end];
        let out = entry
            .compression
            .decompress(raw, entry.size)
            .map_err(|e| {
                PharError::malformed(&self.path, format!("cannot decompress {}: {e}", entry.name))
            })?;

        if out.len() != entry.size as usize {
            return Err(PharError::malformed(
                &self.path,
                format!(
                    "size mismatch for {}: expected {}, got {}",
                    entry.name,
                    entry.size,
                    out.len()
                ),
            ));
        }
        if crc32fast::hash(&out) != entry.crc32 {
            return Err(PharError::malformed(
                &self.path,
                format!("CRC32 mismatch for {}", entry.name),
            ));
        }
        Ok(out)
    }

    /// File table: every non-directory entry, in manifest order.
    #[must_use]
    pub fn file_entries(&self) -> Vec<FileEntry> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_dir())
            .map(|entry| FileEntry {
                path: entry.name.clone(),
                compression: entry.compression,
                compressed_size: u64::from(entry.compressed_size),
                size: u64::from(entry.size),
                crc32: entry.crc32,
            })
            .collect()
    }

    /// Global archive facts as exposed to comparisons.
    #[must_use]
    pub fn archive_metadata(&self) -> ArchiveMetadata {
        ArchiveMetadata {
            signature: self.signature.as_ref().map(|sig| SignatureInfo {
                hash: sig.hash_hex(),
                hash_type: sig.algorithm.label().to_string(),
            }),
            stub: Some(String::from_utf8_lossy(self.stub()).into_owned()),
            version: Some(self.version()),
            normalized_metadata: (!self.metadata.is_empty())
                .then(|| String::from_utf8_lossy(&self.metadata).into_owned()),
            pub_key_content: self.public_key.clone(),
        }
    }
}

/// Returns the offset just past the stub, or `None` without a halt token.
fn find_stub_end(data: &[u8]) -> Option<usize> {
    let token_at = data
        .windows(HALT_TOKEN.len())
        .position(|window| window.eq_ignore_ascii_case(HALT_TOKEN))?;
    let mut end = token_at + HALT_TOKEN.len();

    for closing in [&b" ?>"[..], &b"?>"[..]] {
        if data[end..].starts_with(closing) {
            end += closing.len();
            break;
        }
    }
    if data[end..].starts_with(b"\r\n") {
        end += 2;
    } else if data[end..].starts_with(b"\n") {
        end += 1;
    }
    Some(end)
}

/// Bounds-checked little-endian reader over the manifest.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
    path: &'a Path,
}

impl<'a> Cursor<'a> {
    const fn new(data: &'a [u8], pos: usize, path: &'a Path) -> Self {
        Self { data, pos, path }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.data.len())
            .ok_or_else(|| PharError::malformed(self.path, "unexpected end of manifest"))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u32(&mut self) -> Result<u32> {
        let mut buf = [0_u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(u32::from_le_bytes(buf))
    }

    fn u16_be(&mut self) -> Result<u16> {
        let mut buf = [0_u8; 2];
        buf.copy_from_slice(self.take(2)?);
        Ok(u16::from_be_bytes(buf))
    }

    fn block(&mut self) -> Result<Vec<u8>> {
        let len = self.u32()? as usize;
        Ok(self.take(len)?.to_vec())
    }

    fn string(&mut self) -> Result<String> {
        let bytes = self.block()?;
        String::from_utf8(bytes)
            .map_err(|_| PharError::malformed(self.path, "manifest string is not valid UTF-8"))
    }
}
