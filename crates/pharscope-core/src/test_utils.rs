//! Test fixtures: in-memory archive construction and in-process inspection.
//!
//! Archive construction is not part of the library API; this builder exists
//! so tests can produce byte-exact archives without external tooling.
//!
//! # Panics
//!
//! Functions in this module panic on I/O errors since they are designed for
//! test use only.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::io::Write;
use std::path::Path;

use md5::Md5;
use sha1::Sha1;
use sha2::Digest;
use sha2::Sha256;
use sha2::Sha512;
use tempfile::TempDir;

use crate::ArchiveInfo;
use crate::CompressionAlgorithm;
use crate::SignatureAlgorithm;
use crate::extraction::ExtractOptions;
use crate::extraction::extract_to;
use crate::phar::signature::SIGNATURE_MAGIC;
use crate::phar::reader::FLAG_SIGNED;

/// Stub used when none is given.
pub const DEFAULT_STUB: &str = "<?php __HALT_COMPILER(); ?>\r\n";

/// Manifest API version written by the builder (`1.1.1`).
const API_VERSION: u16 = 0x1110;

/// Fixed modification time, so identical inputs give identical bytes.
const TIMESTAMP: u32 = 1_700_000_000;

struct TestEntry {
    name: String,
    contents: Vec<u8>,
    compression: CompressionAlgorithm,
}

/// Builder for PHAR test archives.
///
/// # Examples
///
/// ```
/// use pharscope_core::CompressionAlgorithm;
/// use pharscope_core::SignatureAlgorithm;
/// use pharscope_core::test_utils::PharBuilder;
///
/// let bytes = PharBuilder::new()
///     .file("index.php", b"<?php echo 1;", CompressionAlgorithm::Gz)
///     .directory("var/")
///     .signed_with(SignatureAlgorithm::Sha256)
///     .build();
/// assert!(bytes.ends_with(b"GBMB"));
/// ```
pub struct PharBuilder {
    stub: String,
    alias: String,
    metadata: Vec<u8>,
    entries: Vec<TestEntry>,
    signature: Option<SignatureAlgorithm>,
}

impl Default for PharBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PharBuilder {
    /// Empty unsigned archive with the default stub.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stub: DEFAULT_STUB.to_string(),
            alias: String::new(),
            metadata: Vec::new(),
            entries: Vec::new(),
            signature: None,
        }
    }

    /// Replaces the stub. It must contain the halt token.
    #[must_use]
    pub fn stub(mut self, stub: &str) -> Self {
        self.stub = stub.to_string();
        self
    }

    /// Sets the archive alias.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = alias.to_string();
        self
    }

    /// Sets the serialized global metadata.
    #[must_use]
    pub fn metadata(mut self, metadata: &[u8]) -> Self {
        self.metadata = metadata.to_vec();
        self
    }

    /// Adds a file stored with `compression`.
    #[must_use]
    pub fn file(mut self, name: &str, contents: &[u8], compression: CompressionAlgorithm) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            contents: contents.to_vec(),
            compression,
        });
        self
    }

    /// Adds a directory marker; `name` should end in `/`.
    #[must_use]
    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push(TestEntry {
            name: name.to_string(),
            contents: Vec::new(),
            compression: CompressionAlgorithm::None,
        });
        self
    }

    /// Signs the archive with a hash algorithm when built.
    #[must_use]
    pub fn signed_with(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.signature = Some(algorithm);
        self
    }

    /// Builds the archive bytes.
    ///
    /// # Panics
    ///
    /// Panics if a public-key algorithm was chosen with
    /// [`signed_with`](Self::signed_with); use
    /// [`build_with_signature`](Self::build_with_signature) for those.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        match self.signature {
            None => self.unsigned_bytes(false),
            Some(algorithm) => {
                assert!(
                    !algorithm.is_asymmetric(),
                    "use build_with_signature for {algorithm}"
                );
                self.build_with_signature(algorithm, |data| digest(algorithm, data))
            }
        }
    }

    /// Builds the archive and appends a signature block holding
    /// `sign(signed_bytes)`.
    #[must_use]
    pub fn build_with_signature<F>(self, algorithm: SignatureAlgorithm, sign: F) -> Vec<u8>
    where
        F: FnOnce(&[u8]) -> Vec<u8>,
    {
        let mut out = self.unsigned_bytes(true);
        let signature = sign(&out);
        out.extend_from_slice(&signature);
        if algorithm.is_asymmetric() {
            out.extend_from_slice(&u32::try_from(signature.len()).unwrap().to_le_bytes());
        }
        out.extend_from_slice(&algorithm.code().to_le_bytes());
        out.extend_from_slice(SIGNATURE_MAGIC);
        out
    }

    fn unsigned_bytes(&self, signed: bool) -> Vec<u8> {
        let mut manifest = Vec::new();
        let mut data = Vec::new();

        put_u32(&mut manifest, self.entries.len());
        manifest.extend_from_slice(&API_VERSION.to_be_bytes());
        manifest.extend_from_slice(&(if signed { FLAG_SIGNED } else { 0 }).to_le_bytes());
        put_block(&mut manifest, self.alias.as_bytes());
        put_block(&mut manifest, &self.metadata);

        for entry in &self.entries {
            let stored = compress(entry.compression, &entry.contents);
            let permissions = if entry.name.ends_with('/') { 0o755 } else { 0o644 };

            put_block(&mut manifest, entry.name.as_bytes());
            put_u32(&mut manifest, entry.contents.len());
            manifest.extend_from_slice(&TIMESTAMP.to_le_bytes());
            put_u32(&mut manifest, stored.len());
            manifest.extend_from_slice(&crc32fast::hash(&entry.contents).to_le_bytes());
            manifest.extend_from_slice(&(permissions | entry.compression.code()).to_le_bytes());
            put_block(&mut manifest, &[]);

            data.extend_from_slice(&stored);
        }

        let mut out = self.stub.as_bytes().to_vec();
        put_u32(&mut out, manifest.len());
        out.extend_from_slice(&manifest);
        out.extend_from_slice(&data);
        out
    }
}

fn put_u32(out: &mut Vec<u8>, value: usize) {
    out.extend_from_slice(&u32::try_from(value).unwrap().to_le_bytes());
}

fn put_block(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, bytes.len());
    out.extend_from_slice(bytes);
}

fn compress(algorithm: CompressionAlgorithm, contents: &[u8]) -> Vec<u8> {
    match algorithm {
        CompressionAlgorithm::None => contents.to_vec(),
        CompressionAlgorithm::Gz => {
            let mut enc =
                flate2::write::DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            enc.write_all(contents).unwrap();
            enc.finish().unwrap()
        }
        CompressionAlgorithm::Bz2 => {
            let mut enc = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
            enc.write_all(contents).unwrap();
            enc.finish().unwrap()
        }
    }
}

/// Digest of `data` for a hash signature algorithm.
///
/// # Panics
///
/// Panics for public-key algorithms.
#[must_use]
pub fn digest(algorithm: SignatureAlgorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        SignatureAlgorithm::Md5 => Md5::digest(data).to_vec(),
        SignatureAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
        SignatureAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        SignatureAlgorithm::Sha512 => Sha512::digest(data).to_vec(),
        other => panic!("{other} is not a hash algorithm"),
    }
}

/// Writes `bytes` to `dir/name` and returns the path.
pub fn write_archive(dir: &Path, name: &str, bytes: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// Inspects `archive` without a child process: extracts it in-process into
/// a fresh temporary directory and wraps the result.
pub fn inspect_in_process(archive: &Path) -> ArchiveInfo {
    let tree = TempDir::new().unwrap();
    extract_to(archive, tree.path(), &ExtractOptions::internal()).unwrap();
    ArchiveInfo::from_extraction(archive, tree).unwrap()
}
