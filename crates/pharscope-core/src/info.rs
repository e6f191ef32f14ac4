//! One inspected archive and the queries it answers.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;
use tempfile::TempDir;
use tracing::debug;
use tracing::warn;
use walkdir::WalkDir;

use crate::CompressionAlgorithm;
use crate::PharError;
use crate::Result;
use crate::extraction::ArchiveExtractor;
use crate::metadata::ArchiveMetadata;
use crate::metadata::FileEntry;
use crate::metadata::SideChannel;

/// File table of an archive, keyed by archive-relative path.
///
/// Lookups go through the path; iteration keeps manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileTable {
    entries: Vec<FileEntry>,
    index: BTreeMap<String, usize>,
}

impl FileTable {
    /// Builds a table; a later entry with a duplicate path replaces the earlier one.
    #[must_use]
    pub fn new(entries: Vec<FileEntry>) -> Self {
        let mut table = Self::default();
        for entry in entries {
            if let Some(&at) = table.index.get(&entry.path) {
                table.entries[at] = entry;
            } else {
                table.index.insert(entry.path.clone(), table.entries.len());
                table.entries.push(entry);
            }
        }
        table
    }

    /// Entry stored under `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&FileEntry> {
        self.index.get(path).map(|&at| &self.entries[at])
    }

    /// Set of all paths.
    #[must_use]
    pub fn paths(&self) -> BTreeSet<&str> {
        self.index.keys().map(String::as_str).collect()
    }

    /// Entries in manifest order.
    pub fn iter(&self) -> std::slice::Iter<'_, FileEntry> {
        self.entries.iter()
    }

    /// Number of files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the archive holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a FileTable {
    type Item = &'a FileEntry;
    type IntoIter = std::slice::Iter<'a, FileEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Number of files per compression algorithm.
///
/// Only algorithms used by at least one file appear. Serializes as a map
/// from label to count, e.g. `{"GZ": 3}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CompressionTally(BTreeMap<CompressionAlgorithm, usize>);

impl CompressionTally {
    /// Counts the algorithms of `files`.
    #[must_use]
    pub fn from_files(files: &FileTable) -> Self {
        let mut counts = BTreeMap::new();
        for entry in files {
            *counts.entry(entry.compression).or_insert(0) += 1;
        }
        Self(counts)
    }

    /// Files stored with `algorithm`.
    #[must_use]
    pub fn get(&self, algorithm: CompressionAlgorithm) -> usize {
        self.0.get(&algorithm).copied().unwrap_or(0)
    }

    /// Total number of files counted.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }

    /// Counts keyed by label.
    #[must_use]
    pub fn by_label(&self) -> BTreeMap<&'static str, usize> {
        self.0.iter().map(|(algo, n)| (algo.label(), *n)).collect()
    }

    /// `(algorithm, count)` pairs in label order.
    pub fn iter(&self) -> impl Iterator<Item = (CompressionAlgorithm, usize)> + '_ {
        self.0.iter().map(|(algo, n)| (*algo, *n))
    }
}

impl std::fmt::Display for CompressionTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.iter().map(|(algo, n)| format!("{algo}: {n}")).collect();
        write!(f, "{{{}}}", parts.join(", "))
    }
}

/// Tally together with the signature hash it was computed under.
#[derive(Debug, Clone)]
struct TallyCache {
    hash: Option<String>,
    tally: CompressionTally,
}

/// An archive extracted into a private temporary directory.
///
/// Construction extracts the archive in a child process and loads the
/// side-channel record. The temporary tree lives until [`close`](Self::close)
/// is called or the value is dropped, and is removed exactly once.
///
/// # Examples
///
/// ```no_run
/// use pharscope_core::ArchiveInfo;
/// use pharscope_core::extraction::ArchiveExtractor;
/// use std::path::Path;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let extractor = ArchiveExtractor::new("pharscope");
/// let mut info = ArchiveInfo::open(Path::new("app.phar"), &extractor)?;
/// println!("{} files, {}", info.files().len(), info.compression_tally());
/// info.close()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ArchiveInfo {
    path: PathBuf,
    display_name: String,
    tree: Option<TempDir>,
    metadata: ArchiveMetadata,
    files: FileTable,
    tally_cache: RefCell<Option<TallyCache>>,
}

impl ArchiveInfo {
    /// Extracts `path` with `extractor` and loads its facts.
    ///
    /// # Errors
    ///
    /// Propagates extraction failures; a tree without a readable
    /// side-channel file is [`crate::error::InvalidArchiveReason::MissingSideChannel`].
    pub fn open(path: &Path, extractor: &ArchiveExtractor) -> Result<Self> {
        let tree = extractor.extract(path)?;
        Self::from_extraction(path, tree)
    }

    /// Wraps a tree that already holds an extraction of `path`, including
    /// its side-channel file. Takes ownership of the directory.
    pub fn from_extraction(path: &Path, tree: TempDir) -> Result<Self> {
        let (metadata, files) = load(path, tree.path())?;
        Ok(Self {
            path: path.to_path_buf(),
            display_name: display_name(path),
            tree: Some(tree),
            metadata,
            files,
            tally_cache: RefCell::new(None),
        })
    }

    /// Archive path as given.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name of the archive, used in diff output.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Root of the extracted tree.
    ///
    /// # Errors
    ///
    /// Returns [`PharError::ArchiveClosed`] after [`close`](Self::close).
    pub fn root(&self) -> Result<&Path> {
        self.tree
            .as_ref()
            .map(TempDir::path)
            .ok_or_else(|| PharError::ArchiveClosed {
                path: self.path.clone(),
            })
    }

    /// Global archive facts.
    #[must_use]
    pub const fn metadata(&self) -> &ArchiveMetadata {
        &self.metadata
    }

    /// File table.
    #[must_use]
    pub const fn files(&self) -> &FileTable {
        &self.files
    }

    /// Files per compression algorithm.
    ///
    /// Memoized against the signature hash: a cached tally is reused as long
    /// as the archive's hash has not changed.
    #[must_use]
    pub fn compression_tally(&self) -> CompressionTally {
        let hash = self.metadata.signature_hash().map(str::to_owned);
        let mut cache = self.tally_cache.borrow_mut();
        match cache.as_ref() {
            Some(entry) if entry.hash == hash => entry.tally.clone(),
            _ => {
                let tally = CompressionTally::from_files(&self.files);
                debug!(archive = %self.display_name, %tally, "computed compression tally");
                *cache = Some(TallyCache {
                    hash,
                    tally: tally.clone(),
                });
                tally
            }
        }
    }

    /// Reproducible-build equality.
    ///
    /// Two archives are equal when their signature hashes, stubs, and
    /// normalized metadata match and every path is stored with the same
    /// compression on both sides.
    ///
    /// # Errors
    ///
    /// Returns [`PharError::IncomparableArchives`] if either archive is
    /// signed with a public key.
    pub fn equals(&self, other: &Self) -> Result<bool> {
        for side in [self, other] {
            if side.metadata.is_publicly_signed() {
                return Err(PharError::IncomparableArchives {
                    path: side.path.clone(),
                });
            }
        }

        if self.metadata.signature_hash() != other.metadata.signature_hash() {
            debug!("archives differ in signature hash");
            return Ok(false);
        }
        if self.metadata.stub != other.metadata.stub {
            debug!("archives differ in stub");
            return Ok(false);
        }
        if self.metadata.normalized_metadata != other.metadata.normalized_metadata {
            debug!("archives differ in metadata");
            return Ok(false);
        }
        if self.files.len() != other.files.len() {
            return Ok(false);
        }

        let same_compression = self.files.iter().all(|entry| {
            other
                .files
                .get(&entry.path)
                .is_some_and(|theirs| theirs.compression == entry.compression)
        });
        Ok(same_compression)
    }

    /// Relative paths of the files in the extracted tree, sorted.
    ///
    /// The side-channel file is removed from the tree on load, so only
    /// archive contents are listed.
    ///
    /// # Errors
    ///
    /// Returns [`PharError::ArchiveClosed`] after [`close`](Self::close), or
    /// an I/O error from walking the tree.
    pub fn extracted_files(&self) -> Result<Vec<PathBuf>> {
        let root = self.root()?;
        let mut files = Vec::new();
        for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|e| PharError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry.path().strip_prefix(root).map_err(|e| {
                PharError::Io(std::io::Error::other(e.to_string()))
            })?;
            files.push(relative.to_path_buf());
        }
        Ok(files)
    }

    /// Extracts the archive again into a new tree and reloads its facts.
    ///
    /// The old tree is removed once the new one is loaded. A cached tally
    /// survives only if the signature hash is unchanged; unsigned archives
    /// have no hash to key on, so their tally is always recomputed.
    pub fn reload(&mut self, extractor: &ArchiveExtractor) -> Result<()> {
        let tree = extractor.extract(&self.path)?;
        let (metadata, files) = load(&self.path, tree.path())?;
        let old = self.tree.replace(tree);
        self.metadata = metadata;
        self.files = files;
        if self.metadata.signature.is_none() {
            self.tally_cache.borrow_mut().take();
        }
        if let Some(old) = old {
            old.close()?;
        }
        Ok(())
    }

    /// Removes the extracted tree. Calling it again does nothing.
    ///
    /// Metadata and file table stay available; tree-based queries fail with
    /// [`PharError::ArchiveClosed`].
    pub fn close(&mut self) -> Result<()> {
        if let Some(tree) = self.tree.take() {
            debug!(archive = %self.display_name, root = %tree.path().display(), "removing extracted tree");
            tree.close()?;
        }
        Ok(())
    }

    /// Returns `true` once the tree has been removed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.tree.is_none()
    }

    #[cfg(test)]
    fn cached_tally_hash(&self) -> Option<Option<String>> {
        self.tally_cache.borrow().as_ref().map(|c| c.hash.clone())
    }
}

impl Drop for ArchiveInfo {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(archive = %self.display_name, error = %e, "failed to remove extracted tree");
        }
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned())
}

fn load(path: &Path, root: &Path) -> Result<(ArchiveMetadata, FileTable)> {
    let record = SideChannel::take_from(root, path)?;
    let files = if record.files.is_empty() {
        legacy_file_table(root)?
    } else {
        FileTable::new(record.files)
    };
    Ok((record.metadata, files))
}

/// File table for side-channel records written without one: every file in
/// the tree, recorded as uncompressed.
fn legacy_file_table(root: &Path) -> Result<FileTable> {
    let mut entries = Vec::new();
    for entry in WalkDir::new(root).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| PharError::Io(e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let size = entry.metadata().map_err(|e| PharError::Io(e.into()))?.len();
        entries.push(FileEntry {
            path: relative.to_string_lossy().replace('\\', "/"),
            compression: CompressionAlgorithm::None,
            compressed_size: size,
            size,
            crc32: 0,
        });
    }
    if !entries.is_empty() {
        warn!(
            root = %root.display(),
            files = entries.len(),
            "side-channel has no file table; assuming uncompressed files"
        );
    }
    Ok(FileTable::new(entries))
}
