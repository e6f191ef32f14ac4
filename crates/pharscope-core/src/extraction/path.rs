//! Entry path validation.

use std::path::Component;
use std::path::Path;
use std::path::PathBuf;

use crate::metadata::SIDE_CHANNEL_FILE;

/// A validated archive-relative entry path.
///
/// An `EntryPath` is always relative, contains no `..` and no NUL bytes,
/// stays within the configured depth, and never names the reserved
/// side-channel file. Joining it onto an extraction root therefore always
/// stays inside that root.
///
/// # Examples
///
/// ```
/// use pharscope_core::extraction::EntryPath;
///
/// let path = EntryPath::validate("./src/Command.php", 32).unwrap();
/// assert_eq!(path.as_path(), std::path::Path::new("src/Command.php"));
///
/// assert!(EntryPath::validate("../etc/passwd", 32).is_err());
/// assert!(EntryPath::validate("/etc/passwd", 32).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntryPath(PathBuf);

impl EntryPath {
    /// Validates and normalizes an entry name.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violation found.
    pub fn validate(name: &str, max_depth: usize) -> Result<Self, String> {
        if name.contains('\0') {
            return Err(format!("entry path contains NUL byte: {name:?}"));
        }

        let mut normalized = PathBuf::new();
        let mut depth = 0;
        for component in Path::new(name).components() {
            match component {
                Component::Normal(part) => {
                    depth += 1;
                    normalized.push(part);
                }
                Component::CurDir => {}
                Component::ParentDir => {
                    return Err(format!("entry path escapes archive root: {name}"));
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(format!("entry path is absolute: {name}"));
                }
            }
        }

        if depth == 0 {
            return Err(format!("entry path is empty: {name:?}"));
        }
        if depth > max_depth {
            return Err(format!(
                "entry path depth {depth} exceeds maximum {max_depth}: {name}"
            ));
        }
        if normalized == Path::new(SIDE_CHANNEL_FILE) {
            return Err(format!("entry uses reserved name {SIDE_CHANNEL_FILE}"));
        }

        Ok(Self(normalized))
    }

    /// Normalized relative path.
    #[must_use]
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Destination of this entry under `root`.
    #[must_use]
    pub fn resolve(&self, root: &Path) -> PathBuf {
        root.join(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_paths() {
        assert!(EntryPath::validate("index.php", 32).is_ok());
        assert!(EntryPath::validate("vendor/autoload.php", 32).is_ok());
        assert!(EntryPath::validate("dir/", 32).is_ok());
    }

    #[test]
    fn test_current_dir_normalized() {
        let path = EntryPath::validate("./a/./b.txt", 32).unwrap();
        assert_eq!(path.as_path(), Path::new("a/b.txt"));
    }

    #[test]
    fn test_traversal_rejected() {
        assert!(EntryPath::validate("../x", 32).is_err());
        assert!(EntryPath::validate("a/../../x", 32).is_err());
        assert!(EntryPath::validate("a/../b", 32).is_err());
    }

    #[test]
    fn test_absolute_rejected() {
        let err = EntryPath::validate("/etc/passwd", 32).unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn test_nul_rejected() {
        assert!(EntryPath::validate("a\0b", 32).is_err());
    }

    #[test]
    fn test_empty_rejected() {
        assert!(EntryPath::validate("", 32).is_err());
        assert!(EntryPath::validate("./", 32).is_err());
    }

    #[test]
    fn test_depth_limit() {
        assert!(EntryPath::validate("a/b/c", 3).is_ok());
        let err = EntryPath::validate("a/b/c/d", 3).unwrap_err();
        assert!(err.contains("depth 4"));
    }

    #[test]
    fn test_reserved_name_rejected() {
        assert!(EntryPath::validate(".phar_meta.json", 32).is_err());
        assert!(EntryPath::validate("./.phar_meta.json", 32).is_err());
        assert!(EntryPath::validate("sub/.phar_meta.json", 32).is_ok());
    }

    #[test]
    fn test_resolve_stays_under_root() {
        let path = EntryPath::validate("a/b.txt", 32).unwrap();
        let root = Path::new("/tmp/root");
        assert!(path.resolve(root).starts_with(root));
    }
}
