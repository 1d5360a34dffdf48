//! Logical-to-physical file index
//!
//! Built once at startup from `(root directory, URL prefix)` registrations
//! and immutable afterward, so concurrent request handlers read it without
//! locking. Compressed variants with an uncompressed counterpart in the same
//! directory are reachable only by suffix-probing at request time, never
//! under their own logical path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::http::CONTENT_ENCODINGS;

/// Immutable mapping from logical URL path to on-disk path.
#[derive(Debug, Default)]
pub struct FileIndex {
    files: HashMap<String, PathBuf>,
    prefixes: Vec<String>,
}

impl FileIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every regular file under `root` beneath `prefix`.
    ///
    /// Registrations accumulate; a logical path registered twice keeps the
    /// later physical path. A file named `<base><suffix>` for a recognized
    /// compression suffix is excluded when `<base>` exists in the same
    /// directory listing.
    ///
    /// Walks the filesystem synchronously; call during startup only.
    pub fn register(&mut self, root: impl AsRef<Path>, prefix: &str) -> Result<()> {
        let root = root.as_ref();

        let mut by_dir: HashMap<PathBuf, Vec<String>> = HashMap::new();
        for entry in WalkDir::new(root) {
            let entry = entry.map_err(|source| Error::Walk {
                root: root.to_path_buf(),
                source,
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            let dir = entry
                .path()
                .parent()
                .unwrap_or(root)
                .to_path_buf();
            by_dir.entry(dir).or_default().push(name);
        }

        self.prefixes.push(prefix.to_string());

        for (dir, names) in &by_dir {
            for name in names {
                if has_uncompressed_counterpart(name, names) {
                    continue;
                }
                let physical = dir.join(name);
                let relative = physical
                    .strip_prefix(root)
                    .expect("walked path is under its root");
                self.files
                    .insert(logical_path(prefix, relative), physical);
            }
        }

        Ok(())
    }

    /// O(1) logical path lookup.
    pub fn lookup(&self, logical: &str) -> Option<&Path> {
        self.files.get(logical).map(PathBuf::as_path)
    }

    /// Whether the path falls under any registered prefix.
    pub fn matches_prefix(&self, path: &str) -> bool {
        self.prefixes.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Number of indexed files.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Whether the index holds no files.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// A compressed variant is excluded when the file it was derived from sits
/// in the same directory listing.
fn has_uncompressed_counterpart(name: &str, siblings: &[String]) -> bool {
    CONTENT_ENCODINGS.iter().any(|(suffix, _)| {
        name.strip_suffix(suffix)
            .is_some_and(|base| siblings.iter().any(|sibling| sibling == base))
    })
}

/// Join the URL prefix with a filesystem-relative path, forward slashes only.
fn logical_path(prefix: &str, relative: &Path) -> String {
    let relative = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");

    if prefix.ends_with('/') {
        format!("{prefix}{relative}")
    } else {
        format!("{prefix}/{relative}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, content: &[u8]) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_register_and_lookup() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.txt", b"a");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        touch(&tmp.path().join("sub"), "b.css", b"b");

        let mut index = FileIndex::new();
        index.register(tmp.path(), "/static/").unwrap();

        assert_eq!(index.len(), 2);
        assert_eq!(
            index.lookup("/static/a.txt").unwrap(),
            tmp.path().join("a.txt")
        );
        assert_eq!(
            index.lookup("/static/sub/b.css").unwrap(),
            tmp.path().join("sub/b.css")
        );
        assert!(index.lookup("/static/missing.txt").is_none());
    }

    #[test]
    fn test_compressed_siblings_not_indexed() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "app.js", b"js");
        touch(tmp.path(), "app.js.gz", b"gz");
        touch(tmp.path(), "app.js.br", b"br");

        let mut index = FileIndex::new();
        index.register(tmp.path(), "/static/").unwrap();

        assert_eq!(index.len(), 1);
        assert!(index.lookup("/static/app.js").is_some());
        assert!(index.lookup("/static/app.js.gz").is_none());
        assert!(index.lookup("/static/app.js.br").is_none());
    }

    #[test]
    fn test_orphan_variant_indexed_directly() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "release.tar.gz", b"tarball");

        let mut index = FileIndex::new();
        index.register(tmp.path(), "/downloads/").unwrap();

        assert!(index.lookup("/downloads/release.tar.gz").is_some());
    }

    #[test]
    fn test_counterpart_check_is_per_directory() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "app.js.gz", b"gz");
        fs::create_dir(tmp.path().join("sub")).unwrap();
        touch(&tmp.path().join("sub"), "app.js", b"js");

        let mut index = FileIndex::new();
        index.register(tmp.path(), "/static/").unwrap();

        // The counterpart lives in a different directory, so the variant
        // keeps its own logical path
        assert!(index.lookup("/static/app.js.gz").is_some());
        assert!(index.lookup("/static/sub/app.js").is_some());
    }

    #[test]
    fn test_last_registration_wins() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(first.path(), "a.txt", b"first");
        touch(second.path(), "a.txt", b"second");

        let mut index = FileIndex::new();
        index.register(first.path(), "/static/").unwrap();
        index.register(second.path(), "/static/").unwrap();

        assert_eq!(
            index.lookup("/static/a.txt").unwrap(),
            second.path().join("a.txt")
        );
    }

    #[test]
    fn test_prefix_matching() {
        let tmp = TempDir::new().unwrap();
        let mut index = FileIndex::new();
        index.register(tmp.path(), "/static/").unwrap();
        index.register(tmp.path(), "/media/").unwrap();

        assert!(index.matches_prefix("/static/a.txt"));
        assert!(index.matches_prefix("/media/x"));
        assert!(!index.matches_prefix("/api/users"));
        assert!(!index.matches_prefix("/static"));
    }

    #[test]
    fn test_prefix_without_trailing_slash() {
        let tmp = TempDir::new().unwrap();
        touch(tmp.path(), "a.txt", b"a");

        let mut index = FileIndex::new();
        index.register(tmp.path(), "/static").unwrap();

        assert!(index.lookup("/static/a.txt").is_some());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut index = FileIndex::new();
        let missing = tmp.path().join("does-not-exist");
        assert!(index.register(&missing, "/static/").is_err());
    }
}
