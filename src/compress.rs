//! Offline precompression pipeline
//!
//! Walks a directory tree and writes `.gz` (and, when built with the
//! `brotli` feature, `.br`) siblings next to every file worth compressing.
//! Files are processed independently by a fixed-size worker pool; one file
//! failing never aborts the batch. Outputs are published atomically, so an
//! interrupted run leaves no half-written file visible under a final name.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;

use walkdir::WalkDir;

use crate::error::{Error, Result};

/// Extensions that it's not worth trying to compress: formats that are
/// already entropy-coded gain nothing from another general-purpose pass.
pub const SKIP_COMPRESS_EXTENSIONS: &[&str] = &[
    // Images
    "jpg", "jpeg", "png", "gif", "webp",
    // Compressed files
    "zip", "gz", "tgz", "bz2", "tbz", "xz", "br",
    // Flash
    "swf", "flv",
    // Fonts
    "woff", "woff2",
    // Video
    "3gp", "3gpp", "asf", "avi", "m4v", "mov", "mp4", "mpeg", "mpg", "webm", "wmv",
];

/// A variant is only kept when it lands below this fraction of the original.
const GAIN_THRESHOLD: f64 = 0.9;

/// Compression algorithms the pipeline attempts, independently per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Brotli, written as `<name>.br`
    Brotli,
    /// Gzip, written as `<name>.gz`
    Gzip,
}

impl Algorithm {
    /// Suffix appended to the original file name.
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Brotli => ".br",
            Self::Gzip => ".gz",
        }
    }

    /// Human-readable name for reports.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Brotli => "brotli",
            Self::Gzip => "gzip",
        }
    }
}

/// What happened to one file for one algorithm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Variant written beside the original
    Written {
        /// Algorithm that produced the variant
        algorithm: Algorithm,
        /// Original size in bytes
        original: u64,
        /// Compressed size in bytes
        compressed: u64,
    },
    /// Variant discarded: the gain did not clear the threshold
    Skipped {
        /// Algorithm whose output was discarded
        algorithm: Algorithm,
    },
    /// The file could not be read, or the variant could not be written
    Failed {
        /// Underlying error, stringified for the report
        error: String,
    },
}

/// One report line: a file plus what happened to it.
#[derive(Debug)]
pub struct FileReport {
    /// The original (uncompressed) file
    pub path: PathBuf,
    /// The outcome for one algorithm
    pub outcome: Outcome,
}

impl FileReport {
    /// Bytes saved by this entry, zero unless a variant was written.
    pub fn bytes_saved(&self) -> u64 {
        match self.outcome {
            Outcome::Written {
                original,
                compressed,
                ..
            } => original.saturating_sub(compressed),
            _ => 0,
        }
    }
}

/// Compress every eligible file under `root`.
///
/// Files are distributed over a worker pool sized to the available CPU
/// parallelism; completion order is irrelevant and the returned reports are
/// sorted by path. Only a missing or unwalkable root is an error; per-file
/// failures come back as [`Outcome::Failed`] entries.
pub fn compress_tree(root: &Path) -> Result<Vec<FileReport>> {
    if !root.is_dir() {
        return Err(Error::MissingRoot(root.to_path_buf()));
    }

    let candidates = collect_candidates(root)?;
    let workers = thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(candidates.len().max(1));

    let cursor = AtomicUsize::new(0);
    let (tx, rx) = mpsc::channel();

    thread::scope(|scope| {
        for _ in 0..workers {
            let tx = tx.clone();
            let cursor = &cursor;
            let candidates = &candidates;
            scope.spawn(move || loop {
                let next = cursor.fetch_add(1, Ordering::Relaxed);
                let Some(path) = candidates.get(next) else {
                    break;
                };
                for report in compress_file(path) {
                    if tx.send(report).is_err() {
                        break;
                    }
                }
            });
        }
    });
    drop(tx);

    let mut reports: Vec<FileReport> = rx.into_iter().collect();
    reports.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(reports)
}

/// Attempt every algorithm against one file.
fn compress_file(path: &Path) -> Vec<FileReport> {
    let original = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            return vec![FileReport {
                path: path.to_path_buf(),
                outcome: Outcome::Failed {
                    error: err.to_string(),
                },
            }];
        }
    };

    let mut reports = Vec::with_capacity(2);
    if let Some(report) = try_brotli(path, &original) {
        reports.push(report);
    }
    reports.push(try_gzip(path, &original));
    reports
}

/// Gzip with a fixed mtime and level, so repeated runs over unchanged input
/// are byte-for-byte reproducible.
fn try_gzip(path: &Path, original: &[u8]) -> FileReport {
    let result = gzip_bytes(original);
    keep_if_smaller(path, original, result, Algorithm::Gzip)
}

fn gzip_bytes(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = flate2::GzBuilder::new()
        .mtime(0)
        .write(Vec::new(), flate2::Compression::new(9));
    encoder.write_all(input)?;
    encoder.finish()
}

/// Brotli at its default quality. Compiled out when the `brotli` feature is
/// off; the pipeline then degrades to gzip-only.
#[cfg(feature = "brotli")]
fn try_brotli(path: &Path, original: &[u8]) -> Option<FileReport> {
    let result = brotli_bytes(original);
    Some(keep_if_smaller(path, original, result, Algorithm::Brotli))
}

#[cfg(not(feature = "brotli"))]
fn try_brotli(_path: &Path, _original: &[u8]) -> Option<FileReport> {
    None
}

#[cfg(feature = "brotli")]
fn brotli_bytes(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut output = Vec::new();
    {
        let mut encoder = brotli::CompressorWriter::new(&mut output, 4096, 11, 22);
        encoder.write_all(input)?;
    }
    Ok(output)
}

/// Publish the variant only when it clears the gain threshold.
fn keep_if_smaller(
    path: &Path,
    original: &[u8],
    compressed: std::io::Result<Vec<u8>>,
    algorithm: Algorithm,
) -> FileReport {
    let outcome = match compressed {
        Err(err) => Outcome::Failed {
            error: err.to_string(),
        },
        #[allow(clippy::cast_precision_loss)]
        Ok(bytes) if (bytes.len() as f64) < original.len() as f64 * GAIN_THRESHOLD => {
            match publish(path, algorithm.suffix(), &bytes) {
                Ok(()) => Outcome::Written {
                    algorithm,
                    original: original.len() as u64,
                    compressed: bytes.len() as u64,
                },
                Err(err) => Outcome::Failed {
                    error: err.to_string(),
                },
            }
        }
        Ok(_) => Outcome::Skipped { algorithm },
    };

    FileReport {
        path: path.to_path_buf(),
        outcome,
    }
}

/// Write the variant to a temporary file in the same directory, then rename
/// it into place, so the dispatcher can never pick up a half-written file.
fn publish(path: &Path, suffix: &str, bytes: &[u8]) -> std::io::Result<()> {
    let target = suffixed(path, suffix);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.persist(&target).map_err(|err| err.error)?;
    Ok(())
}

fn suffixed(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Every regular file under `root` whose extension is not denylisted.
/// Sorted so the worker cursor walks a deterministic list.
fn collect_candidates(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry.map_err(|source| Error::Walk {
            root: root.to_path_buf(),
            source,
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if is_denylisted(entry.path()) {
            continue;
        }
        files.push(entry.into_path());
    }
    files.sort();
    Ok(files)
}

fn is_denylisted(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SKIP_COMPRESS_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    /// Low-entropy content that every algorithm shrinks well past the
    /// threshold.
    fn compressible() -> Vec<u8> {
        b"body { color: red; }\n".repeat(200).to_vec()
    }

    /// Pseudo-random bytes that no general-purpose compressor can shrink
    /// by 10%.
    fn incompressible(len: usize) -> Vec<u8> {
        let mut state: u64 = 0x2545_f491_4f6c_dd1d;
        (0..len)
            .map(|_| {
                state = state
                    .wrapping_mul(6_364_136_223_846_793_005)
                    .wrapping_add(1_442_695_040_888_963_407);
                (state >> 56) as u8
            })
            .collect()
    }

    #[test]
    fn test_writes_variants_for_compressible_files() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.css");
        fs::write(&path, compressible()).unwrap();

        let reports = compress_tree(tmp.path()).unwrap();

        let gz = fs::read(tmp.path().join("app.css.gz")).unwrap();
        assert!(!gz.is_empty());
        assert!((gz.len() as f64) < compressible().len() as f64 * 0.9);
        assert!(reports.iter().any(|r| {
            r.path == path
                && matches!(r.outcome, Outcome::Written { algorithm: Algorithm::Gzip, .. })
        }));

        #[cfg(feature = "brotli")]
        {
            assert!(tmp.path().join("app.css.br").exists());
            assert!(reports.iter().any(|r| {
                matches!(r.outcome, Outcome::Written { algorithm: Algorithm::Brotli, .. })
            }));
        }
    }

    #[test]
    fn test_gzip_output_is_reproducible() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("app.js");
        fs::write(&path, compressible()).unwrap();

        compress_tree(tmp.path()).unwrap();
        let first = fs::read(tmp.path().join("app.js.gz")).unwrap();

        compress_tree(tmp.path()).unwrap();
        let second = fs::read(tmp.path().join("app.js.gz")).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_insufficient_gain_is_skipped() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("noise.bin");
        fs::write(&path, incompressible(4096)).unwrap();

        let reports = compress_tree(tmp.path()).unwrap();

        assert!(!tmp.path().join("noise.bin.gz").exists());
        assert!(reports.iter().any(|r| {
            r.path == path && matches!(r.outcome, Outcome::Skipped { algorithm: Algorithm::Gzip })
        }));
    }

    #[test]
    fn test_denylisted_extensions_untouched() {
        let tmp = TempDir::new().unwrap();
        // Perfectly compressible content, but the extension rules it out
        fs::write(tmp.path().join("photo.png"), compressible()).unwrap();
        fs::write(tmp.path().join("archive.gz"), compressible()).unwrap();

        let reports = compress_tree(tmp.path()).unwrap();

        assert!(reports.is_empty());
        assert!(!tmp.path().join("photo.png.gz").exists());
        assert!(!tmp.path().join("archive.gz.gz").exists());
    }

    #[test]
    fn test_variants_not_recompressed_on_second_run() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("app.css"), compressible()).unwrap();

        compress_tree(tmp.path()).unwrap();
        let reports = compress_tree(tmp.path()).unwrap();

        // The .gz/.br outputs of the first run are denylisted candidates
        assert!(reports.iter().all(|r| r.path == tmp.path().join("app.css")));
        assert!(!tmp.path().join("app.css.gz.gz").exists());
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");
        assert!(matches!(
            compress_tree(&missing),
            Err(Error::MissingRoot(_))
        ));
    }

    #[test]
    fn test_reports_sorted_by_path() {
        let tmp = TempDir::new().unwrap();
        for name in ["c.txt", "a.txt", "b.txt"] {
            fs::write(tmp.path().join(name), compressible()).unwrap();
        }

        let reports = compress_tree(tmp.path()).unwrap();
        let paths: Vec<_> = reports.iter().map(|r| r.path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);
    }

    #[test]
    fn test_bytes_saved() {
        let report = FileReport {
            path: PathBuf::from("x"),
            outcome: Outcome::Written {
                algorithm: Algorithm::Gzip,
                original: 100,
                compressed: 40,
            },
        };
        assert_eq!(report.bytes_saved(), 60);

        let report = FileReport {
            path: PathBuf::from("x"),
            outcome: Outcome::Skipped {
                algorithm: Algorithm::Gzip,
            },
        };
        assert_eq!(report.bytes_saved(), 0);
    }
}
