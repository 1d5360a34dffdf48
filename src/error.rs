//! Crate error type
//!
//! Request handling never surfaces these: every request-path failure is
//! converted into a well-formed HTTP response. The variants here cover the
//! two startup/offline operations that can legitimately fail as a whole:
//! building the file index and running the precompression batch.

use std::path::PathBuf;

/// Errors produced by index construction and the precompression pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A directory registered for serving or compression does not exist.
    #[error("root directory not found: {}", .0.display())]
    MissingRoot(PathBuf),

    /// Walking a directory tree failed partway through.
    #[error("failed to walk {}", root.display())]
    Walk {
        /// The tree being walked when the failure occurred.
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
