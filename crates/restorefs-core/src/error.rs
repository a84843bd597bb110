//! Error taxonomy for a restore run
//!
//! Every variant is fatal: the pipeline never retries or skips, it surfaces
//! the first failure to the caller and leaves whatever was already written
//! in the destination tree.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RestoreError {
    /// Manifest.db could not be opened or did not answer the initial query
    #[error("manifest unavailable at {path}: {source}")]
    ManifestUnavailable {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query preparation, execution or row decoding failed mid-scan
    #[error("failed to read manifest entries: {0}")]
    ManifestRead(#[from] rusqlite::Error),

    /// File identifier cannot be mapped onto a fan-out bucket
    #[error("invalid file identifier {id:?}: {reason}")]
    InvalidIdentifier { id: String, reason: &'static str },

    /// Resolved destination would leave the destination root or has no filename
    #[error("unsafe destination path for {domain}/{relative_path}: {reason}")]
    UnsafePath {
        domain: String,
        relative_path: String,
        reason: &'static str,
    },

    #[error("failed to create directory {path}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Source blob is missing or is not a plain file
    #[error("{path} is not a regular file")]
    SourceNotRegularFile {
        path: PathBuf,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("failed to copy {from} to {to}: {source}")]
    CopyIo {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, RestoreError>;
