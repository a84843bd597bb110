use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod error;
pub mod manifest;
pub mod restore;

pub use error::{RestoreError, Result};

// Re-export key types
pub use manifest::{EntryBlob, ManifestDatabase, ManifestEntry};
pub use restore::{
    CopyMode, ResolveStats, RestoreConfig, RestorePlan, RestoreProgress, RestoreStage, Restorer,
};

/// Outcome of a completed restore run
#[derive(Debug, Clone, Serialize)]
pub struct RestoreReport {
    pub source_dir: PathBuf,
    pub destination_dir: PathBuf,
    /// Rows read from the `Files` table
    pub rows_read: usize,
    pub resolve: ResolveStats,
    pub directories_created: usize,
    pub files_copied: usize,
    /// Informational only; never checked against the manifest
    pub bytes_copied: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Rebuild the directory tree of the backup in `source_dir` under `destination_dir`
pub fn restore_backup(source_dir: &Path, destination_dir: &Path) -> Result<RestoreReport> {
    tracing::info!(
        "Restoring {} into {}",
        source_dir.display(),
        destination_dir.display()
    );

    Restorer::new(RestoreConfig::new(source_dir, destination_dir)).run()
}

/// Resolve the manifest of the backup in `source_dir` without writing anything
pub fn plan_restore(source_dir: &Path) -> Result<RestorePlan> {
    let config = RestoreConfig {
        source_dir: source_dir.to_path_buf(),
        ..Default::default()
    };
    Restorer::new(config).plan()
}
