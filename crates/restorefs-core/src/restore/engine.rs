//! Restore pipeline: scan manifest, resolve, create directories, copy files
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::error::Result;
use crate::manifest::ManifestDatabase;
use crate::RestoreReport;

use super::materialize::{copy_files, create_directories, CopyMode, CopyStats};
use super::resolver::{RestorePlan, Resolver};

/// Restore run configuration
#[derive(Debug, Clone)]
pub struct RestoreConfig {
    /// Backup directory holding Manifest.db and the bucketed blobs
    pub source_dir: PathBuf,
    /// Root of the reconstructed tree
    pub destination_dir: PathBuf,
    pub copy_mode: CopyMode,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("src"),
            destination_dir: PathBuf::from("dst"),
            copy_mode: CopyMode::Sequential,
        }
    }
}

impl RestoreConfig {
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            ..Default::default()
        }
    }

    pub fn with_copy_mode(mut self, copy_mode: CopyMode) -> Self {
        self.copy_mode = copy_mode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreStage {
    ScanManifest,
    Resolve,
    CreateDirectories,
    CopyFiles,
    Done,
}

impl std::fmt::Display for RestoreStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestoreStage::ScanManifest => write!(f, "Scanning manifest"),
            RestoreStage::Resolve => write!(f, "Resolving paths"),
            RestoreStage::CreateDirectories => write!(f, "Creating directories"),
            RestoreStage::CopyFiles => write!(f, "Copying files"),
            RestoreStage::Done => write!(f, "Done"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RestoreProgress {
    pub stage: RestoreStage,
    pub completed: u64,
    pub total: u64,
    /// Destination-relative path of the file just copied, during `CopyFiles`
    pub current: Option<PathBuf>,
}

type ProgressCallback = Box<dyn Fn(RestoreProgress) + Send + Sync>;

/// Drives one restore run from a backup directory to a destination tree
pub struct Restorer {
    config: RestoreConfig,
    progress_callback: Option<ProgressCallback>,
}

impl Restorer {
    pub fn new(config: RestoreConfig) -> Self {
        Self {
            config,
            progress_callback: None,
        }
    }

    pub fn set_progress_callback<F>(&mut self, callback: F)
    where
        F: Fn(RestoreProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
    }

    /// Run every phase in order. Each phase completes before the next
    /// starts; the first error aborts the run and nothing is rolled back.
    pub fn run(&self) -> Result<RestoreReport> {
        let started_at = Utc::now();
        let timer = Instant::now();

        let manifest = ManifestDatabase::open_in(&self.config.source_dir)?;
        let total_rows = manifest.entry_count()? as u64;
        self.emit(RestoreStage::ScanManifest, 0, total_rows, None);

        let (plan, rows_read) = self.scan_and_resolve(&manifest, total_rows)?;
        tracing::info!(
            "Resolved {} files into {} directories ({} rows, {} non-file, {} collisions)",
            plan.files.len(),
            plan.directories.len(),
            rows_read,
            plan.stats.skipped_non_file,
            plan.stats.collisions
        );

        let directories_created = self.create_directories(&plan)?;
        let copy_stats = self.copy_files(&plan)?;

        let report = RestoreReport {
            source_dir: self.config.source_dir.clone(),
            destination_dir: self.config.destination_dir.clone(),
            rows_read,
            resolve: plan.stats,
            directories_created,
            files_copied: copy_stats.files_copied,
            bytes_copied: copy_stats.bytes_copied,
            started_at,
            finished_at: Utc::now(),
        };

        self.emit(
            RestoreStage::Done,
            report.files_copied as u64,
            plan.files.len() as u64,
            None,
        );
        tracing::info!(
            "Restore complete: {} files, {} bytes in {:.1}s",
            report.files_copied,
            report.bytes_copied,
            timer.elapsed().as_secs_f64()
        );

        Ok(report)
    }

    /// Scan and resolve the manifest without touching the destination
    pub fn plan(&self) -> Result<RestorePlan> {
        let manifest = ManifestDatabase::open_in(&self.config.source_dir)?;
        let total_rows = manifest.entry_count()? as u64;
        let (plan, _) = self.scan_and_resolve(&manifest, total_rows)?;
        Ok(plan)
    }

    fn scan_and_resolve(
        &self,
        manifest: &ManifestDatabase,
        total_rows: u64,
    ) -> Result<(RestorePlan, usize)> {
        tracing::info!("Scanning manifest {}", manifest.path().display());

        let mut resolver = Resolver::new();
        let mut visited = 0u64;
        let scan = manifest.for_each_file_entry(|entry| {
            resolver.resolve(&entry)?;
            visited += 1;
            if visited % 1000 == 0 {
                self.emit(RestoreStage::Resolve, visited, total_rows, None);
            }
            Ok(())
        })?;

        let mut plan = resolver.finish();
        plan.stats.skipped_empty_path += scan.empty_paths;
        self.emit(
            RestoreStage::Resolve,
            scan.rows_read as u64,
            total_rows,
            None,
        );

        Ok((plan, scan.rows_read))
    }

    fn create_directories(&self, plan: &RestorePlan) -> Result<usize> {
        let total = plan.directories.len() as u64;
        self.emit(RestoreStage::CreateDirectories, 0, total, None);
        tracing::info!(
            "Creating {} directories under {}",
            total,
            self.config.destination_dir.display()
        );

        let created = create_directories(&plan.directories, &self.config.destination_dir)?;
        self.emit(RestoreStage::CreateDirectories, total, total, None);
        Ok(created)
    }

    fn copy_files(&self, plan: &RestorePlan) -> Result<CopyStats> {
        let total = plan.files.len() as u64;
        self.emit(RestoreStage::CopyFiles, 0, total, None);
        tracing::info!("Copying {} files ({:?})", total, self.config.copy_mode);

        let completed = AtomicU64::new(0);
        copy_files(
            &plan.files,
            &self.config.source_dir,
            &self.config.destination_dir,
            self.config.copy_mode,
            |relative: &Path, _bytes| {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                self.emit(
                    RestoreStage::CopyFiles,
                    done,
                    total,
                    Some(relative.to_path_buf()),
                );
            },
        )
    }

    fn emit(&self, stage: RestoreStage, completed: u64, total: u64, current: Option<PathBuf>) {
        if let Some(ref callback) = self.progress_callback {
            callback(RestoreProgress {
                stage,
                completed,
                total,
                current,
            });
        }
    }
}
