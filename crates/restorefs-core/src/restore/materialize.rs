//! Directory creation and file copy passes
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use crate::error::{RestoreError, Result};

use super::resolver::source_path;

/// How the copy pass schedules its work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CopyMode {
    #[default]
    Sequential,
    /// Copy on the rayon pool; the first failure stops the remaining tasks
    Parallel,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub files_copied: usize,
    pub bytes_copied: u64,
}

/// Create every planned directory (and missing ancestors) under `destination_root`
pub fn create_directories(
    directories: &BTreeSet<PathBuf>,
    destination_root: &Path,
) -> Result<usize> {
    for dir in directories {
        let path = destination_root.join(dir);
        create_dir_all(&path).map_err(|source| RestoreError::DirectoryCreation {
            path: path.clone(),
            source,
        })?;
    }

    tracing::debug!(
        "Ensured {} directories under {}",
        directories.len(),
        destination_root.display()
    );
    Ok(directories.len())
}

#[cfg(unix)]
fn create_dir_all(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::DirBuilderExt;
    fs::DirBuilder::new().recursive(true).mode(0o755).create(path)
}

#[cfg(not(unix))]
fn create_dir_all(path: &Path) -> io::Result<()> {
    fs::create_dir_all(path)
}

/// Copy one regular file, returning the number of bytes written.
///
/// `src` must be a plain file; symlinks and special files are refused.
/// The destination is created or truncated.
pub fn copy_file(src: &Path, dst: &Path) -> Result<u64> {
    let metadata = fs::symlink_metadata(src).map_err(|e| RestoreError::SourceNotRegularFile {
        path: src.to_path_buf(),
        source: Some(e),
    })?;
    if !metadata.file_type().is_file() {
        return Err(RestoreError::SourceNotRegularFile {
            path: src.to_path_buf(),
            source: None,
        });
    }

    let copy_err = |source| RestoreError::CopyIo {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        source,
    };

    let mut source = File::open(src).map_err(copy_err)?;
    let mut destination = File::create(dst).map_err(copy_err)?;
    io::copy(&mut source, &mut destination).map_err(copy_err)
}

/// Copy every planned file from its fan-out bucket to its destination.
///
/// Every destination directory must already exist. `on_copied` is called
/// after each file with its destination-relative path and size.
pub fn copy_files<F>(
    files: &BTreeMap<PathBuf, String>,
    source_root: &Path,
    destination_root: &Path,
    mode: CopyMode,
    on_copied: F,
) -> Result<CopyStats>
where
    F: Fn(&Path, u64) + Send + Sync,
{
    let copy_one = |relative: &PathBuf, file_id: &String| -> Result<u64> {
        let src = source_path(source_root, file_id)?;
        let dst = destination_root.join(relative);
        let bytes = copy_file(&src, &dst)?;
        tracing::debug!("Copied {} -> {} ({} bytes)", file_id, relative.display(), bytes);
        on_copied(relative, bytes);
        Ok(bytes)
    };

    match mode {
        CopyMode::Sequential => {
            let mut stats = CopyStats::default();
            for (relative, file_id) in files {
                stats.bytes_copied += copy_one(relative, file_id)?;
                stats.files_copied += 1;
            }
            Ok(stats)
        }
        CopyMode::Parallel => {
            let files_copied = AtomicUsize::new(0);
            let bytes_copied = AtomicU64::new(0);

            files.par_iter().try_for_each(|(relative, file_id)| {
                let bytes = copy_one(relative, file_id)?;
                files_copied.fetch_add(1, Ordering::Relaxed);
                bytes_copied.fetch_add(bytes, Ordering::Relaxed);
                Ok::<(), RestoreError>(())
            })?;

            Ok(CopyStats {
                files_copied: files_copied.into_inner(),
                bytes_copied: bytes_copied.into_inner(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_blob(source_root: &Path, file_id: &str, content: &[u8]) {
        let bucket = source_root.join(&file_id[..2]);
        fs::create_dir_all(&bucket).unwrap();
        fs::write(bucket.join(file_id), content).unwrap();
    }

    #[test]
    fn test_create_directories_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let dirs: BTreeSet<PathBuf> = [
            PathBuf::from("AppDomain/com.example.app/Documents"),
            PathBuf::from("HomeDomain/Library/Preferences"),
        ]
        .into_iter()
        .collect();

        assert_eq!(create_directories(&dirs, temp_dir.path()).unwrap(), 2);
        assert_eq!(create_directories(&dirs, temp_dir.path()).unwrap(), 2);

        assert!(temp_dir.path().join("AppDomain/com.example.app/Documents").is_dir());
        assert!(temp_dir.path().join("HomeDomain/Library/Preferences").is_dir());
    }

    #[test]
    fn test_create_directories_blocked_by_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("HomeDomain"), b"in the way").unwrap();

        let dirs: BTreeSet<PathBuf> = [PathBuf::from("HomeDomain/Library")].into_iter().collect();
        let err = create_directories(&dirs, temp_dir.path()).unwrap_err();
        assert!(matches!(err, RestoreError::DirectoryCreation { .. }));
    }

    #[test]
    fn test_copy_file_preserves_content() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.bin");
        let dst = temp_dir.path().join("dst.bin");
        let data: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &data).unwrap();

        let copied = copy_file(&src, &dst).unwrap();

        assert_eq!(copied, data.len() as u64);
        assert_eq!(fs::read(&dst).unwrap(), data);
    }

    #[test]
    fn test_copy_file_truncates_existing_destination() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        let dst = temp_dir.path().join("dst.txt");
        fs::write(&src, b"short").unwrap();
        fs::write(&dst, b"a much longer previous content").unwrap();

        copy_file(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"short");
    }

    #[test]
    fn test_copy_file_missing_source() {
        let temp_dir = TempDir::new().unwrap();
        let err = copy_file(
            &temp_dir.path().join("missing"),
            &temp_dir.path().join("out"),
        )
        .unwrap_err();
        assert!(matches!(err, RestoreError::SourceNotRegularFile { .. }));
        assert!(!temp_dir.path().join("out").exists());
    }

    #[test]
    fn test_copy_file_rejects_directory() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("a_dir");
        fs::create_dir(&src).unwrap();

        let err = copy_file(&src, &temp_dir.path().join("out")).unwrap_err();
        assert!(matches!(err, RestoreError::SourceNotRegularFile { .. }));
        assert!(err.to_string().contains("is not a regular file"));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_file_rejects_symlink() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        let link = temp_dir.path().join("link");
        fs::write(&target, b"data").unwrap();
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let err = copy_file(&link, &temp_dir.path().join("out")).unwrap_err();
        assert!(matches!(err, RestoreError::SourceNotRegularFile { .. }));
    }

    #[test]
    fn test_copy_file_missing_destination_dir() {
        let temp_dir = TempDir::new().unwrap();
        let src = temp_dir.path().join("src.txt");
        fs::write(&src, b"x").unwrap();

        let err = copy_file(&src, &temp_dir.path().join("nope/dst.txt")).unwrap_err();
        assert!(matches!(err, RestoreError::CopyIo { .. }));
    }

    #[test]
    fn test_copy_files_both_modes() {
        for mode in [CopyMode::Sequential, CopyMode::Parallel] {
            let source = TempDir::new().unwrap();
            let dest = TempDir::new().unwrap();

            let mut files = BTreeMap::new();
            for i in 0..20u8 {
                let id = format!("{:02x}{}", i, "f00d");
                write_blob(source.path(), &id, &vec![i; i as usize * 10]);
                files.insert(PathBuf::from(format!("HomeDomain/file{}.bin", i)), id);
            }
            fs::create_dir_all(dest.path().join("HomeDomain")).unwrap();

            let seen = AtomicUsize::new(0);
            let stats = copy_files(&files, source.path(), dest.path(), mode, |_, _| {
                seen.fetch_add(1, Ordering::Relaxed);
            })
            .unwrap();

            assert_eq!(stats.files_copied, 20);
            assert_eq!(stats.bytes_copied, (0..20u64).map(|i| i * 10).sum::<u64>());
            assert_eq!(seen.load(Ordering::Relaxed), 20);
            assert_eq!(
                fs::read(dest.path().join("HomeDomain/file7.bin")).unwrap(),
                vec![7u8; 70]
            );
        }
    }

    #[test]
    fn test_copy_files_fails_fast_on_missing_blob() {
        for mode in [CopyMode::Sequential, CopyMode::Parallel] {
            let source = TempDir::new().unwrap();
            let dest = TempDir::new().unwrap();
            fs::create_dir_all(dest.path().join("HomeDomain")).unwrap();

            let mut files = BTreeMap::new();
            files.insert(PathBuf::from("HomeDomain/gone.txt"), "ffmissing".to_string());

            let err = copy_files(&files, source.path(), dest.path(), mode, |_, _| {}).unwrap_err();
            assert!(matches!(err, RestoreError::SourceNotRegularFile { .. }));
        }
    }
}
