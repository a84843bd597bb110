//! Read-only access to a backup's Manifest.db

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use crate::error::{RestoreError, Result};

use super::entry::ManifestEntry;

/// File name of the manifest inside a backup directory
pub const MANIFEST_FILE_NAME: &str = "Manifest.db";

const FILES_QUERY: &str = r#"
    SELECT
        fileID, domain, relativePath, flags, file
    FROM Files
"#;

/// Read-only handle on the manifest store
pub struct ManifestDatabase {
    conn: Connection,
    db_path: PathBuf,
}

/// Row counters from one pass over the `Files` table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub rows_read: usize,
    /// Rows dropped before resolution because `relativePath` was empty
    pub empty_paths: usize,
}

impl ManifestDatabase {
    /// Open `Manifest.db` inside a backup source directory
    pub fn open_in(source_dir: impl AsRef<Path>) -> Result<Self> {
        Self::open(source_dir.as_ref().join(MANIFEST_FILE_NAME))
    }

    /// Open a manifest database file read-only and check that it answers queries
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let unavailable = |source| RestoreError::ManifestUnavailable {
            path: db_path.clone(),
            source,
        };

        let conn = Connection::open_with_flags(
            &db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(unavailable)?;

        // Opening is lazy; a garbage file only fails on first read
        conn.query_row("SELECT COUNT(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(unavailable)?;

        tracing::debug!("Opened manifest {}", db_path.display());
        Ok(Self { conn, db_path })
    }

    /// Stream every row with a non-empty relative path to `visit`.
    ///
    /// Rows are decoded one at a time; the first decode error or callback
    /// error stops the scan and is returned.
    pub fn for_each_file_entry<F>(&self, mut visit: F) -> Result<ScanStats>
    where
        F: FnMut(ManifestEntry) -> Result<()>,
    {
        let mut stmt = self.conn.prepare(FILES_QUERY)?;
        let mut rows = stmt.query([])?;
        let mut stats = ScanStats::default();

        while let Some(row) = rows.next()? {
            stats.rows_read += 1;

            let relative_path: Option<String> = row.get(2)?;
            let relative_path = relative_path.unwrap_or_default();
            if relative_path.is_empty() {
                stats.empty_paths += 1;
                continue;
            }

            let entry = ManifestEntry {
                file_id: row.get(0)?,
                domain: row.get(1)?,
                relative_path,
                flags: row.get(3)?,
                file_entry_type: row.get_ref(4)?.into(),
            };

            visit(entry)?;
        }

        Ok(stats)
    }

    /// Total number of rows in `Files`, including ones that will be skipped
    pub fn entry_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM Files", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.db_path
    }
}
