//! Manifest reader module
//!
//! Backups keep the logical layout of every file (domain, relative path,
//! entry kind) in an SQLite store next to the content-addressed blobs.
//! This module only ever reads from it.

pub mod database;
pub mod entry;

// Re-export main types
pub use database::{ManifestDatabase, ScanStats, MANIFEST_FILE_NAME};
pub use entry::{EntryBlob, ManifestEntry, FLAG_REGULAR_FILE};
