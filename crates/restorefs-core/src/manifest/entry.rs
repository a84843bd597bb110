//! Manifest row types

use rusqlite::types::ValueRef;

/// Value of `Files.flags` marking a regular file with a payload blob
pub const FLAG_REGULAR_FILE: i64 = 1;

/// One row of the `Files` table
#[derive(Debug, Clone, PartialEq)]
pub struct ManifestEntry {
    /// Opaque file ID; also names the blob at `<src>/<id[..2]>/<id>`
    pub file_id: String,
    pub domain: String,
    /// Slash-separated path relative to the domain root
    pub relative_path: String,
    /// Entry kind discriminator (1 = regular file, 2 = directory, 4 = symlink)
    pub flags: i64,
    /// The `file` column, carried through undecoded
    pub file_entry_type: EntryBlob,
}

impl ManifestEntry {
    /// Whether this row carries file content to materialize
    pub fn is_regular_file(&self) -> bool {
        self.flags == FLAG_REGULAR_FILE
    }
}

/// Opaque per-entry metadata column.
///
/// Backups store an archived property list here; nothing in the restore
/// path interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum EntryBlob {
    #[default]
    Null,
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Real(f64),
}

impl From<ValueRef<'_>> for EntryBlob {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => EntryBlob::Null,
            ValueRef::Integer(i) => EntryBlob::Integer(i),
            ValueRef::Real(r) => EntryBlob::Real(r),
            ValueRef::Text(t) => EntryBlob::Text(String::from_utf8_lossy(t).into_owned()),
            ValueRef::Blob(b) => EntryBlob::Bytes(b.to_vec()),
        }
    }
}
