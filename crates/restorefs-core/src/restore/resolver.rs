//! Destination path resolution
//!
//! Turns manifest rows into a [`RestorePlan`]: the set of directories to
//! create and the map from destination file to source identifier. No I/O
//! happens here.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use crate::error::{RestoreError, Result};
use crate::manifest::ManifestEntry;

use super::domain::domain_segments;

/// Length of the fan-out bucket directory name in the backup layout
pub const BUCKET_PREFIX_LEN: usize = 2;

/// Where a single manifest entry lands, relative to the destination root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub directory: PathBuf,
    pub file_name: String,
}

impl Destination {
    pub fn file_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }
}

/// Accumulated work for the directory and copy passes
#[derive(Debug, Clone, Default)]
pub struct RestorePlan {
    /// Distinct destination-relative directories
    pub directories: BTreeSet<PathBuf>,
    /// Destination-relative file path to source file ID
    pub files: BTreeMap<PathBuf, String>,
    pub stats: ResolveStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResolveStats {
    /// Entries that produced a copy task
    pub resolved: usize,
    /// Entries skipped because they are not regular files
    pub skipped_non_file: usize,
    /// Entries skipped because their relative path was empty
    pub skipped_empty_path: usize,
    /// Entries whose destination replaced an earlier entry's
    pub collisions: usize,
}

/// Builds a [`RestorePlan`] one manifest entry at a time
#[derive(Debug, Default)]
pub struct Resolver {
    plan: RestorePlan,
}

impl Resolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the directory and copy task for `entry`.
    ///
    /// Non-file entries and entries without a relative path are skipped and
    /// yield `None`. When two entries resolve to the same destination the
    /// later one replaces the earlier mapping; this is logged and counted.
    pub fn resolve(&mut self, entry: &ManifestEntry) -> Result<Option<Destination>> {
        if entry.relative_path.is_empty() {
            self.plan.stats.skipped_empty_path += 1;
            return Ok(None);
        }
        if !entry.is_regular_file() {
            self.plan.stats.skipped_non_file += 1;
            return Ok(None);
        }

        validate_file_id(&entry.file_id)?;
        let destination = destination_for(&entry.domain, &entry.relative_path)?;
        let file_path = destination.file_path();

        self.plan.directories.insert(destination.directory.clone());
        if let Some(previous) = self
            .plan
            .files
            .insert(file_path.clone(), entry.file_id.clone())
        {
            self.plan.stats.collisions += 1;
            tracing::warn!(
                "Destination {} claimed by both {} and {}; keeping the later entry",
                file_path.display(),
                previous,
                entry.file_id
            );
        }
        self.plan.stats.resolved += 1;

        Ok(Some(destination))
    }

    pub fn finish(self) -> RestorePlan {
        self.plan
    }
}

/// Compute the destination directory and file name for a domain and
/// slash-separated relative path
pub fn destination_for(domain: &str, relative_path: &str) -> Result<Destination> {
    let unsafe_path = |reason| RestoreError::UnsafePath {
        domain: domain.to_string(),
        relative_path: relative_path.to_string(),
        reason,
    };

    let mut nodes: Vec<&str> = relative_path.split('/').collect();
    // split always yields at least one element
    let file_name = nodes.pop().unwrap_or_default();
    if file_name.is_empty() || file_name == "." || file_name == ".." {
        return Err(unsafe_path("missing file name"));
    }

    // Clean the joined segments lexically; `..` may only undo a segment
    // pushed earlier, never climb above the destination root
    let mut directory = PathBuf::new();
    for segment in domain_segments(domain).into_iter().chain(nodes) {
        match segment {
            "" | "." => {}
            ".." => {
                if !directory.pop() {
                    return Err(unsafe_path("path climbs above the destination root"));
                }
            }
            _ => directory.push(segment),
        }
    }

    if !is_plain_relative(&directory) {
        return Err(unsafe_path("path contains non-normal components"));
    }
    if !is_plain_relative(Path::new(file_name)) {
        return Err(unsafe_path("file name is not a plain name"));
    }

    Ok(Destination {
        directory,
        file_name: file_name.to_string(),
    })
}

/// Location of a blob inside the backup: `<source_root>/<id[..2]>/<id>`
pub fn source_path(source_root: &Path, file_id: &str) -> Result<PathBuf> {
    validate_file_id(file_id)?;
    let bucket = &file_id[..BUCKET_PREFIX_LEN];
    Ok(source_root.join(bucket).join(file_id))
}

fn validate_file_id(file_id: &str) -> Result<()> {
    let invalid = |reason| RestoreError::InvalidIdentifier {
        id: file_id.to_string(),
        reason,
    };

    if file_id.len() < BUCKET_PREFIX_LEN || !file_id.is_char_boundary(BUCKET_PREFIX_LEN) {
        return Err(invalid("too short for a fan-out bucket"));
    }
    if file_id.contains(['/', '\\']) || !is_plain_relative(Path::new(file_id)) {
        return Err(invalid("not a plain file name"));
    }
    Ok(())
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().all(|c| matches!(c, Component::Normal(_)))
}
