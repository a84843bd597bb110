//! Tree reconstruction: path resolution and the materialization passes

pub mod domain;
pub mod engine;
pub mod materialize;
pub mod resolver;

pub use domain::{domain_segments, matching_prefix, DOMAIN_PREFIXES};

pub use engine::{RestoreConfig, RestoreProgress, RestoreStage, Restorer};

pub use materialize::{copy_file, copy_files, create_directories, CopyMode, CopyStats};

pub use resolver::{
    destination_for, source_path, Destination, ResolveStats, Resolver, RestorePlan,
    BUCKET_PREFIX_LEN,
};
