//! File-resident state store for Spritelet identities.
//!
//! This crate provides the storage layer: `StoreLayout` for the on-disk
//! directory structure, the path resolver that keeps artifact paths inside
//! `states/`, atomic document writes and event appends, the cross-process
//! `StoreLock`, and typed stores for the profile, catalog, and current
//! signal. `verify_store` checks that the documents agree with the files
//! they reference.

pub mod atomic;
pub mod catalog;
pub mod integrity;
pub mod layout;
pub mod lock;
pub mod paths;
pub mod profile;
pub mod signal;

pub use atomic::{append_event, read_document, read_records, write_bytes, write_document};
pub use catalog::{CatalogStore, CreatedAt};
pub use integrity::{verify_store, IntegrityFailure, IntegrityReport};
pub use layout::{ClearReport, StoreLayout};
pub use lock::StoreLock;
pub use paths::{resolve_state_path, resolve_store_path};
pub use profile::ProfileStore;
pub use signal::SignalTracker;

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Fsync a directory to ensure that a preceding `rename()` is durable.
///
/// POSIX does not guarantee a rename survives a crash until the parent
/// directory itself has been synced.
pub(crate) fn fsync_dir(dir: &Path) -> Result<(), std::io::Error> {
    let f = std::fs::File::open(dir)?;
    f.sync_all()
}

/// Failure classes surfaced to callers. Each maps to a distinct exit status
/// in the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MissingStore,
    InvalidPath,
    OutOfBounds,
    MissingArtifact,
    GenerationFailure,
    Config,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingStore => write!(f, "missing_store"),
            ErrorKind::InvalidPath => write!(f, "invalid_path"),
            ErrorKind::OutOfBounds => write!(f, "out_of_bounds"),
            ErrorKind::MissingArtifact => write!(f, "missing_artifact"),
            ErrorKind::GenerationFailure => write!(f, "generation_failure"),
            ErrorKind::Config => write!(f, "config"),
            ErrorKind::Io => write!(f, "io"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("missing {}; run `spritelet init` first", .0.display())]
    MissingStore(PathBuf),
    #[error("invalid path '{0}': must be relative to the store root")]
    InvalidPath(String),
    #[error("path '{path}' escapes {scope}")]
    OutOfBounds { path: String, scope: String },
    #[error("artifact not found: {0}")]
    MissingArtifact(String),
    #[error("lock acquisition failed: {0}")]
    LockFailed(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::MissingStore(_) => ErrorKind::MissingStore,
            StoreError::InvalidPath(_) => ErrorKind::InvalidPath,
            StoreError::OutOfBounds { .. } => ErrorKind::OutOfBounds,
            StoreError::MissingArtifact(_) => ErrorKind::MissingArtifact,
            StoreError::Io(_) | StoreError::Serialization(_) | StoreError::LockFailed(_) => {
                ErrorKind::Io
            }
        }
    }
}
