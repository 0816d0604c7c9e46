use crate::layout::StoreLayout;
use crate::StoreError;
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Exclusive advisory lock over one store root.
///
/// Backed by `flock` on `<root>/.locks/store.lock`, so it excludes other
/// processes as well as other handles in this one. The lock is released when
/// the guard drops, and by the kernel if the holding process dies. Not
/// re-entrant: acquiring twice from the same thread deadlocks.
///
/// Store mutations take `&StoreLock` as proof the critical section is held.
#[derive(Debug)]
pub struct StoreLock {
    lock_file: File,
    path: PathBuf,
}

impl StoreLock {
    /// Block until the lock for `layout` is held.
    pub fn acquire(layout: &StoreLayout) -> Result<Self, StoreError> {
        let path = layout.lock_file();
        let file = open_lock_file(&path)?;

        tracing::debug!("waiting for store lock {}", path.display());
        file.lock_exclusive()
            .map_err(|e| StoreError::LockFailed(format!("{}: {e}", path.display())))?;
        tracing::debug!("store lock acquired");

        Ok(Self {
            lock_file: file,
            path,
        })
    }

    /// Take the lock only if nobody holds it. Errors other than contention
    /// are returned.
    pub fn try_acquire(layout: &StoreLayout) -> Result<Option<Self>, StoreError> {
        let path = layout.lock_file();
        let file = open_lock_file(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                lock_file: file,
                path,
            })),
            Err(e) if is_contended(&e) => Ok(None),
            Err(e) => Err(StoreError::LockFailed(format!("{}: {e}", path.display()))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when this guard was taken for `layout`'s store.
    pub fn guards(&self, layout: &StoreLayout) -> bool {
        self.path == layout.lock_file()
    }
}

fn is_contended(e: &std::io::Error) -> bool {
    e.kind() == std::io::ErrorKind::WouldBlock
        || e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}

fn open_lock_file(path: &Path) -> Result<File, StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(false)
        .open(path)?)
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        let _ = self.lock_file.unlock();
        tracing::debug!("store lock released");
    }
}
