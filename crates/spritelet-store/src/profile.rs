use crate::atomic::{read_document, write_document};
use crate::layout::StoreLayout;
use crate::lock::StoreLock;
use crate::StoreError;
use spritelet_schema::{Profile, Timestamp};
use std::path::{Path, PathBuf};

pub struct ProfileStore {
    layout: StoreLayout,
}

impl ProfileStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn get(&self) -> Result<Profile, StoreError> {
        let path = self.layout.profile_file();
        read_document(&path)?.ok_or(StoreError::MissingStore(path))
    }

    pub fn put(&self, lock: &StoreLock, profile: &Profile) -> Result<(), StoreError> {
        debug_assert!(lock.guards(&self.layout));
        write_document(&self.layout.profile_file(), profile)
    }

    /// Absolute location of the profile's base image.
    pub fn base_image_abs(&self, profile: &Profile) -> PathBuf {
        base_image_abs(self.layout.root(), &profile.base_image_path)
    }

    /// Modification time of the base image, or `None` if it does not exist.
    pub fn base_image_mtime(&self, profile: &Profile) -> Result<Option<Timestamp>, StoreError> {
        let path = self.base_image_abs(profile);
        match std::fs::metadata(&path) {
            Ok(meta) => Ok(Some(Timestamp::from_system_time(meta.modified()?))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Relative base image paths are anchored at the store root; absolute ones
/// are taken as stored.
pub(crate) fn base_image_abs(root: &Path, base_image_path: &str) -> PathBuf {
    let p = Path::new(base_image_path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}
