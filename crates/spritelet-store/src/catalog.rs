use crate::atomic::{read_document, write_document};
use crate::layout::StoreLayout;
use crate::lock::StoreLock;
use crate::paths::resolve_state_path;
use crate::StoreError;
use spritelet_schema::{Catalog, CatalogEntry, SimpleName, SpriteletPath, Timestamp};
use tracing::debug;

/// How an upsert treats the `created_at` of an entry that already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAt {
    /// Keep the original creation time (content registered or reused).
    Preserve,
    /// Stamp `now` (content regenerated).
    Reset,
}

/// Catalog of named states, persisted at `states/catalog.json`.
///
/// Every read goes to disk; nothing is cached between calls.
pub struct CatalogStore {
    layout: StoreLayout,
}

impl CatalogStore {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn load(&self) -> Result<Catalog, StoreError> {
        let path = self.layout.catalog_file();
        read_document(&path)?.ok_or(StoreError::MissingStore(path))
    }

    pub fn exists(&self) -> bool {
        self.layout.catalog_file().is_file()
    }

    /// Find the entry for `name` after normalizing it.
    pub fn lookup(&self, name: &str) -> Result<Option<CatalogEntry>, StoreError> {
        let key = SimpleName::new(name);
        Ok(self.load()?.get(&key).cloned())
    }

    /// Replace the whole catalog document.
    pub fn save(&self, lock: &StoreLock, catalog: &Catalog) -> Result<(), StoreError> {
        debug_assert!(lock.guards(&self.layout));
        write_document(&self.layout.catalog_file(), catalog)
    }

    /// Insert or overwrite the entry for `name`.
    ///
    /// Path and description are replaced unconditionally. `created_at` is
    /// `now` for a new entry; for an existing one it follows `created`.
    /// The path must resolve inside `states/`; its existence is the
    /// caller's concern.
    pub fn upsert(
        &self,
        lock: &StoreLock,
        name: &str,
        spritelet_path: &SpriteletPath,
        description: &str,
        created: CreatedAt,
        now: Timestamp,
    ) -> Result<CatalogEntry, StoreError> {
        resolve_state_path(self.layout.root(), spritelet_path)?;

        let key = SimpleName::new(name);
        let mut catalog = self.load()?;
        let created_at = match (catalog.get(&key), created) {
            (Some(existing), CreatedAt::Preserve) if !existing.created_at.is_empty() => {
                existing.created_at.clone()
            }
            _ => now.to_string(),
        };

        let entry = CatalogEntry {
            simple_name: key.clone(),
            spritelet_path: spritelet_path.clone(),
            created_at,
            description: description.to_owned(),
        };
        catalog.states.insert(key.into_inner(), entry.clone());
        self.save(lock, &catalog)?;

        debug!(
            "catalog upsert {} -> {} (created_at {})",
            entry.simple_name, entry.spritelet_path, entry.created_at
        );
        Ok(entry)
    }
}
