use crate::StoreError;
use std::fs;
use std::path::{Path, PathBuf};

pub(crate) const STATES_DIR: &str = "states";

/// Directory layout of one Spritelet identity store.
///
/// ```text
/// <root>/spritelet.json          profile
/// <root>/assets/                 base images
/// <root>/states/catalog.json     catalog
/// <root>/states/*.png            generated artifacts
/// <root>/signals/current.json    current signal
/// <root>/signals/events.jsonl    event log
/// <root>/.locks/store.lock       store lock
/// ```
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

/// What [`StoreLayout::clear_dir`] removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClearReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn profile_file(&self) -> PathBuf {
        self.root.join("spritelet.json")
    }

    #[inline]
    pub fn assets_dir(&self) -> PathBuf {
        self.root.join("assets")
    }

    #[inline]
    pub fn states_dir(&self) -> PathBuf {
        self.root.join(STATES_DIR)
    }

    #[inline]
    pub fn catalog_file(&self) -> PathBuf {
        self.states_dir().join("catalog.json")
    }

    #[inline]
    pub fn signals_dir(&self) -> PathBuf {
        self.root.join("signals")
    }

    #[inline]
    pub fn current_file(&self) -> PathBuf {
        self.signals_dir().join("current.json")
    }

    #[inline]
    pub fn events_file(&self) -> PathBuf {
        self.signals_dir().join("events.jsonl")
    }

    #[inline]
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(".locks").join("store.lock")
    }

    /// Create the fixed subdirectories. Idempotent.
    pub fn initialize(&self) -> Result<(), StoreError> {
        fs::create_dir_all(self.states_dir())?;
        fs::create_dir_all(self.signals_dir())?;
        if let Some(locks) = self.lock_file().parent() {
            fs::create_dir_all(locks)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.profile_file().is_file()
    }

    /// Remove every file beneath `dir` and every directory that becomes
    /// empty, deepest first. `dir` itself is kept (and created if absent).
    pub fn clear_dir(dir: &Path) -> Result<ClearReport, StoreError> {
        fs::create_dir_all(dir)?;
        let mut entries = Vec::new();
        collect_entries(dir, &mut entries)?;
        entries.sort_by_key(|p| std::cmp::Reverse(p.components().count()));

        let mut report = ClearReport::default();
        for path in entries {
            let meta = fs::symlink_metadata(&path)?;
            if meta.is_dir() {
                if fs::remove_dir(&path).is_ok() {
                    report.dirs_removed += 1;
                } else {
                    tracing::debug!("left non-empty directory {}", path.display());
                }
            } else {
                fs::remove_file(&path)?;
                report.files_removed += 1;
            }
        }
        Ok(report)
    }
}

fn collect_entries(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), StoreError> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_entries(&path, out)?;
        }
        out.push(path);
    }
    Ok(())
}
