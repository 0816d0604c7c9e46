use crate::catalog::CatalogStore;
use crate::layout::StoreLayout;
use crate::paths::resolve_state_path;
use crate::profile::{base_image_abs, ProfileStore};
use crate::signal::SignalTracker;
use crate::StoreError;
use serde::Serialize;
use spritelet_schema::is_normalized;

#[derive(Debug, Default, Serialize)]
pub struct IntegrityReport {
    pub checked: usize,
    pub passed: usize,
    pub failed: Vec<IntegrityFailure>,
}

#[derive(Debug, Serialize)]
pub struct IntegrityFailure {
    pub subject: String,
    pub reason: String,
}

impl IntegrityReport {
    fn pass(&mut self) {
        self.checked += 1;
        self.passed += 1;
    }

    fn fail(&mut self, subject: impl Into<String>, reason: impl Into<String>) {
        self.checked += 1;
        self.failed.push(IntegrityFailure {
            subject: subject.into(),
            reason: reason.into(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Check that the store's documents parse and that every path they
/// reference is in bounds and present on disk.
///
/// Read-only and lock-free; a concurrent writer may make the report stale.
pub fn verify_store(layout: &StoreLayout) -> Result<IntegrityReport, StoreError> {
    let mut report = IntegrityReport::default();
    let root = layout.root();

    match ProfileStore::new(layout.clone()).get() {
        Ok(profile) => {
            report.pass();
            let base = base_image_abs(root, &profile.base_image_path);
            if base.is_file() {
                report.pass();
            } else {
                report.fail(
                    "spritelet.json",
                    format!("base image not found: {}", profile.base_image_path),
                );
            }
        }
        Err(e) => report.fail("spritelet.json", e.to_string()),
    }

    match CatalogStore::new(layout.clone()).load() {
        Ok(catalog) => {
            report.pass();
            for (key, entry) in &catalog.states {
                let subject = format!("catalog[{key}]");
                if !is_normalized(key) || entry.simple_name.as_str() != key {
                    report.fail(
                        &subject,
                        format!("key is not the normalized simple_name '{}'", entry.simple_name),
                    );
                    continue;
                }
                match resolve_state_path(root, &entry.spritelet_path) {
                    Ok(abs) if abs.is_file() => report.pass(),
                    Ok(_) => report.fail(
                        &subject,
                        format!("artifact not found: {}", entry.spritelet_path),
                    ),
                    Err(e) => report.fail(&subject, e.to_string()),
                }
            }
        }
        Err(e) => report.fail("states/catalog.json", e.to_string()),
    }

    match SignalTracker::new(layout.clone()).read() {
        Ok(current) if current.is_empty() => report.pass(),
        Ok(current) => match resolve_state_path(root, &current.spritelet_path) {
            Ok(abs) if abs.is_file() => report.pass(),
            Ok(_) => report.fail(
                "signals/current.json",
                format!("artifact not found: {}", current.spritelet_path),
            ),
            Err(e) => report.fail("signals/current.json", e.to_string()),
        },
        Err(e) => report.fail("signals/current.json", e.to_string()),
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CreatedAt;
    use crate::lock::StoreLock;
    use spritelet_schema::{Catalog, Profile, Timestamp};
    use std::fs;

    fn init_store(layout: &StoreLayout) {
        layout.initialize().unwrap();
        let now = Timestamp::parse("2025-01-01T00:00:00Z").unwrap();
        let lock = StoreLock::acquire(layout).unwrap();
        ProfileStore::new(layout.clone())
            .put(
                &lock,
                &Profile {
                    base_image_path: "assets/base.png".to_owned(),
                    prompt_style: String::new(),
                    created_at: now,
                },
            )
            .unwrap();
        CatalogStore::new(layout.clone())
            .save(&lock, &Catalog::default())
            .unwrap();
        SignalTracker::new(layout.clone()).clear(&lock, now).unwrap();
        fs::create_dir_all(layout.assets_dir()).unwrap();
        fs::write(layout.assets_dir().join("base.png"), b"png").unwrap();
    }

    #[test]
    fn fresh_store_is_clean() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        init_store(&layout);
        let report = verify_store(&layout).unwrap();
        assert!(report.is_clean(), "{:?}", report.failed);
        assert_eq!(report.checked, report.passed);
    }

    #[test]
    fn uninitialized_store_reports_every_document() {
        let dir = tempfile::tempdir().unwrap();
        let report = verify_store(&StoreLayout::new(dir.path())).unwrap();
        assert_eq!(report.failed.len(), 3);
    }

    #[test]
    fn deleted_artifact_is_detected() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        init_store(&layout);

        let artifact = layout.states_dir().join("happy.png");
        fs::write(&artifact, b"png").unwrap();
        let lock = StoreLock::acquire(&layout).unwrap();
        CatalogStore::new(layout.clone())
            .upsert(
                &lock,
                "happy",
                &"states/happy.png".into(),
                "",
                CreatedAt::Preserve,
                Timestamp::now(),
            )
            .unwrap();
        SignalTracker::new(layout.clone())
            .publish(&lock, &"states/happy.png".into(), Timestamp::now())
            .unwrap();
        drop(lock);
        assert!(verify_store(&layout).unwrap().is_clean());

        fs::remove_file(&artifact).unwrap();
        let report = verify_store(&layout).unwrap();
        assert_eq!(report.failed.len(), 2);
        assert!(report.failed.iter().any(|f| f.subject == "catalog[happy]"));
        assert!(report
            .failed
            .iter()
            .any(|f| f.subject == "signals/current.json"));
    }

    #[test]
    fn unnormalized_key_is_flagged() {
        let dir = tempfile::tempdir().unwrap();
        let layout = StoreLayout::new(dir.path());
        init_store(&layout);
        fs::write(
            layout.catalog_file(),
            r#"{"states": {"Happy Cat": {"simple_name": "Happy Cat", "spritelet_path": "states/x.png", "created_at": "", "description": ""}}}"#,
        )
        .unwrap();
        let report = verify_store(&layout).unwrap();
        assert_eq!(report.failed.len(), 1);
        assert!(report.failed[0].reason.contains("normalized"));
    }
}
