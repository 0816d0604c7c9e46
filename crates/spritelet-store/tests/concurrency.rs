//! Store lock contention tests.
//!
//! Each thread opens its own handle on the lock file, so `flock` treats them
//! exactly like separate processes would be treated.

use spritelet_schema::{Catalog, Timestamp};
use spritelet_store::{CatalogStore, CreatedAt, SignalTracker, StoreLayout, StoreLock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

fn init_catalog(layout: &StoreLayout) {
    layout.initialize().unwrap();
    let lock = StoreLock::acquire(layout).unwrap();
    CatalogStore::new(layout.clone())
        .save(&lock, &Catalog::default())
        .unwrap();
}

#[test]
fn concurrent_upserts_lose_no_entries() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    init_catalog(&layout);

    let threads = 8;
    let per_thread = 10;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let layout = layout.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let catalog = CatalogStore::new(layout.clone());
                barrier.wait();
                for i in 0..per_thread {
                    let lock = StoreLock::acquire(&layout).unwrap();
                    catalog
                        .upsert(
                            &lock,
                            &format!("worker {t} state {i}"),
                            &format!("states/w{t}-{i}.png").into(),
                            "",
                            CreatedAt::Preserve,
                            Timestamp::now(),
                        )
                        .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let catalog = CatalogStore::new(layout).load().unwrap();
    assert_eq!(catalog.len(), threads * per_thread);
}

#[test]
fn racing_writers_on_one_key_leave_one_consistent_entry() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    init_catalog(&layout);

    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let layout = layout.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let catalog = CatalogStore::new(layout.clone());
                let signal = SignalTracker::new(layout.clone());
                barrier.wait();
                for _ in 0..5 {
                    let lock = StoreLock::acquire(&layout).unwrap();
                    let path = format!("states/writer-{t}.png").into();
                    catalog
                        .upsert(
                            &lock,
                            "Shared State",
                            &path,
                            &format!("writer-{t}"),
                            CreatedAt::Preserve,
                            Timestamp::now(),
                        )
                        .unwrap();
                    signal.publish(&lock, &path, Timestamp::now()).unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let catalog = CatalogStore::new(layout.clone()).load().unwrap();
    assert_eq!(catalog.len(), 1);
    let entry = catalog.states.get("shared-state").unwrap();
    let writer = entry.description.clone();
    assert_eq!(
        entry.spritelet_path.as_str(),
        format!("states/{writer}.png"),
        "path and description must come from the same writer"
    );

    let tracker = SignalTracker::new(layout);
    assert_eq!(tracker.read().unwrap().spritelet_path, entry.spritelet_path);
    assert_eq!(tracker.history(None).unwrap().len(), threads * 5);
}

#[test]
fn critical_sections_never_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();

    let inside = Arc::new(AtomicUsize::new(0));
    let overlap = Arc::new(AtomicBool::new(false));
    let barrier = Arc::new(Barrier::new(4));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let layout = layout.clone();
            let inside = Arc::clone(&inside);
            let overlap = Arc::clone(&overlap);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..10 {
                    let _lock = StoreLock::acquire(&layout).unwrap();
                    if inside.fetch_add(1, Ordering::SeqCst) != 0 {
                        overlap.store(true, Ordering::SeqCst);
                    }
                    thread::sleep(Duration::from_millis(1));
                    inside.fetch_sub(1, Ordering::SeqCst);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(!overlap.load(Ordering::SeqCst), "two holders were inside at once");
}

#[test]
fn contender_blocks_until_release() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StoreLayout::new(dir.path());
    layout.initialize().unwrap();

    let released = Arc::new(AtomicBool::new(false));
    let held = StoreLock::acquire(&layout).unwrap();

    let contender = {
        let layout = layout.clone();
        let released = Arc::clone(&released);
        thread::spawn(move || {
            let _lock = StoreLock::acquire(&layout).unwrap();
            released.load(Ordering::SeqCst)
        })
    };

    thread::sleep(Duration::from_millis(100));
    released.store(true, Ordering::SeqCst);
    drop(held);

    assert!(
        contender.join().unwrap(),
        "contender acquired the lock before the holder released it"
    );
}
