//! End-to-end store scenarios driven through the `Engine` with a stub
//! generator and a controllable clock.

use spritelet_core::{CoreError, Engine, InitOptions, PublishOptions};
use spritelet_generate::{GenerateError, GenerationRequest, ImageGenerator};
use spritelet_schema::{CatalogEntry, CurrentSignal, Event, Timestamp};
use spritelet_store::{ErrorKind, StoreLayout};
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, UNIX_EPOCH};

/// Records prompts and returns a fixed image, or fails every call.
struct StubGenerator {
    image: Vec<u8>,
    fail: bool,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    fn returning(image: &[u8]) -> Self {
        Self {
            image: image.to_vec(),
            fail: false,
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(b"")
        }
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

impl ImageGenerator for StubGenerator {
    fn name(&self) -> &str {
        "stub"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, GenerateError> {
        assert!(
            request.reference.is_some(),
            "state generation must send the base image"
        );
        self.prompts.lock().unwrap().push(request.prompt.clone());
        if self.fail {
            return Err(GenerateError::Status {
                code: 503,
                body: "unavailable".to_owned(),
            });
        }
        Ok(self.image.clone())
    }
}

/// A clock the test sets explicitly.
#[derive(Clone)]
struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    fn at(unix: i64) -> Self {
        Self(Arc::new(AtomicI64::new(unix)))
    }

    fn set(&self, unix: i64) {
        self.0.store(unix, Ordering::SeqCst);
    }

    fn now(&self) -> Timestamp {
        Timestamp::from_unix(self.0.load(Ordering::SeqCst)).unwrap()
    }
}

fn engine_with(root: &Path, clock: &ManualClock) -> Engine {
    let clock = clock.clone();
    Engine::new(root).with_clock(move || clock.now())
}

fn set_mtime(path: &Path, unix: i64) {
    let file = fs::File::options().write(true).open(path).unwrap();
    let secs = u64::try_from(unix).unwrap();
    file.set_modified(UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap();
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> T {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

fn events(root: &Path) -> Vec<Event> {
    fs::read_to_string(root.join("signals/events.jsonl"))
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

const REGISTERED_AT: i64 = 1_600_000_000;
const BASE_WRITTEN_AT: i64 = 1_650_000_000;
const FIRST_PUBLISH_AT: i64 = 1_700_000_000;
const BASE_TOUCHED_AT: i64 = 1_710_000_000;
const SECOND_PUBLISH_AT: i64 = 1_720_000_000;

/// init, base image, register "focused coding" at `states/focused-coding.png`.
fn registered_store(root: &Path, clock: &ManualClock) -> Engine {
    let engine = engine_with(root, clock);
    engine.init(&InitOptions::default()).unwrap();

    let base = root.join("assets/base.png");
    fs::write(&base, b"base identity").unwrap();
    set_mtime(&base, BASE_WRITTEN_AT);

    fs::write(root.join("states/focused-coding.png"), b"hand drawn").unwrap();
    engine
        .register("focused coding", "states/focused-coding.png", "typing")
        .unwrap();
    engine
}

#[test]
fn register_lookup_and_first_publish() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let clock = ManualClock::at(REGISTERED_AT);
    let engine = registered_store(root, &clock);

    let report = engine.find("  Focused   Coding ").unwrap();
    assert!(report.found);
    assert_eq!(report.simple_name.as_str(), "focused-coding");
    let details = report.details.unwrap();
    assert_eq!(details.state.spritelet_path.as_str(), "states/focused-coding.png");
    assert_eq!(details.state.description, "typing");
    // The base image was written after the state was registered.
    assert!(details.state_is_stale);

    let before = events(root).len();
    clock.set(FIRST_PUBLISH_AT);
    let generator = StubGenerator::returning(b"generated v1");
    let outcome = engine
        .publish(
            &generator,
            "Focused Coding",
            &PublishOptions {
                description: "typing".to_owned(),
                ..PublishOptions::default()
            },
        )
        .unwrap();

    assert!(!outcome.reused);
    assert_eq!(generator.calls(), 1);
    assert_eq!(outcome.spritelet_path.as_str(), "states/focused-coding.png");
    assert_eq!(
        fs::read(root.join("states/focused-coding.png")).unwrap(),
        b"generated v1"
    );

    let current: CurrentSignal = read_json(&root.join("signals/current.json"));
    assert_eq!(current.spritelet_path.as_str(), "states/focused-coding.png");
    assert_eq!(current.updated_at, Timestamp::from_unix(FIRST_PUBLISH_AT).unwrap());

    let log = events(root);
    assert_eq!(log.len(), before + 1);
    match log.last().unwrap() {
        Event::StatePublished {
            simple_name,
            spritelet_path,
            reused,
            updated_at,
        } => {
            assert_eq!(simple_name.as_str(), "focused-coding");
            assert_eq!(spritelet_path.as_str(), "states/focused-coding.png");
            assert!(!reused);
            assert_eq!(*updated_at, Timestamp::from_unix(FIRST_PUBLISH_AT).unwrap());
        }
        other => panic!("expected state_published, got {other:?}"),
    }
}

#[test]
fn touching_base_image_forces_regeneration() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let clock = ManualClock::at(REGISTERED_AT);
    let engine = registered_store(root, &clock);
    let options = PublishOptions {
        description: "typing".to_owned(),
        ..PublishOptions::default()
    };

    clock.set(FIRST_PUBLISH_AT);
    let generator = StubGenerator::returning(b"generated");
    engine.publish(&generator, "focused coding", &options).unwrap();
    let first: CatalogEntry = engine.find("focused coding").unwrap().details.unwrap().state;

    // Unchanged base: republishing reuses.
    clock.set(FIRST_PUBLISH_AT + 60);
    let again = engine.publish(&generator, "focused coding", &options).unwrap();
    assert!(again.reused);
    assert_eq!(generator.calls(), 1);
    assert_eq!(again.created_at, first.created_at);

    set_mtime(&root.join("assets/base.png"), BASE_TOUCHED_AT);
    let report = engine.find("focused coding").unwrap().details.unwrap();
    assert!(report.base_image_is_newer);
    assert!(!report.would_reuse_on_publish);

    clock.set(SECOND_PUBLISH_AT);
    let outcome = engine.publish(&generator, "focused coding", &options).unwrap();
    assert!(!outcome.reused);
    assert_eq!(generator.calls(), 2);

    let second = engine.find("focused coding").unwrap().details.unwrap().state;
    assert_eq!(second.simple_name, first.simple_name);
    assert!(second.spritelet_path.starts_with("states/"));
    assert_eq!(second.spritelet_path, first.spritelet_path);
    assert!(second.created_at().unwrap() > first.created_at().unwrap());
    assert_eq!(
        second.created_at().unwrap(),
        Timestamp::from_unix(SECOND_PUBLISH_AT).unwrap()
    );
}

#[test]
fn equal_second_base_and_created_at_reuses() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let clock = ManualClock::at(BASE_WRITTEN_AT);
    let engine = registered_store(root, &clock);

    let generator = StubGenerator::returning(b"unused");
    let outcome = engine
        .publish(&generator, "focused coding", &PublishOptions::default())
        .unwrap();
    assert!(outcome.reused);
    assert_eq!(generator.calls(), 0);
    assert_eq!(
        fs::read(root.join("states/focused-coding.png")).unwrap(),
        b"hand drawn"
    );
}

#[test]
fn generation_failure_leaves_store_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let clock = ManualClock::at(REGISTERED_AT);
    let engine = registered_store(root, &clock);

    let catalog_before = fs::read(root.join("states/catalog.json")).unwrap();
    let current_before = fs::read(root.join("signals/current.json")).unwrap();
    let events_before = events(root).len();

    clock.set(FIRST_PUBLISH_AT);
    let generator = StubGenerator::failing();
    let err = engine
        .publish(&generator, "focused coding", &PublishOptions::default())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::GenerationFailure);
    assert!(matches!(err, CoreError::Generate(GenerateError::Status { code: 503, .. })));
    assert_eq!(generator.calls(), 1, "failures are not retried");

    assert_eq!(fs::read(root.join("states/catalog.json")).unwrap(), catalog_before);
    assert_eq!(fs::read(root.join("signals/current.json")).unwrap(), current_before);
    assert_eq!(events(root).len(), events_before);
    assert_eq!(
        fs::read(root.join("states/focused-coding.png")).unwrap(),
        b"hand drawn"
    );
}

#[test]
fn every_mutation_leaves_a_verified_store() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    let clock = ManualClock::at(REGISTERED_AT);
    let engine = registered_store(root, &clock);
    clock.set(FIRST_PUBLISH_AT);

    engine
        .publish(
            &StubGenerator::returning(b"img"),
            "sleepy",
            &PublishOptions::default(),
        )
        .unwrap();
    engine.set_signal("states/focused-coding.png").unwrap();

    let report = engine.verify().unwrap();
    assert!(report.is_clean(), "{:?}", report.failed);

    let kinds: Vec<_> = engine.history(None).unwrap().iter().map(Event::kind).collect();
    assert_eq!(
        kinds,
        [
            "state_initialized",
            "state_catalog_upserted",
            "state_published",
            "current_spritelet_updated"
        ]
    );
    assert!(StoreLayout::new(root).is_initialized());
}
