use crate::policy::{assess, decide, Decision};
use crate::CoreError;
use serde::Serialize;
use spritelet_generate::request::Payload;
use spritelet_generate::{base_prompt, state_prompt, GenerationRequest, ImageConfig, ImageGenerator};
use spritelet_schema::{
    Catalog, CatalogEntry, CurrentSignal, Event, Profile, SimpleName, SpriteletPath, Timestamp,
    DEFAULT_PROMPT_STYLE,
};
use spritelet_store::{
    resolve_state_path, resolve_store_path, verify_store, write_bytes, CatalogStore, CreatedAt,
    IntegrityReport, ProfileStore, SignalTracker, StoreError, StoreLayout, StoreLock,
};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_BASE_IMAGE: &str = "assets/base.png";

const PUBLISH_ATTEMPTS: usize = 3;

type Clock = Box<dyn Fn() -> Timestamp + Send + Sync>;

/// Operations over one store root.
///
/// Every mutation takes the store lock for its whole read-modify-write span.
/// Generation calls happen before the lock is taken, so a slow API never
/// blocks other commands on the same store.
pub struct Engine {
    layout: StoreLayout,
    profiles: ProfileStore,
    catalog: CatalogStore,
    signal: SignalTracker,
    clock: Clock,
}

#[derive(Debug, Clone)]
pub struct InitOptions {
    pub base_image_path: String,
    pub prompt_style: String,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            base_image_path: DEFAULT_BASE_IMAGE.to_owned(),
            prompt_style: DEFAULT_PROMPT_STYLE.to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SubtreeCounts {
    pub assets: usize,
    pub states: usize,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReinitReport {
    pub reinitialized: bool,
    pub root: PathBuf,
    pub files_removed: SubtreeCounts,
    pub dirs_removed: SubtreeCounts,
    pub reset_files: Vec<&'static str>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize)]
pub struct BaseImageOutcome {
    pub base_image_path: String,
    pub bytes: usize,
    pub updated_at: Timestamp,
}

/// Result of a catalog lookup. `details` is absent when nothing matched.
#[derive(Debug, Clone, Serialize)]
pub struct FindReport {
    pub found: bool,
    pub simple_name: SimpleName,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub details: Option<StateDetails>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StateDetails {
    pub base_image_path: String,
    pub base_image_mtime: Option<Timestamp>,
    pub state_created_at: String,
    pub base_image_is_newer: bool,
    pub state_is_stale: bool,
    pub artifact_present: bool,
    pub would_reuse_on_publish: bool,
    pub state: CatalogEntry,
}

#[derive(Debug, Clone, Default)]
pub struct PublishOptions {
    pub description: String,
    /// Regenerate even when the existing artifact is fresh or missing.
    pub force: bool,
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PublishOutcome {
    pub published: bool,
    pub simple_name: SimpleName,
    pub spritelet_path: SpriteletPath,
    pub reused: bool,
    pub created_at: String,
    pub updated_at: Timestamp,
}

impl Engine {
    pub fn new(store_root: impl Into<PathBuf>) -> Self {
        let layout = StoreLayout::new(store_root);
        Self {
            profiles: ProfileStore::new(layout.clone()),
            catalog: CatalogStore::new(layout.clone()),
            signal: SignalTracker::new(layout.clone()),
            layout,
            clock: Box::new(Timestamp::now),
        }
    }

    /// Replace the wall clock used to stamp documents and events.
    #[must_use]
    pub fn with_clock(mut self, clock: impl Fn() -> Timestamp + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn store_layout(&self) -> &StoreLayout {
        &self.layout
    }

    fn now(&self) -> Timestamp {
        (self.clock)()
    }

    fn lock(&self) -> Result<StoreLock, CoreError> {
        Ok(StoreLock::acquire(&self.layout)?)
    }

    /// Create the store skeleton and write fresh profile, catalog, and
    /// signal documents. Existing documents are overwritten; the event log
    /// is appended to.
    pub fn init(&self, options: &InitOptions) -> Result<Profile, CoreError> {
        info!("initializing store at {}", self.layout.root().display());
        self.layout.initialize()?;
        let base_abs = self.base_image_target(&options.base_image_path)?;
        create_parent(base_abs.as_deref())?;

        let lock = self.lock()?;
        let now = self.now();
        let profile = self.reset_documents(&lock, options, now)?;
        self.signal.record(
            &lock,
            &Event::StateInitialized {
                spritelet_path: SpriteletPath::none(),
                updated_at: now,
            },
        )?;
        Ok(profile)
    }

    /// Wipe `assets/` and `states/`, rewrite every document, and start a
    /// new event log.
    pub fn reinit(&self, options: &InitOptions) -> Result<ReinitReport, CoreError> {
        info!("reinitializing store at {}", self.layout.root().display());
        let base_abs = self.base_image_target(&options.base_image_path)?;
        self.layout.initialize()?;

        let lock = self.lock()?;
        let now = self.now();
        let assets = StoreLayout::clear_dir(&self.layout.assets_dir())?;
        let states = StoreLayout::clear_dir(&self.layout.states_dir())?;
        create_parent(base_abs.as_deref())?;

        self.reset_documents(&lock, options, now)?;
        self.signal.restart_log(
            &lock,
            &Event::StateInitialized {
                spritelet_path: SpriteletPath::none(),
                updated_at: now,
            },
        )?;

        Ok(ReinitReport {
            reinitialized: true,
            root: self.layout.root().to_path_buf(),
            files_removed: SubtreeCounts {
                assets: assets.files_removed,
                states: states.files_removed,
                total: assets.files_removed + states.files_removed,
            },
            dirs_removed: SubtreeCounts {
                assets: assets.dirs_removed,
                states: states.dirs_removed,
                total: assets.dirs_removed + states.dirs_removed,
            },
            reset_files: vec![
                "spritelet.json",
                "signals/current.json",
                "signals/events.jsonl",
                "states/catalog.json",
            ],
            updated_at: now,
        })
    }

    fn reset_documents(
        &self,
        lock: &StoreLock,
        options: &InitOptions,
        now: Timestamp,
    ) -> Result<Profile, CoreError> {
        let profile = Profile {
            base_image_path: options.base_image_path.clone(),
            prompt_style: options.prompt_style.clone(),
            created_at: now,
        };
        self.profiles.put(lock, &profile)?;
        self.signal.clear(lock, now)?;
        self.catalog.save(lock, &Catalog::default())?;
        Ok(profile)
    }

    /// Where a relative base image lives inside the root. Absolute paths are
    /// taken as given and left alone.
    fn base_image_target(&self, base_image_path: &str) -> Result<Option<PathBuf>, CoreError> {
        if Path::new(base_image_path).is_absolute() {
            return Ok(None);
        }
        Ok(Some(resolve_store_path(self.layout.root(), base_image_path)?))
    }

    /// Generate a base avatar from a text brief and make it the profile's
    /// base image.
    pub fn generate_base(
        &self,
        generator: &dyn ImageGenerator,
        identity_brief: &str,
        output: Option<&str>,
        image_config: Option<ImageConfig>,
    ) -> Result<BaseImageOutcome, CoreError> {
        let profile = self.profiles.get()?;
        let out_rel = output.unwrap_or(DEFAULT_BASE_IMAGE);
        let out_abs = resolve_store_path(self.layout.root(), out_rel)?;

        let mut request = GenerationRequest::text(base_prompt(identity_brief, &profile.prompt_style));
        request.image_config = image_config;
        info!("generating base image with {} generator", generator.name());
        let bytes = generator.generate(&request)?;

        let lock = self.lock()?;
        let now = self.now();
        if let Some(parent) = out_abs.parent() {
            fs::create_dir_all(parent)?;
        }
        write_bytes(&out_abs, &bytes)?;

        let mut profile = self.profiles.get()?;
        profile.base_image_path = out_rel.to_owned();
        self.profiles.put(&lock, &profile)?;
        self.signal.record(
            &lock,
            &Event::BaseImageInitialized {
                spritelet_path: SpriteletPath::new(out_rel),
                updated_at: now,
            },
        )?;
        info!("base image written to {out_rel} ({} bytes)", bytes.len());

        Ok(BaseImageOutcome {
            base_image_path: out_rel.to_owned(),
            bytes: bytes.len(),
            updated_at: now,
        })
    }

    /// Point a catalog name at an existing artifact under `states/`.
    pub fn register(
        &self,
        simple_name: &str,
        spritelet_path: &str,
        description: &str,
    ) -> Result<CatalogEntry, CoreError> {
        let key = non_empty_name(simple_name)?;
        if !self.catalog.exists() {
            return Err(StoreError::MissingStore(self.layout.catalog_file()).into());
        }
        let abs = resolve_state_path(self.layout.root(), spritelet_path)?;
        if !abs.is_file() {
            return Err(StoreError::MissingArtifact(spritelet_path.to_owned()).into());
        }

        let lock = self.lock()?;
        let now = self.now();
        let entry = self.catalog.upsert(
            &lock,
            key.as_str(),
            &SpriteletPath::new(spritelet_path),
            description,
            CreatedAt::Preserve,
            now,
        )?;
        self.signal.record(
            &lock,
            &Event::StateCatalogUpserted {
                simple_name: entry.simple_name.clone(),
                spritelet_path: entry.spritelet_path.clone(),
                updated_at: now,
            },
        )?;
        info!("registered {} -> {}", entry.simple_name, entry.spritelet_path);
        Ok(entry)
    }

    /// Look a state up and report whether publishing it would reuse the
    /// existing artifact. Lock-free.
    pub fn find(&self, simple_name: &str) -> Result<FindReport, CoreError> {
        let key = SimpleName::new(simple_name);
        let Some(entry) = self.catalog.lookup(key.as_str())? else {
            return Ok(FindReport {
                found: false,
                simple_name: key,
                details: None,
            });
        };

        let profile = match self.profiles.get() {
            Ok(p) => Some(p),
            Err(StoreError::MissingStore(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let base_image_mtime = match &profile {
            Some(p) => self.profiles.base_image_mtime(p)?,
            None => None,
        };
        let staleness = assess(base_image_mtime, entry.created_at());
        let artifact_present = resolve_state_path(self.layout.root(), &entry.spritelet_path)
            .map(|abs| abs.is_file())
            .unwrap_or(false);

        Ok(FindReport {
            found: true,
            simple_name: key,
            details: Some(StateDetails {
                base_image_path: profile.map(|p| p.base_image_path).unwrap_or_default(),
                base_image_mtime,
                state_created_at: entry.created_at.clone(),
                base_image_is_newer: staleness.base_image_is_newer,
                state_is_stale: staleness.state_is_stale,
                artifact_present,
                would_reuse_on_publish: !staleness.state_is_stale && artifact_present,
                state: entry,
            }),
        })
    }

    /// Make `spritelet_path` the current signal without touching the catalog.
    pub fn set_signal(&self, spritelet_path: &str) -> Result<CurrentSignal, CoreError> {
        if !self.signal.exists() {
            return Err(StoreError::MissingStore(self.layout.current_file()).into());
        }
        let abs = resolve_state_path(self.layout.root(), spritelet_path)?;
        if !abs.is_file() {
            return Err(StoreError::MissingArtifact(spritelet_path.to_owned()).into());
        }

        let lock = self.lock()?;
        let current = self
            .signal
            .publish(&lock, &SpriteletPath::new(spritelet_path), self.now())?;
        info!("current spritelet -> {}", current.spritelet_path);
        Ok(current)
    }

    /// Publish a named state, reusing its artifact when the base image has
    /// not changed since it was made and generating a new one otherwise.
    ///
    /// The decision is made without the lock and checked again under it. If
    /// the base image or the entry moved in between, the attempt is dropped
    /// and the publish starts over.
    pub fn publish(
        &self,
        generator: &dyn ImageGenerator,
        simple_name: &str,
        options: &PublishOptions,
    ) -> Result<PublishOutcome, CoreError> {
        let key = non_empty_name(simple_name)?;
        for attempt in 1..=PUBLISH_ATTEMPTS {
            if let Some(outcome) = self.try_publish(generator, &key, simple_name, options)? {
                return Ok(outcome);
            }
            warn!("base image or catalog changed during publish of {key} (attempt {attempt})");
        }
        Err(CoreError::Contended(key.to_string()))
    }

    /// One publish attempt. `None` when something read before the lock no
    /// longer holds.
    fn try_publish(
        &self,
        generator: &dyn ImageGenerator,
        key: &SimpleName,
        simple_name: &str,
        options: &PublishOptions,
    ) -> Result<Option<PublishOutcome>, CoreError> {
        let root = self.layout.root();

        let (profile, base_mtime) = self.base_snapshot()?;
        let decision = match self.catalog.lookup(key.as_str())? {
            Some(entry) if !options.force => {
                require_artifact(root, &entry.spritelet_path)?;
                decide(base_mtime, entry.created_at(), false)
            }
            _ => Decision::Regenerate,
        };
        debug!("publish {key}: {decision:?}");

        let image = match decision {
            Decision::Reuse => None,
            Decision::Regenerate => {
                let reference = fs::read(self.profiles.base_image_abs(&profile))?;
                let mut request = GenerationRequest::text(state_prompt(
                    &profile.prompt_style,
                    simple_name,
                    &options.description,
                ))
                .with_reference_png(reference);
                request.image_config = options.image_config.clone();
                info!("generating state {key} with {} generator", generator.name());
                Some(generator.generate(&request)?)
            }
        };

        let lock = self.lock()?;
        let now = self.now();
        let (locked_profile, locked_mtime) = self.base_snapshot()?;
        if locked_profile.base_image_path != profile.base_image_path
            || locked_profile.prompt_style != profile.prompt_style
            || locked_mtime != base_mtime
        {
            return Ok(None);
        }
        let existing = self.catalog.load()?.get(key).cloned();

        let (spritelet_path, reused) = match (image, existing) {
            (None, Some(entry)) => {
                if decide(locked_mtime, entry.created_at(), false) != Decision::Reuse {
                    return Ok(None);
                }
                require_artifact(root, &entry.spritelet_path)?;
                (entry.spritelet_path, true)
            }
            (None, None) => {
                return Err(StoreError::MissingArtifact(format!(
                    "catalog entry '{key}' was removed during publish"
                ))
                .into());
            }
            (Some(bytes), existing) => {
                let rel = match existing {
                    Some(entry) => entry.spritelet_path,
                    None => fresh_state_path(root, key, now),
                };
                let abs = resolve_state_path(root, &rel)?;
                if let Some(parent) = abs.parent() {
                    fs::create_dir_all(parent)?;
                }
                write_bytes(&abs, &bytes)?;
                (rel, false)
            }
        };

        let created = if reused {
            CreatedAt::Preserve
        } else {
            CreatedAt::Reset
        };
        let entry = self.catalog.upsert(
            &lock,
            key.as_str(),
            &spritelet_path,
            &options.description,
            created,
            now,
        )?;
        self.signal
            .publish_state(&lock, &entry.simple_name, &entry.spritelet_path, reused, now)?;
        info!(
            "published {} -> {} ({})",
            entry.simple_name,
            entry.spritelet_path,
            if reused { "reused" } else { "generated" }
        );

        Ok(Some(PublishOutcome {
            published: true,
            simple_name: entry.simple_name,
            spritelet_path: entry.spritelet_path,
            reused,
            created_at: entry.created_at,
            updated_at: now,
        }))
    }

    fn base_snapshot(&self) -> Result<(Profile, Timestamp), CoreError> {
        let profile = self.profiles.get()?;
        let mtime = self
            .profiles
            .base_image_mtime(&profile)?
            .ok_or_else(|| StoreError::MissingArtifact(profile.base_image_path.clone()))?;
        Ok((profile, mtime))
    }

    /// The generation payload `publish` would send for a state. Reads only.
    ///
    /// `base_image` overrides the profile's base image path (resolved the
    /// same way: relative to the store root unless absolute).
    pub fn build_request(
        &self,
        simple_name: &str,
        description: &str,
        base_image: Option<&str>,
        model: &str,
    ) -> Result<Payload, CoreError> {
        let mut profile = self.profiles.get()?;
        if let Some(path) = base_image {
            path.clone_into(&mut profile.base_image_path);
        }
        let base_abs = self.profiles.base_image_abs(&profile);
        if !base_abs.is_file() {
            return Err(StoreError::MissingArtifact(profile.base_image_path).into());
        }
        let reference = fs::read(&base_abs)?;
        let request = GenerationRequest::text(state_prompt(
            &profile.prompt_style,
            simple_name,
            description,
        ))
        .with_reference_png(reference);
        Ok(request.payload(model))
    }

    /// Recorded events, oldest first; with `limit`, only the most recent.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<Event>, CoreError> {
        Ok(self.signal.history(limit)?)
    }

    pub fn verify(&self) -> Result<IntegrityReport, CoreError> {
        Ok(verify_store(&self.layout)?)
    }

    pub fn current(&self) -> Result<CurrentSignal, CoreError> {
        Ok(self.signal.read()?)
    }
}

fn non_empty_name(raw: &str) -> Result<SimpleName, CoreError> {
    let key = SimpleName::new(raw);
    if key.is_empty() {
        return Err(CoreError::EmptyName(raw.to_owned()));
    }
    Ok(key)
}

fn require_artifact(root: &Path, spritelet_path: &SpriteletPath) -> Result<(), CoreError> {
    let abs = resolve_state_path(root, spritelet_path)?;
    if !abs.is_file() {
        return Err(StoreError::MissingArtifact(spritelet_path.to_string()).into());
    }
    Ok(())
}

fn create_parent(path: Option<&Path>) -> Result<(), CoreError> {
    if let Some(parent) = path.and_then(Path::parent) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// `states/<name>.png`, or the first free timestamped sibling when that file
/// is taken.
fn fresh_state_path(root: &Path, key: &SimpleName, now: Timestamp) -> SpriteletPath {
    let taken = |rel: &str| fs::symlink_metadata(root.join(rel)).is_ok();
    let plain = format!("states/{key}.png");
    if !taken(&plain) {
        return SpriteletPath::new(plain);
    }
    let stamp = now.compact();
    let stamped = format!("states/{key}-{stamp}.png");
    if !taken(&stamped) {
        return SpriteletPath::new(stamped);
    }
    let mut n: u32 = 2;
    loop {
        let candidate = format!("states/{key}-{stamp}-{n}.png");
        if !taken(&candidate) {
            return SpriteletPath::new(candidate);
        }
        n += 1;
    }
}
