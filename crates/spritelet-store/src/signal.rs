use crate::atomic::{append_event, read_document, read_records, write_bytes, write_document};
use crate::layout::StoreLayout;
use crate::lock::StoreLock;
use crate::paths::resolve_state_path;
use crate::StoreError;
use spritelet_schema::{CurrentSignal, Event, SimpleName, SpriteletPath, Timestamp};
use tracing::{debug, info};

/// The "currently published" pointer plus the append-only event journal.
pub struct SignalTracker {
    layout: StoreLayout,
}

impl SignalTracker {
    pub fn new(layout: StoreLayout) -> Self {
        Self { layout }
    }

    pub fn read(&self) -> Result<CurrentSignal, StoreError> {
        let path = self.layout.current_file();
        read_document(&path)?.ok_or(StoreError::MissingStore(path))
    }

    pub fn exists(&self) -> bool {
        self.layout.current_file().is_file()
    }

    /// Point the current signal at `spritelet_path` and log
    /// `current_spritelet_updated`.
    pub fn publish(
        &self,
        lock: &StoreLock,
        spritelet_path: &SpriteletPath,
        now: Timestamp,
    ) -> Result<CurrentSignal, StoreError> {
        let event = Event::CurrentSpriteletUpdated {
            spritelet_path: spritelet_path.clone(),
            updated_at: now,
        };
        self.replace(lock, spritelet_path, now, &event)
    }

    /// Point the current signal at a catalog state's artifact and log
    /// `state_published`.
    pub fn publish_state(
        &self,
        lock: &StoreLock,
        simple_name: &SimpleName,
        spritelet_path: &SpriteletPath,
        reused: bool,
        now: Timestamp,
    ) -> Result<CurrentSignal, StoreError> {
        let event = Event::StatePublished {
            simple_name: simple_name.clone(),
            spritelet_path: spritelet_path.clone(),
            reused,
            updated_at: now,
        };
        self.replace(lock, spritelet_path, now, &event)
    }

    /// Write an empty signal (nothing published).
    pub fn clear(&self, lock: &StoreLock, now: Timestamp) -> Result<CurrentSignal, StoreError> {
        debug_assert!(lock.guards(&self.layout));
        let current = CurrentSignal::empty(now);
        write_document(&self.layout.current_file(), &current)?;
        Ok(current)
    }

    /// Append one event to the journal.
    pub fn record(&self, lock: &StoreLock, event: &Event) -> Result<(), StoreError> {
        debug_assert!(lock.guards(&self.layout));
        append_event(&self.layout.events_file(), event)?;
        debug!("event {} -> {}", event.kind(), event.spritelet_path());
        Ok(())
    }

    /// Discard the journal and start a new one with `first`. Only a store
    /// reset does this.
    pub fn restart_log(&self, lock: &StoreLock, first: &Event) -> Result<(), StoreError> {
        debug_assert!(lock.guards(&self.layout));
        let mut line = serde_json::to_string(first)?;
        line.push('\n');
        write_bytes(&self.layout.events_file(), line.as_bytes())
    }

    /// Events in log order; with `limit`, only the most recent `limit`.
    pub fn history(&self, limit: Option<usize>) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = read_records(&self.layout.events_file())?;
        if let Some(n) = limit {
            let skip = events.len().saturating_sub(n);
            events.drain(..skip);
        }
        Ok(events)
    }

    fn replace(
        &self,
        lock: &StoreLock,
        spritelet_path: &SpriteletPath,
        now: Timestamp,
        event: &Event,
    ) -> Result<CurrentSignal, StoreError> {
        debug_assert!(lock.guards(&self.layout));
        if !spritelet_path.is_empty() {
            resolve_state_path(self.layout.root(), spritelet_path)?;
        }

        let current = CurrentSignal {
            spritelet_path: spritelet_path.clone(),
            updated_at: now,
        };
        write_document(&self.layout.current_file(), &current)?;
        self.record(lock, event)?;
        info!("current spritelet -> {}", current.spritelet_path);
        Ok(current)
    }
}
