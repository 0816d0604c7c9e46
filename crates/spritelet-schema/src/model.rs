use crate::timestamp::Timestamp;
use crate::types::{SimpleName, SpriteletPath};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_PROMPT_STYLE: &str =
    "cute animal mascot, clean lines, expressive face, transparent background";

/// One per store: the identity's base reference image and prompt style.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Profile {
    /// Relative to the store root, or absolute if the operator chose so.
    pub base_image_path: String,
    #[serde(default)]
    pub prompt_style: String,
    pub created_at: Timestamp,
}

/// A named derived image variant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub simple_name: SimpleName,
    pub spritelet_path: SpriteletPath,
    /// Kept as the persisted string: a value that fails to parse must still
    /// round-trip so the reuse policy can treat it as unknown age.
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub description: String,
}

impl CatalogEntry {
    pub fn created_at(&self) -> Option<Timestamp> {
        Timestamp::parse(&self.created_at)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Catalog {
    #[serde(default)]
    pub states: BTreeMap<String, CatalogEntry>,
}

impl Catalog {
    pub fn get(&self, key: &SimpleName) -> Option<&CatalogEntry> {
        self.states.get(key.as_str())
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// The artifact currently considered live.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CurrentSignal {
    pub spritelet_path: SpriteletPath,
    pub updated_at: Timestamp,
}

impl CurrentSignal {
    pub fn empty(now: Timestamp) -> Self {
        Self {
            spritelet_path: SpriteletPath::none(),
            updated_at: now,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spritelet_path.is_empty()
    }
}

/// A record in `signals/events.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    StateInitialized {
        spritelet_path: SpriteletPath,
        updated_at: Timestamp,
    },
    BaseImageInitialized {
        spritelet_path: SpriteletPath,
        updated_at: Timestamp,
    },
    StateCatalogUpserted {
        simple_name: SimpleName,
        spritelet_path: SpriteletPath,
        updated_at: Timestamp,
    },
    CurrentSpriteletUpdated {
        spritelet_path: SpriteletPath,
        updated_at: Timestamp,
    },
    StatePublished {
        simple_name: SimpleName,
        spritelet_path: SpriteletPath,
        reused: bool,
        updated_at: Timestamp,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::StateInitialized { .. } => "state_initialized",
            Event::BaseImageInitialized { .. } => "base_image_initialized",
            Event::StateCatalogUpserted { .. } => "state_catalog_upserted",
            Event::CurrentSpriteletUpdated { .. } => "current_spritelet_updated",
            Event::StatePublished { .. } => "state_published",
        }
    }

    pub fn spritelet_path(&self) -> &SpriteletPath {
        match self {
            Event::StateInitialized { spritelet_path, .. }
            | Event::BaseImageInitialized { spritelet_path, .. }
            | Event::StateCatalogUpserted { spritelet_path, .. }
            | Event::CurrentSpriteletUpdated { spritelet_path, .. }
            | Event::StatePublished { spritelet_path, .. } => spritelet_path,
        }
    }

    pub fn updated_at(&self) -> Timestamp {
        match self {
            Event::StateInitialized { updated_at, .. }
            | Event::BaseImageInitialized { updated_at, .. }
            | Event::StateCatalogUpserted { updated_at, .. }
            | Event::CurrentSpriteletUpdated { updated_at, .. }
            | Event::StatePublished { updated_at, .. } => *updated_at,
        }
    }
}
