//! Persisted data model for a Spritelet identity store.
//!
//! This crate defines the documents a store is made of: the `Profile`
//! (base image and prompt style), the `Catalog` of named state variants,
//! the `CurrentSignal` pointer to the published artifact, and the `Event`
//! records appended to the audit log. It also owns the two value rules
//! everything else depends on: simple-name normalization and the
//! second-precision UTC `Timestamp`.

pub mod model;
pub mod normalize;
pub mod timestamp;
pub mod types;

pub use model::{Catalog, CatalogEntry, CurrentSignal, Event, Profile, DEFAULT_PROMPT_STYLE};
pub use normalize::{is_normalized, normalize_simple_name};
pub use timestamp::Timestamp;
pub use types::{SimpleName, SpriteletPath};
