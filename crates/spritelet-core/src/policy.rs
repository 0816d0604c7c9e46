//! Staleness and reuse decisions.

use serde::Serialize;
use spritelet_schema::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Reuse,
    Regenerate,
}

/// Decide whether a catalog state's artifact can be republished as is.
///
/// Both timestamps are whole seconds, so a base image modified in the same
/// second the state was created counts as not newer. An unknown creation
/// time is treated as stale.
pub fn decide(base_image_mtime: Timestamp, state_created_at: Option<Timestamp>, force: bool) -> Decision {
    if force {
        return Decision::Regenerate;
    }
    match state_created_at {
        Some(created) if base_image_mtime <= created => Decision::Reuse,
        _ => Decision::Regenerate,
    }
}

/// Staleness of one state relative to the base image, as reported by `find`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Staleness {
    pub base_image_is_newer: bool,
    pub state_is_stale: bool,
}

/// Like `decide`, but tolerant of a missing base image: with no mtime the
/// base is not considered newer, and only an unknown creation time makes
/// the state stale.
pub fn assess(base_image_mtime: Option<Timestamp>, state_created_at: Option<Timestamp>) -> Staleness {
    let base_image_is_newer = matches!(
        (base_image_mtime, state_created_at),
        (Some(mtime), Some(created)) if mtime > created
    );
    Staleness {
        base_image_is_newer,
        state_is_stale: base_image_is_newer || state_created_at.is_none(),
    }
}
