//! Command-level operations over a Spritelet identity store.
//!
//! The `Engine` ties the store documents, the store lock, and an
//! `ImageGenerator` together into the operations a caller runs against a
//! store root: init and reset, registration, lookup, signalling, and the
//! reuse-or-regenerate publish flow decided by `policy::decide`.

pub mod engine;
pub mod policy;

pub use engine::{
    BaseImageOutcome, Engine, FindReport, InitOptions, PublishOptions, PublishOutcome,
    ReinitReport, StateDetails, SubtreeCounts,
};
pub use policy::{assess, decide, Decision, Staleness};

use spritelet_generate::GenerateError;
use spritelet_store::{ErrorKind, StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("state name '{0}' is empty after normalization")]
    EmptyName(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("state '{0}' kept changing underneath publish; try again")]
    Contended(String),
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Store(e) => e.kind(),
            CoreError::Generate(e) => e.kind(),
            CoreError::EmptyName(_) => ErrorKind::InvalidPath,
            CoreError::Io(_) | CoreError::Contended(_) => ErrorKind::Io,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_pass_through_wrapped_errors() {
        let e: CoreError = StoreError::MissingArtifact("states/x.png".to_owned()).into();
        assert_eq!(e.kind(), ErrorKind::MissingArtifact);
        assert!(e.to_string().contains("states/x.png"));

        let e: CoreError = GenerateError::NoImage.into();
        assert_eq!(e.kind(), ErrorKind::GenerationFailure);

        let e: CoreError = std::io::Error::other("disk full").into();
        assert_eq!(e.kind(), ErrorKind::Io);

        let e = CoreError::Contended("idle".to_owned());
        assert_eq!(e.kind(), ErrorKind::Io);
        assert!(e.to_string().contains("idle"));
    }
}
