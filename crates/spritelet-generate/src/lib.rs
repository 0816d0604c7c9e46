//! Image generation for Spritelet states.
//!
//! This crate is the boundary with the external image-generation API: the
//! `ImageGenerator` trait the core calls, an HTTP implementation, a
//! deterministic mock, the request payload and prompt wording, and the
//! `GeneratorConfig` that selects and parameterizes a backend. Failures are
//! reported, never retried.

pub mod config;
pub mod http;
pub mod mock;
pub mod request;

pub use config::GeneratorConfig;
pub use http::HttpGenerator;
pub use mock::MockGenerator;
pub use request::{base_prompt, state_prompt, GenerationRequest, ImageConfig, ReferenceImage};

use spritelet_store::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Http(String),
    #[error("generation API failed: {code} {body}")]
    Status { code: u16, body: String },
    #[error("no image bytes found in generation API response")]
    NoImage,
    #[error("invalid image payload: {0}")]
    Decode(String),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("missing API key env var: {0}")]
    MissingCredential(String),
    #[error("generator config error: {0}")]
    Config(String),
    #[error("unknown generator backend: {0}")]
    UnknownBackend(String),
    #[error("generator I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GenerateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GenerateError::MissingCredential(_)
            | GenerateError::Config(_)
            | GenerateError::UnknownBackend(_) => ErrorKind::Config,
            GenerateError::Io(_) => ErrorKind::Io,
            GenerateError::Http(_)
            | GenerateError::Status { .. }
            | GenerateError::NoImage
            | GenerateError::Decode(_)
            | GenerateError::Serialization(_) => ErrorKind::GenerationFailure,
        }
    }
}

/// A source of generated images.
pub trait ImageGenerator: Send + Sync {
    fn name(&self) -> &str;

    /// Produce raw image bytes for `request`. One attempt per call.
    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, GenerateError>;
}

pub fn select_generator(config: &GeneratorConfig) -> Result<Box<dyn ImageGenerator>, GenerateError> {
    match config.backend.as_str() {
        "http" => Ok(Box::new(HttpGenerator::new(config.clone()))),
        "mock" => Ok(Box::new(MockGenerator::new())),
        other => Err(GenerateError::UnknownBackend(other.to_owned())),
    }
}
