use crate::GenerateError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "models/gemini-3-pro-image-preview";
pub const DEFAULT_ENDPOINT: &str =
    "https://generativelanguage.googleapis.com/v1beta/{model}:generateContent";
pub const DEFAULT_API_KEY_ENV: &str = "SPRITELET_GOOGLE_API_KEY";

/// Generator backend selection and request parameters.
///
/// Missing fields in a config file fall back to the defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// `http` or `mock`.
    pub backend: String,
    pub model: String,
    /// May contain a `{model}` placeholder.
    pub endpoint: String,
    /// Name of the environment variable holding the API key.
    pub api_key_env: String,
    pub aspect_ratio: String,
    pub image_size: String,
    pub timeout_secs: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            backend: "http".to_owned(),
            model: DEFAULT_MODEL.to_owned(),
            endpoint: DEFAULT_ENDPOINT.to_owned(),
            api_key_env: DEFAULT_API_KEY_ENV.to_owned(),
            aspect_ratio: "1:1".to_owned(),
            image_size: "1K".to_owned(),
            timeout_secs: 120,
        }
    }
}

impl GeneratorConfig {
    /// Load `~/.config/spritelet/generator.json`, or the defaults if there
    /// is no such file.
    pub fn load_default() -> Result<Self, GenerateError> {
        match default_config_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, GenerateError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            GenerateError::Config(format!("invalid generator config {}: {e}", path.display()))
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), GenerateError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| GenerateError::Serialization(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String, GenerateError> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(GenerateError::MissingCredential(self.api_key_env.clone())),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    let home = std::env::var_os("HOME")?;
    Some(PathBuf::from(home).join(".config/spritelet/generator.json"))
}
