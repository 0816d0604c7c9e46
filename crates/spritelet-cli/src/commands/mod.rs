pub mod build_request;
pub mod completions;
pub mod events;
pub mod find;
pub mod generate_base;
pub mod init;
pub mod man_pages;
pub mod publish;
pub mod register;
pub mod reinit;
pub mod signal;
pub mod verify;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use spritelet_core::CoreError;
use spritelet_generate::{GenerateError, GeneratorConfig, ImageConfig};
use spritelet_store::ErrorKind;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_FAILURE: u8 = 1;
pub const EXIT_MISSING_STORE: u8 = 3;
pub const EXIT_PATH_ERROR: u8 = 4;
pub const EXIT_MISSING_ARTIFACT: u8 = 5;
pub const EXIT_GENERATION_FAILURE: u8 = 6;
pub const EXIT_CONFIG_ERROR: u8 = 7;

pub fn exit_code(kind: ErrorKind) -> u8 {
    match kind {
        ErrorKind::MissingStore => EXIT_MISSING_STORE,
        ErrorKind::InvalidPath | ErrorKind::OutOfBounds => EXIT_PATH_ERROR,
        ErrorKind::MissingArtifact => EXIT_MISSING_ARTIFACT,
        ErrorKind::GenerationFailure => EXIT_GENERATION_FAILURE,
        ErrorKind::Config => EXIT_CONFIG_ERROR,
        ErrorKind::Io => EXIT_FAILURE,
    }
}

/// A terminal command failure: the message for stderr and the exit status.
#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<CoreError> for CliError {
    fn from(e: CoreError) -> Self {
        Self {
            code: exit_code(e.kind()),
            message: e.to_string(),
        }
    }
}

impl From<GenerateError> for CliError {
    fn from(e: GenerateError) -> Self {
        Self {
            code: exit_code(e.kind()),
            message: e.to_string(),
        }
    }
}

impl From<String> for CliError {
    fn from(message: String) -> Self {
        Self {
            code: EXIT_FAILURE,
            message,
        }
    }
}

/// Generator selection flags, layered over the config file.
#[derive(Debug, Clone, Default, Args)]
pub struct GeneratorArgs {
    /// Generator config file (default: ~/.config/spritelet/generator.json).
    #[arg(long)]
    generator_config: Option<PathBuf>,
    /// Generator backend: http or mock.
    #[arg(long)]
    backend: Option<String>,
    /// Model name substituted into the endpoint.
    #[arg(long)]
    model: Option<String>,
    /// API endpoint; may contain a {model} placeholder.
    #[arg(long)]
    endpoint: Option<String>,
    /// Environment variable holding the API key.
    #[arg(long)]
    api_key_env: Option<String>,
    #[arg(long)]
    aspect_ratio: Option<String>,
    #[arg(long)]
    image_size: Option<String>,
    /// Request timeout in seconds.
    #[arg(long)]
    timeout: Option<u64>,
}

impl GeneratorArgs {
    pub fn resolve(&self) -> Result<GeneratorConfig, CliError> {
        let mut config = match &self.generator_config {
            Some(path) => GeneratorConfig::load(path)?,
            None => GeneratorConfig::load_default()?,
        };
        let overrides = [
            (&self.backend, &mut config.backend),
            (&self.model, &mut config.model),
            (&self.endpoint, &mut config.endpoint),
            (&self.api_key_env, &mut config.api_key_env),
            (&self.aspect_ratio, &mut config.aspect_ratio),
            (&self.image_size, &mut config.image_size),
        ];
        for (flag, field) in overrides {
            if let Some(value) = flag {
                value.clone_into(field);
            }
        }
        if let Some(secs) = self.timeout {
            config.timeout_secs = secs;
        }
        tracing::debug!("generator backend {} model {}", config.backend, config.model);
        Ok(config)
    }
}

pub fn image_config(config: &GeneratorConfig) -> ImageConfig {
    ImageConfig {
        aspect_ratio: config.aspect_ratio.clone(),
        image_size: config.image_size.clone(),
    }
}

pub fn json_pretty(value: &impl serde::Serialize) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|e| format!("JSON serialization failed: {e}"))
}

pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    pb.set_message(msg.to_owned());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

pub fn spin_ok(pb: &ProgressBar, msg: &str) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(format!("✓ {msg}"));
}

pub fn spin_fail(pb: &ProgressBar, msg: &str) {
    if let Ok(style) = ProgressStyle::with_template("{msg}") {
        pb.set_style(style);
    }
    pb.finish_with_message(format!("✗ {msg}"));
}

/// Run `f` behind a spinner unless output is JSON.
pub fn with_spinner<T, E>(
    json: bool,
    working: &str,
    done: &str,
    failed: &str,
    f: impl FnOnce() -> Result<T, E>,
) -> Result<T, E> {
    let pb = if json { None } else { Some(spinner(working)) };
    let result = f();
    if let Some(pb) = &pb {
        match &result {
            Ok(_) => spin_ok(pb, done),
            Err(_) => spin_fail(pb, failed),
        }
    }
    result
}

pub fn colorize_reuse(reused: bool) -> String {
    use console::Style;
    if reused {
        Style::new().green().apply_to("reused").to_string()
    } else {
        Style::new().yellow().bold().apply_to("generated").to_string()
    }
}

pub fn colorize_flag(flag: bool) -> String {
    use console::Style;
    if flag {
        Style::new().yellow().apply_to("yes").to_string()
    } else {
        Style::new().dim().apply_to("no").to_string()
    }
}
