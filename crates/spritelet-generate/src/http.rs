use crate::request::extract_image_bytes;
use crate::{GenerateError, GenerationRequest, GeneratorConfig, ImageGenerator};
use std::io::Read;
use std::time::Duration;

/// Generator backed by a `generateContent`-style HTTP API.
///
/// One POST per call. Non-2xx responses become `GenerateError::Status`
/// carrying the response body.
pub struct HttpGenerator {
    config: GeneratorConfig,
    agent: ureq::Agent,
}

impl HttpGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .http_status_as_error(false)
            .build()
            .into();
        Self { config, agent }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }
}

/// Substitute `{model}` into the endpoint path. Slashes in the model name
/// stay as path separators.
pub fn endpoint_url(endpoint: &str, model: &str) -> String {
    endpoint.replace("{model}", &encode_path_segment(model))
}

/// True when the endpoint already carries an API key parameter.
fn has_key_param(url: &str) -> bool {
    url.split_once('?')
        .is_some_and(|(_, query)| query.split('&').any(|pair| pair.starts_with("key=")))
}

fn encode_path_segment(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for b in raw.bytes() {
        let c = char::from(b);
        if c.is_ascii_alphanumeric() || "-._~/".contains(c) {
            out.push(c);
        } else {
            out.push_str(&format!("%{b:02X}"));
        }
    }
    out
}

impl ImageGenerator for HttpGenerator {
    fn name(&self) -> &str {
        "http"
    }

    fn generate(&self, request: &GenerationRequest) -> Result<Vec<u8>, GenerateError> {
        let api_key = self.config.api_key()?;
        let url = endpoint_url(&self.config.endpoint, &self.config.model);
        let body = serde_json::to_vec(&request.payload(&self.config.model))
            .map_err(|e| GenerateError::Serialization(e.to_string()))?;

        tracing::debug!(
            "POST {} ({} bytes, model {})",
            self.config.endpoint,
            body.len(),
            self.config.model
        );
        let mut req = self
            .agent
            .post(&url)
            .header("Content-Type", "application/json");
        if !has_key_param(&url) {
            req = req.query("key", &api_key);
        }
        let resp = req
            .send(&body[..])
            .map_err(|e| GenerateError::Http(e.to_string()))?;

        let code = resp.status().as_u16();
        let mut reader = resp.into_body().into_reader();
        let mut response = Vec::new();
        reader
            .read_to_end(&mut response)
            .map_err(|e| GenerateError::Http(e.to_string()))?;

        if !(200..300).contains(&code) {
            tracing::warn!("generation API returned HTTP {code}");
            return Err(GenerateError::Status {
                code,
                body: String::from_utf8_lossy(&response).into_owned(),
            });
        }

        let bytes = extract_image_bytes(&response)?;
        tracing::debug!("received {} image bytes", bytes.len());
        Ok(bytes)
    }
}
