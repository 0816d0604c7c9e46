use crate::GenerateError;
use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

pub fn state_prompt(prompt_style: &str, simple_name: &str, description: &str) -> String {
    format!(
        "Use the provided reference image as identity lock for this mascot. \
         State name: {simple_name}. \
         State description: {description}. \
         Style: {prompt_style}. \
         Choose a background that best supports the state description and emotion."
    )
}

pub fn base_prompt(identity: &str, prompt_style: &str) -> String {
    format!("Create a mascot base avatar. Identity brief: {identity}. Style: {prompt_style}.")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceImage {
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageConfig {
    pub aspect_ratio: String,
    pub image_size: String,
}

/// What to ask the generator for: a text prompt, optionally anchored to a
/// reference image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub reference: Option<ReferenceImage>,
    pub image_config: Option<ImageConfig>,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            reference: None,
            image_config: None,
        }
    }

    #[must_use]
    pub fn with_reference_png(mut self, data: Vec<u8>) -> Self {
        self.reference = Some(ReferenceImage {
            mime_type: "image/png".to_owned(),
            data,
        });
        self
    }

    #[must_use]
    pub fn with_image_config(mut self, aspect_ratio: &str, image_size: &str) -> Self {
        self.image_config = Some(ImageConfig {
            aspect_ratio: aspect_ratio.to_owned(),
            image_size: image_size.to_owned(),
        });
        self
    }

    /// The JSON body sent to the generation API.
    pub fn payload(&self, model: &str) -> Payload {
        let mut parts = Vec::with_capacity(2);
        if let Some(reference) = &self.reference {
            parts.push(Part::Inline {
                inline_data: InlineData {
                    mime_type: reference.mime_type.clone(),
                    data: BASE64_STANDARD.encode(&reference.data),
                },
            });
        }
        parts.push(Part::Text {
            text: self.prompt.clone(),
        });
        Payload {
            model: model.to_owned(),
            contents: vec![Content {
                role: "user".to_owned(),
                parts,
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE".to_owned()],
                image_config: self.image_config.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Payload {
    pub model: String,
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub role: String,
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Inline { inline_data: InlineData },
    Text { text: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_config: Option<ImageConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct GenerationResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CandidateContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ResponsePart {
    #[serde(alias = "inlineData")]
    inline_data: Option<InlineBlob>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InlineBlob {
    data: String,
}

/// Pull the first inline image out of a generation API response body.
pub fn extract_image_bytes(body: &[u8]) -> Result<Vec<u8>, GenerateError> {
    let response: GenerationResponse = serde_json::from_slice(body)
        .map_err(|e| GenerateError::Serialization(format!("invalid API response: {e}")))?;
    let encoded = response
        .candidates
        .iter()
        .flat_map(|c| &c.content.parts)
        .filter_map(|p| p.inline_data.as_ref())
        .map(|blob| blob.data.as_str())
        .find(|data| !data.is_empty())
        .ok_or(GenerateError::NoImage)?;
    BASE64_STANDARD
        .decode(encoded)
        .map_err(|e| GenerateError::Decode(e.to_string()))
}
