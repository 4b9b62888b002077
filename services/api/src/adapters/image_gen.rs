//! services/api/src/adapters/image_gen.rs
//!
//! This module contains the adapter for the Gemini image model.
//! It implements the `ImageGenerationService` port from the `core` crate.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use soul_map_core::{
    domain::{ImageRef, ImageVariant},
    ports::{ImageGenerationService, ImageRequest, PortError, PortResult},
};
use std::time::Duration;
use tracing::{debug, warn};

const DAY_STYLE: &str = "cinematic landscape photography, golden hour light, vibrant colors, 8k resolution, serene and peaceful atmosphere, professional travel magazine style";
const NIGHT_STYLE: &str = "astrophotography, mesmerizing Milky Way, stars, long exposure, magical purple and deep blue night sky, professional photography, breathtaking nocturnal landscape";

const PROMPT_TEMPLATE: &str = r#"A breathtaking vertical 9:16 aspect ratio landscape photo of "{name}" in {location}, Taiwan.
Capture the essence and soul of this hidden gem. Style: {style}. No people, hyper-realistic, highly detailed."#;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

//=========================================================================================
// Wire Types
//=========================================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<TextPart<'a>>,
}

#[derive(Debug, Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_modalities: Vec<&'static str>,
    image_config: ImageConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponsePart {
    inline_data: Option<InlineData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: Option<String>,
    data: String,
}

impl GenerateContentResponse {
    /// The first inline image of the first candidate.
    fn into_image(self) -> Option<ImageRef> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .find_map(|part| part.inline_data)
            .map(|inline| {
                ImageRef::inline(
                    inline.mime_type.unwrap_or_else(|| "image/png".to_string()),
                    inline.data,
                )
            })
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ImageGenerationService` with Gemini `generateContent`.
#[derive(Clone)]
pub struct GeminiImageAdapter {
    client: Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl GeminiImageAdapter {
    /// Creates a new `GeminiImageAdapter`.
    pub fn new(api_base: String, api_key: String, model: String) -> PortResult<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            model,
        })
    }

    fn prompt(request: &ImageRequest) -> String {
        let style = match request.variant {
            ImageVariant::Day => DAY_STYLE,
            ImageVariant::Night => NIGHT_STYLE,
        };
        PROMPT_TEMPLATE
            .replace("{name}", &request.spot_name)
            .replace("{location}", &request.location)
            .replace("{style}", style)
    }
}

/// The stand-in used when the provider answers without an image.
pub fn placeholder_image(spot_name: &str, variant: ImageVariant) -> ImageRef {
    let suffix = match variant {
        ImageVariant::Day => "PRESENT",
        ImageVariant::Night => "NIGHT",
    };
    let seed = format!("{}-{}", spot_name, suffix);
    let seed: String = url::form_urlencoded::byte_serialize(seed.as_bytes()).collect();
    ImageRef::remote(format!("https://picsum.photos/seed/{}/1080/1920", seed))
}

//=========================================================================================
// `ImageGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl ImageGenerationService for GeminiImageAdapter {
    async fn generate(&self, request: &ImageRequest) -> PortResult<ImageRef> {
        let prompt = Self::prompt(request);
        let body = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![TextPart { text: &prompt }],
            }],
            generation_config: GenerationConfig {
                response_modalities: vec!["IMAGE"],
                image_config: ImageConfig { aspect_ratio: "9:16" },
            },
        };

        let url = format!("{}/models/{}:generateContent", self.api_base, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PortError::Unavailable(format!(
                "image model returned {}: {}",
                status, body
            )));
        }

        let payload: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| PortError::Malformed(e.to_string()))?;

        match payload.into_image() {
            Some(image) => {
                debug!("Generated {} image for {}.", request.variant, request.spot_name);
                Ok(image)
            }
            None => {
                warn!(
                    "Image model returned no image for {} ({}), using placeholder.",
                    request.spot_name, request.variant
                );
                Ok(placeholder_image(&request.spot_name, request.variant))
            }
        }
    }
}
