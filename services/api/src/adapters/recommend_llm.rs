//! services/api/src/adapters/recommend_llm.rs
//!
//! This module contains the adapter for the recommendation LLM.
//! It implements the `RecommendationService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs, ResponseFormat,
    },
    Client,
};
use async_trait::async_trait;
use serde_json::Value;
use soul_map_core::{
    catalog,
    domain::{ArchetypeId, SpotRecord},
    ports::{PortError, PortResult, RecommendationService},
};
use tracing::{debug, info};

const SYSTEM_INSTRUCTIONS: &str = r#"You are a travel curator for Taiwan who recommends lesser-known but real places.

Always answer in Traditional Chinese.
Always answer with a single JSON object of the form {"spots": [...]} and nothing else.

Each element of "spots" has exactly these fields:
- "name": the place name
- "location": county or city plus the specific area
- "description": a poetic, emotional description of at most 60 characters
- "highlights": an array of exactly 3 must-see highlights (e.g. a hidden hot spring, a thousand-year-old tree)
- "reminders": an array of exactly 2 practical travel reminders (e.g. mountain entry permit required, bring insect repellent)
- "prescription": one sentence of comfort for the traveler, like a prescription for the soul
- "coordinates": an object with string fields "lat" and "lng", close to the real position"#;

const USER_INPUT_TEMPLATE: &str = r#"Traveler archetype: "{archetype}" ({name}: {description})

Recommend {count} hidden gems in Taiwan that fit this traveler."#;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `RecommendationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiRecommendationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiRecommendationAdapter {
    /// Creates a new `OpenAiRecommendationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `RecommendationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl RecommendationService for OpenAiRecommendationAdapter {
    async fn recommend(&self, archetype: ArchetypeId, count: usize) -> PortResult<Vec<SpotRecord>> {
        let profile = catalog::profile(archetype);
        let user_input = USER_INPUT_TEMPLATE
            .replace("{archetype}", archetype.as_str())
            .replace("{name}", profile.name)
            .replace("{description}", profile.description)
            .replace("{count}", &count.to_string());

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_input)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .response_format(ResponseFormat::JsonObject)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Malformed("Recommendation LLM response contained no text content.".to_string())
            })?;
        debug!("Raw recommendation payload: {}", content);

        let records = parse_recommendations(&content, count)?;
        info!("Received {} recommendations for {}.", records.len(), archetype);
        Ok(records)
    }
}

//=========================================================================================
// Response Parsing
//=========================================================================================

/// Parses the model output into at most `count` records.
///
/// Accepts `{"spots": [...]}` or a bare array, optionally wrapped in a
/// markdown code fence. Anything else is malformed, and so is any record
/// that breaks the recommendation contract.
pub fn parse_recommendations(text: &str, count: usize) -> PortResult<Vec<SpotRecord>> {
    let value: Value = serde_json::from_str(strip_json_fences(text))
        .map_err(|e| PortError::Malformed(format!("recommendations are not JSON: {}", e)))?;

    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("spots") {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(PortError::Malformed(
                    "expected a `spots` array in the recommendation object".to_string(),
                ))
            }
        },
        other => {
            return Err(PortError::Malformed(format!(
                "expected a list of recommendations, got {}",
                other
            )))
        }
    };

    items
        .into_iter()
        .take(count)
        .map(|item| {
            let record = serde_json::from_value::<SpotRecord>(item)
                .map_err(|e| PortError::Malformed(format!("invalid recommendation record: {}", e)))?;
            record
                .check_contract()
                .map_err(|e| PortError::Malformed(format!("invalid recommendation record: {}", e)))?;
            Ok(record)
        })
        .collect()
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"));
    match inner {
        Some(stripped) => stripped
            .trim_start()
            .strip_suffix("```")
            .map(str::trim)
            .unwrap_or(stripped.trim_start()),
        None => text,
    }
}
