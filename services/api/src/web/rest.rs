//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::{error::ApiError, web::state::AppState};
use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use soul_map_core::{
    catalog,
    domain::{ArchetypeProfile, PostcardDraft, Question, TravelSpot},
    postcard::export_postcard,
};
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_archetypes_handler,
        list_questions_handler,
        create_postcard_handler,
        health_handler,
    ),
    components(
        schemas(ArchetypeResponse, PaletteResponse, QuestionResponse, OptionResponse, HealthResponse)
    ),
    tags(
        (name = "Soul Map API", description = "Archetype quiz, travel recommendations and postcards.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// Colours of an archetype, as hex strings.
#[derive(Serialize, ToSchema)]
pub struct PaletteResponse {
    primary: String,
    secondary: String,
    accent: String,
    background: String,
    text: String,
}

/// One travel archetype.
#[derive(Serialize, ToSchema)]
pub struct ArchetypeResponse {
    /// `HEALER`, `ADVENTURER` or `SCAVENGER`.
    id: String,
    name: String,
    subtitle: String,
    description: String,
    keywords: Vec<String>,
    palette: PaletteResponse,
}

impl From<&ArchetypeProfile> for ArchetypeResponse {
    fn from(profile: &ArchetypeProfile) -> Self {
        Self {
            id: profile.id.as_str().to_string(),
            name: profile.name.to_string(),
            subtitle: profile.subtitle.to_string(),
            description: profile.description.to_string(),
            keywords: profile.keywords.iter().map(|k| k.to_string()).collect(),
            palette: PaletteResponse {
                primary: profile.palette.primary.to_string(),
                secondary: profile.palette.secondary.to_string(),
                accent: profile.palette.accent.to_string(),
                background: profile.palette.background.to_string(),
                text: profile.palette.text.to_string(),
            },
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct OptionResponse {
    text: String,
    archetype: String,
}

/// A quiz question and its options, in display order.
#[derive(Serialize, ToSchema)]
pub struct QuestionResponse {
    id: u32,
    prompt: String,
    options: Vec<OptionResponse>,
}

impl From<&Question> for QuestionResponse {
    fn from(question: &Question) -> Self {
        Self {
            id: question.id,
            prompt: question.prompt.to_string(),
            options: question
                .options
                .iter()
                .map(|o| OptionResponse {
                    text: o.text.to_string(),
                    archetype: o.archetype.as_str().to_string(),
                })
                .collect(),
        }
    }
}

/// The request body for exporting a postcard.
///
/// `spot` is the spot exactly as it was received over the WebSocket. Blank
/// text fields fall back to the postcard defaults.
#[derive(Deserialize)]
pub struct CreatePostcardRequest {
    pub spot: TravelSpot,
    #[serde(flatten)]
    pub draft: PostcardDraft,
}

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    status: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List the three travel archetypes in their fixed order.
#[utoipa::path(
    get,
    path = "/archetypes",
    responses(
        (status = 200, description = "All archetype profiles", body = [ArchetypeResponse])
    )
)]
pub async fn list_archetypes_handler() -> Json<Vec<ArchetypeResponse>> {
    Json(catalog::ARCHETYPES.iter().map(ArchetypeResponse::from).collect())
}

/// List the quiz questions.
#[utoipa::path(
    get,
    path = "/quiz",
    responses(
        (status = 200, description = "The question catalog", body = [QuestionResponse])
    )
)]
pub async fn list_questions_handler() -> Json<Vec<QuestionResponse>> {
    Json(catalog::questions().iter().map(QuestionResponse::from).collect())
}

/// Render a postcard for a spot.
///
/// Accepts a JSON body `{ spot, recipient, message, signature }` and answers
/// with the JPEG as an attachment.
#[utoipa::path(
    post,
    path = "/postcards",
    request_body(content_type = "application/json", description = "The spot and the postcard text."),
    responses(
        (status = 200, description = "The rendered postcard as image/jpeg"),
        (status = 422, description = "The body is not a valid postcard request"),
        (status = 500, description = "The postcard could not be rendered")
    )
)]
pub async fn create_postcard_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<CreatePostcardRequest>,
) -> Result<Response, ApiError> {
    let export = export_postcard(
        app_state.postcard_renderer.as_ref(),
        &request.spot,
        &request.draft,
    )
    .await?;

    let disposition = HeaderValue::from_str(&content_disposition(&export.file_name))
        .map_err(|e| ApiError::Internal(format!("Invalid file name header: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/jpeg")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        export.bytes,
    )
        .into_response())
}

/// Liveness check.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "The service is up", body = HealthResponse)
    )
)]
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// An attachment header carrying a UTF-8 file name (RFC 5987).
///
/// Form encoding leaves `*` bare and turns spaces into `+`; neither is an
/// RFC 5987 attr-char, so both are escaped.
fn content_disposition(file_name: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(file_name.as_bytes()).collect();
    format!(
        "attachment; filename=\"postcard.jpg\"; filename*=UTF-8''{}",
        encoded.replace('+', "%20").replace('*', "%2A")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use async_trait::async_trait;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use soul_map_core::{
        domain::{ArchetypeId, ImageRef},
        orchestrator::RecommendationOrchestrator,
        ports::{
            ImageGenerationService, ImageRequest, PortError, PortResult, PostcardRenderer,
            RecommendationService,
        },
        postcard::PostcardLayout,
        SpotRecord,
    };
    use std::sync::Mutex;
    use tower::ServiceExt;

    struct Unused;

    #[async_trait]
    impl RecommendationService for Unused {
        async fn recommend(&self, _: ArchetypeId, _: usize) -> PortResult<Vec<SpotRecord>> {
            Err(PortError::Unavailable("unused".into()))
        }
    }

    #[async_trait]
    impl ImageGenerationService for Unused {
        async fn generate(&self, _: &ImageRequest) -> PortResult<ImageRef> {
            Err(PortError::Unavailable("unused".into()))
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        layouts: Mutex<Vec<PostcardLayout>>,
        fail: bool,
    }

    #[async_trait]
    impl PostcardRenderer for RecordingRenderer {
        async fn render(&self, layout: &PostcardLayout) -> PortResult<Vec<u8>> {
            self.layouts.lock().unwrap().push(layout.clone());
            if self.fail {
                Err(PortError::Unexpected("font missing".into()))
            } else {
                Ok(vec![0xFF, 0xD8, 0xFF])
            }
        }
    }

    fn app(renderer: Arc<RecordingRenderer>) -> Router {
        let config = Config::from_lookup(|key: &str| match key {
            "OPENAI_API_KEY" | "GEMINI_API_KEY" => Some("test".to_string()),
            _ => None,
        })
        .unwrap();
        let state = Arc::new(AppState {
            config: Arc::new(config),
            orchestrator: RecommendationOrchestrator::new(Arc::new(Unused), Arc::new(Unused)),
            postcard_renderer: renderer,
        });
        Router::new()
            .route("/postcards", post(create_postcard_handler))
            .with_state(state)
    }

    fn postcard_body() -> String {
        serde_json::json!({
            "spot": {
                "id": "HEALER-0",
                "name": "太平山",
                "location": "宜蘭縣大同鄉",
                "description": "雲海之上",
                "highlights": ["翠峰湖", "見晴步道", "鳩之澤"],
                "reminders": ["保暖", "山路彎"],
                "prescription": "深呼吸。",
                "coordinates": { "lat": "24.50", "lng": "121.53" },
                "day_image": "https://img/day.jpg",
                "night_image": null
            },
            "recipient": "  ",
            "message": "想念你",
            "signature": "小明"
        })
        .to_string()
    }

    fn postcard_request() -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/postcards")
            .header("content-type", "application/json")
            .body(Body::from(postcard_body()))
            .unwrap()
    }

    #[tokio::test]
    async fn postcard_is_returned_as_a_jpeg_attachment() {
        let renderer = Arc::new(RecordingRenderer::default());
        let response = app(renderer.clone()).oneshot(postcard_request()).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment;"));
        assert!(disposition.contains("filename*=UTF-8''"));

        let layouts = renderer.layouts.lock().unwrap();
        assert_eq!(layouts.len(), 1);
        assert_eq!(layouts[0].recipient_line, "寄給: 未知的旅伴");
        assert_eq!(layouts[0].message, "想念你");
        assert_eq!(layouts[0].background, Some(ImageRef::remote("https://img/day.jpg")));
    }

    #[tokio::test]
    async fn render_failures_are_server_errors() {
        let renderer = Arc::new(RecordingRenderer {
            fail: true,
            ..RecordingRenderer::default()
        });
        let response = app(renderer).oneshot(postcard_request()).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["error"]["code"], "EXPORT_FAILED");
        assert!(body["error"]["message"].as_str().unwrap().contains("太平山"));
    }

    #[test]
    fn content_disposition_percent_encodes_the_name() {
        let header = content_disposition("心旅地圖_明信片_a b.jpg");
        assert!(header.is_ascii());
        assert!(header.ends_with("_a%20b.jpg"));
        assert!(!header.contains('+'));
    }

    #[test]
    fn content_disposition_escapes_asterisks() {
        let header = content_disposition("心旅地圖_明信片_*星空*.jpg");
        let (_, value) = header.split_once("''").unwrap();
        assert!(!value.contains('*'));
        assert!(value.contains("%2A"));
        assert!(value.ends_with("%2A.jpg"));
    }

    #[tokio::test]
    async fn archetypes_are_listed_in_order() {
        let Json(archetypes) = list_archetypes_handler().await;
        let ids: Vec<_> = archetypes.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["HEALER", "ADVENTURER", "SCAVENGER"]);
    }
}
