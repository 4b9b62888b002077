//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{GeminiImageAdapter, OpenAiRecommendationAdapter, RasterPostcardAdapter},
    config::Config,
    error::ApiError,
    web::{
        create_postcard_handler, health_handler, list_archetypes_handler, list_questions_handler,
        rest::ApiDoc, state::AppState, ws_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{header::CONTENT_TYPE, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use soul_map_core::orchestrator::RecommendationOrchestrator;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Initialize Service Adapters ---
    let mut openai_config = OpenAIConfig::new().with_api_key(config.openai_api_key.as_str());
    if let Some(api_base) = &config.openai_api_base {
        openai_config = openai_config.with_api_base(api_base.as_str());
    }
    let openai_client = Client::with_config(openai_config);

    let recommendation_adapter = Arc::new(OpenAiRecommendationAdapter::new(
        openai_client,
        config.recommendation_model.clone(),
    ));
    let image_adapter = Arc::new(GeminiImageAdapter::new(
        config.gemini_api_base.clone(),
        config.gemini_api_key.clone(),
        config.image_model.clone(),
    )?);
    let postcard_adapter = Arc::new(RasterPostcardAdapter::new(
        config.postcard_font_path.clone(),
        config.postcard_image_hosts.clone(),
    )?);

    // --- 3. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        orchestrator: RecommendationOrchestrator::new(recommendation_adapter, image_adapter),
        postcard_renderer: postcard_adapter,
    });

    let allowed_origin = config.allowed_origin.parse::<HeaderValue>().map_err(|e| {
        ApiError::Internal(format!(
            "Invalid allowed origin '{}': {}",
            config.allowed_origin, e
        ))
    })?;
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE]);

    // --- 4. Create the Web Router ---
    let api_router = Router::new()
        .route("/ws", get(ws_handler))
        .route("/archetypes", get(list_archetypes_handler))
        .route("/quiz", get(list_questions_handler))
        .route("/postcards", post(create_postcard_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
