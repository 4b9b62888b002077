//! services/api/src/bin/openapi.rs
//!
//! Writes the Soul Map REST document (archetypes, quiz, postcards, health)
//! to disk so the web client can generate its types from it. The WebSocket
//! protocol is not part of the document.
//!
//! Usage: `openapi [OUTPUT]`, defaulting to `soul-map-openapi.json`.

use api_lib::{error::ApiError, web::rest::ApiDoc};
use std::path::PathBuf;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "soul-map-openapi.json";

fn render_document() -> Result<String, ApiError> {
    Ok(ApiDoc::openapi().to_pretty_json()?)
}

fn main() -> Result<(), ApiError> {
    let output = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    let document = render_document()?;
    std::fs::write(&output, document)?;
    println!(
        "Wrote the Soul Map OpenAPI document ({} paths) to {}",
        ApiDoc::openapi().paths.paths.len(),
        output.display()
    );
    Ok(())
}
