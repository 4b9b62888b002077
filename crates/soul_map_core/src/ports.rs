//! crates/soul_map_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of the generative AI providers and the raster backend.

use async_trait::async_trait;

use crate::domain::{ArchetypeId, ImageRef, ImageVariant, SpotRecord};
use crate::postcard::PostcardLayout;

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., network, codecs).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
    #[error("Malformed response: {0}")]
    Malformed(String),
    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Requests
//=========================================================================================

/// What the image provider needs to render one variant of one location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub spot_name: String,
    pub location: String,
    pub variant: ImageVariant,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait RecommendationService: Send + Sync {
    /// Returns up to `count` location records for an archetype, in ranked order.
    async fn recommend(&self, archetype: ArchetypeId, count: usize) -> PortResult<Vec<SpotRecord>>;
}

#[async_trait]
pub trait ImageGenerationService: Send + Sync {
    /// Generates one image variant for a location.
    async fn generate(&self, request: &ImageRequest) -> PortResult<ImageRef>;
}

#[async_trait]
pub trait PostcardRenderer: Send + Sync {
    /// Rasterizes a filled postcard template into an encoded image.
    async fn render(&self, layout: &PostcardLayout) -> PortResult<Vec<u8>>;
}
