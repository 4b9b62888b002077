pub mod board;
pub mod catalog;
pub mod domain;
pub mod orchestrator;
pub mod ports;
pub mod postcard;
pub mod quiz;

pub use board::{select_image, SpotBoard, SpotEntry};
pub use domain::{
    ArchetypeId, ArchetypeProfile, Coordinates, ImageRef, ImageVariant, PostcardDraft, Question,
    SpotId, SpotRecord, TravelSpot, HIGHLIGHT_COUNT, REMINDER_COUNT,
};
pub use orchestrator::{
    FetchSummary, ImageGenerationError, RecommendationFetchError, RecommendationOrchestrator,
    SpotUpdate, SPOT_COUNT,
};
pub use ports::{
    ImageGenerationService, ImageRequest, PortError, PortResult, PostcardRenderer,
    RecommendationService,
};
pub use postcard::{export_postcard, ExportError, PostcardExport, PostcardLayout};
pub use quiz::{QuizEngine, QuizError, QuizState, QuizStep, ScoreTally, SubmitOutcome};
