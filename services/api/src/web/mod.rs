pub mod protocol;
pub mod rest;
pub mod results_task;
pub mod state;
pub mod ws_handler;

// Re-export the main handlers to make them easily accessible
// to the binary that builds the web server router.
pub use rest::{
    create_postcard_handler, health_handler, list_archetypes_handler, list_questions_handler,
};
pub use ws_handler::ws_handler;
