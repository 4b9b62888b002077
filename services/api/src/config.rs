//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub log_level: Level,
    pub openai_api_key: String,
    pub openai_api_base: Option<String>,
    pub recommendation_model: String,
    pub gemini_api_key: String,
    pub gemini_api_base: String,
    pub image_model: String,
    pub quiz_transition: Duration,
    pub postcard_font_path: PathBuf,
    /// Hosts postcard backgrounds may be downloaded from.
    pub postcard_image_hosts: Vec<String>,
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let or_default = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| lookup(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()));

        // --- Server Settings ---
        let bind_address_str = or_default("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = or_default("RUST_LOG", "INFO");
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin = or_default("ALLOWED_ORIGIN", "http://localhost:3000");

        // --- Provider Credentials ---
        let openai_api_key = required("OPENAI_API_KEY")?;
        let openai_api_base = lookup("OPENAI_API_BASE");
        let gemini_api_key = required("GEMINI_API_KEY")?;
        let gemini_api_base = or_default(
            "GEMINI_API_BASE",
            "https://generativelanguage.googleapis.com/v1beta",
        );

        // --- Adapter-specific Settings ---
        let recommendation_model = or_default("RECOMMENDATION_MODEL", "gpt-4o-mini");
        let image_model = or_default("IMAGE_MODEL", "gemini-2.5-flash-image");

        let transition_str = or_default("QUIZ_TRANSITION_MS", "500");
        let quiz_transition = transition_str
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|e| ConfigError::InvalidValue("QUIZ_TRANSITION_MS".to_string(), e.to_string()))?;

        let postcard_font_path =
            PathBuf::from(or_default("POSTCARD_FONT_PATH", "./assets/fonts/postcard.ttf"));
        let postcard_image_hosts = or_default("POSTCARD_IMAGE_HOSTS", "picsum.photos,fastly.picsum.photos")
            .split(',')
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect();

        Ok(Self {
            bind_address,
            log_level,
            openai_api_key,
            openai_api_base,
            recommendation_model,
            gemini_api_key,
            gemini_api_base,
            image_model,
            quiz_transition,
            postcard_font_path,
            postcard_image_hosts,
            allowed_origin,
        })
    }
}
