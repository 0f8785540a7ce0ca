//! Error types for the incident theme engine.

use thiserror::Error;

/// Main error type for theme clustering operations.
#[derive(Error, Debug)]
pub enum ThemeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid partition request: {0}")]
    InvalidPartitionRequest(String),

    #[error("External labeling error: {0}")]
    ExternalLabeling(#[from] LabelingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Configuration-related errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}

/// Errors raised at the external labeling boundary.
#[derive(Error, Debug)]
pub enum LabelingError {
    #[error("API key not provided and OPENAI_API_KEY env var not set")]
    MissingApiKey,

    #[error("Labeling service unreachable: {0}")]
    Unreachable(String),

    #[error("Labeling timed out after {0}ms")]
    Timeout(u64),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Malformed labeling response: {0}")]
    MalformedResponse(String),

    #[error("Labeling provider failed: {0}")]
    Provider(String),
}

impl ThemeError {
    /// True when the failure came from the labeling service rather than local clustering.
    pub fn is_labeling(&self) -> bool {
        matches!(self, ThemeError::ExternalLabeling(_))
    }
}

/// Result type alias for theme operations.
pub type Result<T> = std::result::Result<T, ThemeError>;
