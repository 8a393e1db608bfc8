//! Error types for essence-survey

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SurveyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("LLM provider error: {0}")]
    Provider(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("No API key configured for {0}")]
    MissingApiKey(String),

    #[error("No results recorded for {0}")]
    NotFound(String),
}

pub type Result<T> = std::result::Result<T, SurveyError>;
