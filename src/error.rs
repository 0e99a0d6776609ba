//! Error types for Podkast.

use thiserror::Error;

/// Library-level error type for Podkast operations.
#[derive(Error, Debug)]
pub enum PodkastError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("Timestamp cannot be negative: {0}")]
    InvalidTimestamp(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Script artifact missing: {0}")]
    MissingScript(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Chunk store error: {0}")]
    ChunkStore(String),

    #[error("Script generation failed: {0}")]
    ScriptGeneration(String),

    #[error("Speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("Audio processing failed: {0}")]
    Audio(String),

    #[error("Job state error: {0}")]
    JobState(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl PodkastError {
    /// Whether this error was caused by bad caller input (maps to HTTP 400).
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            PodkastError::InvalidInput(_)
                | PodkastError::EmptyQuestion
                | PodkastError::InvalidTimestamp(_)
        )
    }

    /// Whether this error means a referenced entity does not exist (HTTP 404).
    pub fn is_not_found(&self) -> bool {
        matches!(self, PodkastError::NotFound(_))
    }
}

/// Result type alias for Podkast operations.
pub type Result<T> = std::result::Result<T, PodkastError>;
