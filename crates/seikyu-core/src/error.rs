//! Error types for the seikyu-core library.
//!
//! Field extraction never fails: a field that cannot be recognized is
//! simply absent. These errors cover the edges of the pipeline, i.e.
//! decoding recognized text and loading configuration.

use thiserror::Error;

/// Main error type for the seikyu library.
#[derive(Error, Debug)]
pub enum SeikyuError {
    /// Upstream text recognition error.
    #[error("recognition error: {0}")]
    Recognition(#[from] RecognitionError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while turning document bytes into recognized text.
#[derive(Error, Debug)]
pub enum RecognitionError {
    /// The recognized text is not valid UTF-8.
    #[error("recognized text is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::string::FromUtf8Error),

    /// The document produced no text at all.
    #[error("no text recognized")]
    Empty,
}

/// Result type for the seikyu library.
pub type Result<T> = std::result::Result<T, SeikyuError>;
