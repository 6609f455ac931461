//! Error types for medchat-ai

use thiserror::Error;

/// Result type alias using medchat-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the chat backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Backend answered with a non-2xx status
    #[error("Request failed with status {status}")]
    Status { status: u16, body: String },

    /// Request was aborted
    #[error("Request aborted")]
    Aborted,

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Image could not be encoded
    #[error("Invalid image: {0}")]
    Image(String),
}

impl Error {
    /// Create a status error from a status code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Text shown to the user when this error ends a generation.
    ///
    /// A non-2xx response surfaces its body verbatim; an empty body falls
    /// back to a message derived from the status code.
    pub fn user_message(&self) -> String {
        match self {
            Error::Status { body, .. } if !body.trim().is_empty() => body.clone(),
            other => other.to_string(),
        }
    }

    /// Check if this error came from the request being cancelled
    pub fn is_aborted(&self) -> bool {
        matches!(self, Error::Aborted)
    }
}
