//! Error types for medchat-agent

use thiserror::Error;

/// Result type alias using medchat-agent Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while setting up the controller
#[derive(Error, Debug)]
pub enum Error {
    /// An error from the wire layer
    #[error(transparent)]
    Ai(#[from] medchat_ai::Error),
}
