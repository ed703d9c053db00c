//! Chat collaborator error types.

use thiserror::Error;

/// Errors that can occur while delivering chat messages.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The channel access token is not configured.
    #[error("Chat channel not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The messaging API answered with a non-success status.
    #[error("Messaging API returned {status}: {body}")]
    Api { status: u16, body: String },
}

/// Result type for chat operations.
pub type Result<T> = std::result::Result<T, ChatError>;
