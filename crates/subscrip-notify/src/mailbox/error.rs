//! Mailbox collaborator error types.

use thiserror::Error;

use crate::secrets::SecretError;

/// Errors that can occur while talking to the mail provider.
#[derive(Error, Debug)]
pub enum MailboxError {
    /// Required configuration (client id, secret, codec) is missing.
    #[error("Mailbox integration not configured: {0}")]
    NotConfigured(String),

    /// The account has no stored refresh credential.
    #[error("No mailbox credential stored for account")]
    MissingCredential,

    /// The stored credential could not be decrypted.
    #[error("Stored credential unusable: {0}")]
    Credential(#[from] SecretError),

    /// Token endpoint rejected the request or returned something unusable.
    #[error("OAuth2 error: {0}")]
    OAuth2(String),

    /// Transport-level failure.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The mailbox API answered with a non-success status.
    #[error("Mailbox API returned {status}: {body}")]
    Api { status: u16, body: String },

    /// Failed to parse an API response.
    #[error("Failed to parse mailbox response: {0}")]
    Parse(String),
}

/// Result type for mailbox operations.
pub type Result<T> = std::result::Result<T, MailboxError>;
