//! Mail provider integration.
//!
//! The pipeline only depends on the [`MailboxSearch`] and
//! [`OAuthClient`] traits; Gmail and Google OAuth are the production
//! implementations.

pub mod credentials;
pub mod error;
pub mod gmail;
pub mod oauth;

use async_trait::async_trait;
use secrecy::SecretString;

pub use credentials::CredentialProvider;
pub use error::MailboxError;
pub use gmail::GmailClient;
pub use oauth::{GoogleOAuth, OAuthClient, TokenResponse};

/// The fields of a matching message that go into a notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageSummary {
    /// Provider-unique message id. Used as the dedup key.
    pub message_id: String,
    pub thread_id: String,
    pub subject: String,
    pub from: String,
    pub date: String,
    pub snippet: String,
}

/// Searches a mailbox.
#[async_trait]
pub trait MailboxSearch: Send + Sync {
    /// Runs `query` and returns at most `max_results` matching messages.
    async fn search(
        &self,
        access_token: &SecretString,
        query: &str,
        max_results: u32,
    ) -> error::Result<Vec<MessageSummary>>;
}
