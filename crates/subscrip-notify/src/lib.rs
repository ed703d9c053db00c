pub mod chat;
pub mod config;
pub mod db;
pub mod error;
pub mod linking;
pub mod logging;
pub mod mailbox;
pub mod notify;
pub mod sanitize;
pub mod secrets;

#[cfg(test)]
pub(crate) mod testing;

pub use chat::{ChatError, ChatMessenger, LineMessenger};
pub use config::{Config, LogFormat, PollSettings};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, NotifyError, Result};
pub use linking::{LinkCode, LinkCodeError, LinkCodeService, MailboxGrant, WebhookHandler};
pub use mailbox::{
    CredentialProvider, GmailClient, GoogleOAuth, MailboxError, MailboxSearch, MessageSummary,
    OAuthClient,
};
pub use notify::{AccountProcessor, PollOrchestrator, PollReport, SentLedger};
pub use secrets::{resolve_secret_optional, SecretError, TokenCodec};
