//! Chat delivery.

pub mod error;
pub mod line;

use async_trait::async_trait;

pub use error::ChatError;
pub use line::LineMessenger;

/// Delivers text messages to chat users.
#[async_trait]
pub trait ChatMessenger: Send + Sync {
    /// Pushes an unsolicited message to a user.
    async fn push(&self, to: &str, text: &str) -> error::Result<()>;

    /// Answers an inbound event using its single-use reply token.
    async fn reply(&self, reply_token: &str, text: &str) -> error::Result<()>;
}
