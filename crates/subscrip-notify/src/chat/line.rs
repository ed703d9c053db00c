//! LINE Messaging API client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{info, warn};

use super::error::{ChatError, Result};
use super::ChatMessenger;
use crate::mailbox::oauth::create_http_client;
use crate::sanitize::{redact_user_id, truncate_for_log};

/// Base URL of the LINE Messaging API.
pub const LINE_API_BASE: &str = "https://api.line.me/v2/bot";

#[derive(Debug, Serialize)]
struct TextMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    text: &'a str,
}

impl<'a> TextMessage<'a> {
    fn new(text: &'a str) -> Self {
        Self { kind: "text", text }
    }
}

#[derive(Debug, Serialize)]
struct PushRequest<'a> {
    to: &'a str,
    messages: [TextMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRequest<'a> {
    reply_token: &'a str,
    messages: [TextMessage<'a>; 1],
}

/// Sends text messages through a LINE channel.
pub struct LineMessenger {
    client: Client,
    api_base: String,
    channel_token: Option<SecretString>,
}

impl LineMessenger {
    /// Creates a messenger for the given channel access token.
    ///
    /// Without a token every send fails with [`ChatError::NotConfigured`].
    pub fn new(channel_token: Option<SecretString>) -> Result<Self> {
        Self::with_api_base(LINE_API_BASE.to_string(), channel_token)
    }

    pub fn with_api_base(api_base: String, channel_token: Option<SecretString>) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            api_base: api_base.trim_end_matches('/').to_string(),
            channel_token,
        })
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<()> {
        let token = self.channel_token.as_ref().ok_or_else(|| {
            ChatError::NotConfigured("LINE_CHANNEL_ACCESS_TOKEN is not set".to_string())
        })?;

        let response = self
            .client
            .post(format!("{}/message/{}", self.api_base, endpoint))
            .bearer_auth(token.expose_secret())
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Api {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChatMessenger for LineMessenger {
    async fn push(&self, to: &str, text: &str) -> Result<()> {
        let request = PushRequest {
            to,
            messages: [TextMessage::new(text)],
        };
        match self.post("push", &request).await {
            Ok(()) => {
                info!(to = %redact_user_id(to), "Push message sent");
                Ok(())
            }
            Err(e) => {
                warn!(to = %redact_user_id(to), error = %e, "Push message failed");
                Err(e)
            }
        }
    }

    async fn reply(&self, reply_token: &str, text: &str) -> Result<()> {
        let request = ReplyRequest {
            reply_token,
            messages: [TextMessage::new(text)],
        };
        self.post("reply", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_push_body_shape() {
        let request = PushRequest {
            to: "U123",
            messages: [TextMessage::new("hello")],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"to": "U123", "messages": [{"type": "text", "text": "hello"}]})
        );
    }

    #[test]
    fn test_reply_body_shape() {
        let request = ReplyRequest {
            reply_token: "rt-1",
            messages: [TextMessage::new("hi")],
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"replyToken": "rt-1", "messages": [{"type": "text", "text": "hi"}]})
        );
    }

    #[tokio::test]
    async fn test_missing_token_is_not_configured() {
        let messenger = LineMessenger::new(None).unwrap();
        assert!(matches!(
            messenger.push("U123", "hello").await,
            Err(ChatError::NotConfigured(_))
        ));
        assert!(matches!(
            messenger.reply("rt", "hello").await,
            Err(ChatError::NotConfigured(_))
        ));
    }
}
