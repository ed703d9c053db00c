//! Chat webhook events: welcome on follow, link on a six-digit code.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::code::{is_link_code, LinkCodeService};
use crate::chat::ChatMessenger;
use crate::db::{account_repo, format_timestamp, Database};
use crate::error::Result;
use crate::sanitize::redact_user_id;

pub const WELCOME_REPLY: &str =
    "友だち追加ありがとうございます！\nアプリに表示された6桁の連携コードをこちらに送信してください。";
pub const LINKED_REPLY: &str = "連携が完了しました！サブスク通知をお届けします。";
pub const INVALID_CODE_REPLY: &str =
    "コードが無効または期限切れです。アプリから再発行してください。";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<EventMessage>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl WebhookEvent {
    /// Returns the trimmed text of a text message event.
    fn text(&self) -> Option<&str> {
        if self.kind != "message" {
            return None;
        }
        let message = self.message.as_ref()?;
        if message.kind != "text" {
            return None;
        }
        message.text.as_deref().map(str::trim)
    }

    fn user_id(&self) -> Option<&str> {
        self.source
            .as_ref()
            .and_then(|s| s.user_id.as_deref())
            .filter(|id| !id.is_empty())
    }
}

/// Extracts the events from a webhook body.
///
/// A body without an `events` array yields nothing, and entries that are not
/// event objects are dropped.
pub fn parse_events(body: &serde_json::Value) -> Vec<WebhookEvent> {
    let Some(events) = body.get("events").and_then(|e| e.as_array()) else {
        return Vec::new();
    };
    events
        .iter()
        .filter_map(|e| match serde_json::from_value::<WebhookEvent>(e.clone()) {
            Ok(event) => Some(event),
            Err(err) => {
                debug!(error = %err, "Skipping malformed webhook event");
                None
            }
        })
        .collect()
}

/// Reacts to chat webhook events.
pub struct WebhookHandler {
    db: Database,
    link_codes: LinkCodeService,
    messenger: Arc<dyn ChatMessenger>,
}

impl WebhookHandler {
    pub fn new(db: Database, link_codes: LinkCodeService, messenger: Arc<dyn ChatMessenger>) -> Self {
        Self {
            db,
            link_codes,
            messenger,
        }
    }

    /// Handles every event in order. A failing event is logged and does not
    /// stop the rest.
    pub async fn handle_events(&self, events: &[WebhookEvent]) {
        for event in events {
            if let Err(e) = self.handle_event(event).await {
                error!(event_type = %event.kind, error = %e, "Webhook event failed");
            }
        }
    }

    async fn handle_event(&self, event: &WebhookEvent) -> Result<()> {
        if event.kind == "follow" {
            return self.reply(event, WELCOME_REPLY).await;
        }

        let Some(text) = event.text() else {
            return Ok(());
        };
        if !is_link_code(text) {
            return Ok(());
        }

        let Some(user_id) = event.user_id() else {
            warn!("Link code received without a source user id");
            return Ok(());
        };

        match self.link_codes.resolve(text)? {
            Some(account_id) => {
                account_repo::set_chat_binding(
                    &self.db,
                    &account_id,
                    user_id,
                    &format_timestamp(Utc::now()),
                )?;
                info!(account_id = %account_id, user = %redact_user_id(user_id), "Chat linked");
                self.reply(event, LINKED_REPLY).await
            }
            None => self.reply(event, INVALID_CODE_REPLY).await,
        }
    }

    async fn reply(&self, event: &WebhookEvent, text: &str) -> Result<()> {
        match event.reply_token.as_deref() {
            Some(token) if !token.is_empty() => Ok(self.messenger.reply(token, text).await?),
            _ => {
                debug!(event_type = %event.kind, "Event has no reply token");
                Ok(())
            }
        }
    }
}
