//! Gmail REST API search client.

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use super::error::{MailboxError, Result};
use super::oauth::create_http_client;
use super::{MailboxSearch, MessageSummary};
use crate::sanitize::truncate_for_log;

/// Base URL of the Gmail API.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1";

/// Headers requested for each matching message.
const METADATA_HEADERS: [&str; 3] = ["Subject", "From", "Date"];

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageMetadata {
    id: String,
    #[serde(default)]
    thread_id: String,
    #[serde(default)]
    snippet: String,
    #[serde(default)]
    payload: Option<Payload>,
}

#[derive(Debug, Deserialize)]
struct Payload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

impl MessageMetadata {
    fn header(&self, name: &str) -> String {
        self.payload
            .as_ref()
            .and_then(|p| p.headers.iter().find(|h| h.name.eq_ignore_ascii_case(name)))
            .map(|h| h.value.clone())
            .unwrap_or_default()
    }

    fn into_summary(self) -> MessageSummary {
        MessageSummary {
            subject: self.header("Subject"),
            from: self.header("From"),
            date: self.header("Date"),
            snippet: unescape_snippet(&self.snippet),
            message_id: self.id,
            thread_id: self.thread_id,
        }
    }
}

/// Gmail search over the REST API, authenticated per call with an access
/// token.
pub struct GmailClient {
    client: Client,
    base_url: String,
}

impl GmailClient {
    pub fn new() -> Result<Self> {
        Self::with_base_url(GMAIL_API_BASE.to_string())
    }

    pub fn with_base_url(base_url: String) -> Result<Self> {
        Ok(Self {
            client: create_http_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        url: &str,
        query: &[(&str, String)],
        access_token: &SecretString,
    ) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(access_token.expose_secret())
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MailboxError::Api {
                status: status.as_u16(),
                body: truncate_for_log(&body),
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| MailboxError::Parse(e.to_string()))
    }
}

#[async_trait]
impl MailboxSearch for GmailClient {
    async fn search(
        &self,
        access_token: &SecretString,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<MessageSummary>> {
        let list_url = format!("{}/users/me/messages", self.base_url);
        let list: ListResponse = self
            .get_json(
                &list_url,
                &[
                    ("q", query.to_string()),
                    ("maxResults", max_results.to_string()),
                ],
                access_token,
            )
            .await?;

        debug!("Search matched {} messages", list.messages.len());

        let metadata_query: Vec<(&str, String)> = std::iter::once(("format", "metadata".to_string()))
            .chain(
                METADATA_HEADERS
                    .iter()
                    .map(|h| ("metadataHeaders", h.to_string())),
            )
            .collect();

        let mut summaries = Vec::with_capacity(list.messages.len());
        for message in list.messages {
            let url = format!("{}/users/me/messages/{}", self.base_url, message.id);
            let metadata: MessageMetadata =
                self.get_json(&url, &metadata_query, access_token).await?;
            summaries.push(metadata.into_summary());
        }

        Ok(summaries)
    }
}

/// Decodes the HTML entities Gmail uses in snippets.
fn unescape_snippet(snippet: &str) -> String {
    snippet
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}
