//! Scriptable stand-ins for the external services.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use subscrip_notify::chat::error::Result as ChatResult;
use subscrip_notify::mailbox::error::Result as MailboxResult;
use subscrip_notify::mailbox::TokenResponse;
use subscrip_notify::{ChatError, ChatMessenger, MailboxError, MailboxSearch, MessageSummary, OAuthClient};

/// Refreshes `R` into `access:R`, except for refresh tokens marked revoked.
#[derive(Default)]
pub struct FakeOAuth {
    revoked: Mutex<HashSet<String>>,
    refreshes: Mutex<usize>,
}

impl FakeOAuth {
    pub fn revoke(&self, refresh_token: &str) {
        self.revoked.lock().unwrap().insert(refresh_token.to_string());
    }

    pub fn refresh_count(&self) -> usize {
        *self.refreshes.lock().unwrap()
    }
}

#[async_trait]
impl OAuthClient for FakeOAuth {
    async fn exchange_code(&self, code: &str, _: &str, _: &str) -> MailboxResult<TokenResponse> {
        Ok(TokenResponse {
            access_token: format!("access:{}", code),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3599),
            refresh_token: Some(format!("refresh:{}", code)),
            scope: None,
        })
    }

    async fn refresh(&self, refresh_token: &SecretString) -> MailboxResult<TokenResponse> {
        *self.refreshes.lock().unwrap() += 1;
        let token = refresh_token.expose_secret();
        if self.revoked.lock().unwrap().contains(token) {
            return Err(MailboxError::OAuth2(
                "Token refresh failed (400): invalid_grant".to_string(),
            ));
        }
        Ok(TokenResponse {
            access_token: format!("access:{}", token),
            token_type: Some("Bearer".to_string()),
            expires_in: Some(3599),
            refresh_token: None,
            scope: None,
        })
    }
}

/// A mailbox per access token, searched by exact query.
#[derive(Default)]
pub struct FakeMailbox {
    inboxes: Mutex<HashMap<(String, String), Vec<MessageSummary>>>,
    searches: Mutex<Vec<String>>,
}

impl FakeMailbox {
    /// Makes `query` return `messages` for the account whose refresh token is
    /// `refresh_token`.
    pub fn deliver(&self, refresh_token: &str, query: &str, messages: Vec<MessageSummary>) {
        self.inboxes.lock().unwrap().insert(
            (format!("access:{}", refresh_token), query.to_string()),
            messages,
        );
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailboxSearch for FakeMailbox {
    async fn search(
        &self,
        access_token: &SecretString,
        query: &str,
        max_results: u32,
    ) -> MailboxResult<Vec<MessageSummary>> {
        self.searches.lock().unwrap().push(query.to_string());
        let key = (access_token.expose_secret().to_string(), query.to_string());
        let mut found = self
            .inboxes
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .unwrap_or_default();
        found.truncate(max_results as usize);
        Ok(found)
    }
}

/// Records pushes; pushes to a user marked unreachable fail.
#[derive(Default)]
pub struct FakeMessenger {
    pushes: Mutex<Vec<(String, String)>>,
    unreachable: Mutex<HashSet<String>>,
}

impl FakeMessenger {
    pub fn set_unreachable(&self, user: &str, unreachable: bool) {
        let mut set = self.unreachable.lock().unwrap();
        if unreachable {
            set.insert(user.to_string());
        } else {
            set.remove(user);
        }
    }

    pub fn pushes(&self) -> Vec<(String, String)> {
        self.pushes.lock().unwrap().clone()
    }

    pub fn pushes_to(&self, user: &str) -> Vec<String> {
        self.pushes()
            .into_iter()
            .filter(|(to, _)| to == user)
            .map(|(_, text)| text)
            .collect()
    }
}

#[async_trait]
impl ChatMessenger for FakeMessenger {
    async fn push(&self, to: &str, text: &str) -> ChatResult<()> {
        if self.unreachable.lock().unwrap().contains(to) {
            return Err(ChatError::Api {
                status: 429,
                body: "rate limited".to_string(),
            });
        }
        self.pushes
            .lock()
            .unwrap()
            .push((to.to_string(), text.to_string()));
        Ok(())
    }

    async fn reply(&self, _: &str, _: &str) -> ChatResult<()> {
        Ok(())
    }
}

/// Builds a message summary as the mailbox would return it.
pub fn mail(id: &str, subject: &str, from: &str, snippet: &str) -> MessageSummary {
    MessageSummary {
        message_id: id.to_string(),
        thread_id: format!("t-{}", id),
        subject: subject.to_string(),
        from: from.to_string(),
        date: "Wed, 4 Mar 2026 08:30:00 +0900".to_string(),
        snippet: snippet.to_string(),
    }
}
