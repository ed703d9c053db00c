//! In-memory stand-ins for the external collaborators, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};

use crate::chat::error::{ChatError, Result as ChatResult};
use crate::chat::ChatMessenger;
use crate::config::PollSettings;
use crate::db::{account_repo, filter_repo, format_timestamp, Database};
use crate::mailbox::error::{MailboxError, Result as MailboxResult};
use crate::mailbox::{CredentialProvider, MailboxSearch, MessageSummary, OAuthClient, TokenResponse};
use crate::notify::AccountProcessor;
use crate::secrets::TokenCodec;

pub const TEST_KEY: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";

/// Grants `access:<refresh token>` unless the refresh token is marked bad.
#[derive(Default)]
pub struct FakeOAuth {
    pub rejected: Mutex<HashSet<String>>,
}

#[async_trait]
impl OAuthClient for FakeOAuth {
    async fn exchange_code(&self, code: &str, _: &str, _: &str) -> MailboxResult<TokenResponse> {
        Ok(TokenResponse {
            access_token: format!("access:{}", code),
            token_type: None,
            expires_in: Some(3600),
            refresh_token: Some(format!("refresh:{}", code)),
            scope: None,
        })
    }

    async fn refresh(&self, refresh_token: &SecretString) -> MailboxResult<TokenResponse> {
        let token = refresh_token.expose_secret();
        if self.rejected.lock().unwrap().contains(token) {
            return Err(MailboxError::OAuth2("invalid_grant".to_string()));
        }
        Ok(TokenResponse {
            access_token: format!("access:{}", token),
            token_type: None,
            expires_in: Some(3600),
            refresh_token: None,
            scope: None,
        })
    }
}

/// Answers searches from a fixed table keyed by full query.
#[derive(Default)]
pub struct FakeMailbox {
    pub results: Mutex<HashMap<String, Vec<MessageSummary>>>,
    pub failing: Mutex<HashSet<String>>,
    /// Queries whose search never completes.
    pub hanging: Mutex<HashSet<String>>,
    pub calls: Mutex<Vec<(String, String, u32)>>,
}

impl FakeMailbox {
    pub fn set(&self, query: &str, messages: Vec<MessageSummary>) {
        self.results
            .lock()
            .unwrap()
            .insert(query.to_string(), messages);
    }

    pub fn fail(&self, query: &str) {
        self.failing.lock().unwrap().insert(query.to_string());
    }

    pub fn hang(&self, query: &str) {
        self.hanging.lock().unwrap().insert(query.to_string());
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
        self.calls.lock().unwrap().push((
            access_token.expose_secret().to_string(),
            query.to_string(),
            max_results,
        ));
        let hangs = self.hanging.lock().unwrap().contains(query);
        if hangs {
            std::future::pending::<()>().await;
        }
        if self.failing.lock().unwrap().contains(query) {
            return Err(MailboxError::Api {
                status: 503,
                body: "backend error".to_string(),
            });
        }
        Ok(self
            .results
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}

/// Records pushes; pushes containing a marked substring fail.
#[derive(Default)]
pub struct FakeMessenger {
    pub pushes: Mutex<Vec<(String, String)>>,
    pub fail_containing: Mutex<Option<String>>,
}

impl FakeMessenger {
    pub fn pushed(&self) -> Vec<(String, String)> {
        self.pushes.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatMessenger for FakeMessenger {
    async fn push(&self, to: &str, text: &str) -> ChatResult<()> {
        if let Some(marker) = self.fail_containing.lock().unwrap().as_deref() {
            if text.contains(marker) {
                return Err(ChatError::Api {
                    status: 500,
                    body: "push failed".to_string(),
                });
            }
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

pub fn message(id: &str, subject: &str) -> MessageSummary {
    MessageSummary {
        message_id: id.to_string(),
        thread_id: format!("thread-{}", id),
        subject: subject.to_string(),
        from: "Billing <billing@service.example>".to_string(),
        date: "Tue, 3 Mar 2026 10:00:00 +0900".to_string(),
        snippet: String::new(),
    }
}

/// A database, codec and fakes wired into a processor.
pub struct Fixture {
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub oauth: Arc<FakeOAuth>,
    pub mailbox: Arc<FakeMailbox>,
    pub messenger: Arc<FakeMessenger>,
    pub processor: Arc<AccountProcessor>,
}

impl Fixture {
    pub fn new() -> Self {
        let db = Database::open_in_memory().unwrap();
        let codec = Arc::new(TokenCodec::from_base64_key(TEST_KEY).unwrap());
        let oauth = Arc::new(FakeOAuth::default());
        let mailbox = Arc::new(FakeMailbox::default());
        let messenger = Arc::new(FakeMessenger::default());
        let credentials = Arc::new(CredentialProvider::new(db.clone(), codec.clone(), oauth.clone()));
        let processor = Arc::new(AccountProcessor::new(
            db.clone(),
            credentials,
            mailbox.clone(),
            messenger.clone(),
            PollSettings::default(),
        ));
        Self {
            db,
            codec,
            oauth,
            mailbox,
            messenger,
            processor,
        }
    }

    /// Creates a fully linked account whose refresh token is `refresh:<id>`.
    pub fn account(&self, id: &str, chat_user: &str) -> account_repo::AccountRow {
        let now = format_timestamp(Utc::now());
        let enc = self.codec.encrypt(&format!("refresh:{}", id)).unwrap();
        account_repo::upsert_mailbox_credential(&self.db, id, &enc, "2026-01-01T00:00:00.000Z")
            .unwrap();
        account_repo::set_chat_binding(&self.db, id, chat_user, &now).unwrap();
        account_repo::find(&self.db, id).unwrap().unwrap()
    }

    pub fn filter(&self, account_id: &str, title: &str, query: &str) -> String {
        let now = format_timestamp(Utc::now());
        let id = filter_repo::new_id();
        filter_repo::insert(
            &self.db,
            &filter_repo::FilterRow {
                id: id.clone(),
                account_id: account_id.to_string(),
                title: title.to_string(),
                query: query.to_string(),
                enabled: true,
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .unwrap();
        id
    }

    pub fn reject_refresh(&self, account_id: &str) {
        self.oauth
            .rejected
            .lock()
            .unwrap()
            .insert(format!("refresh:{}", account_id));
    }
}
