//! Test harness for isolated pipeline runs.
//!
//! The `TestHarness` struct provides a complete isolated environment:
//! - A file-backed database in a temporary directory
//! - A token codec with a fixed key
//! - The real credential provider, processor and orchestrator on top of the
//!   fakes in [`super::fakes`]

#![allow(dead_code)]

use std::sync::Arc;

use chrono::Utc;
use tempfile::TempDir;

use subscrip_notify::db::{account_repo, filter_repo, format_timestamp, sent_repo};
use subscrip_notify::{
    AccountProcessor, CredentialProvider, Database, PollOrchestrator, PollReport, PollSettings,
    TokenCodec,
};

use super::fakes::{FakeMailbox, FakeMessenger, FakeOAuth};

pub const TEST_KEY: &str = "AQIDBAUGBwgJCgsMDQ4PEBESExQVFhcYGRobHB0eHyA=";

/// Timestamp used as the initial checkpoint of seeded accounts.
pub const LINKED_AT: &str = "2026-01-01T00:00:00.000Z";

pub struct TestHarness {
    temp_dir: TempDir,
    pub db: Database,
    pub codec: Arc<TokenCodec>,
    pub oauth: Arc<FakeOAuth>,
    pub mailbox: Arc<FakeMailbox>,
    pub messenger: Arc<FakeMessenger>,
    pub settings: PollSettings,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_settings(PollSettings::default())
    }

    pub fn with_settings(settings: PollSettings) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db = Database::open(&temp_dir.path().join("data").join("notify.db"))
            .expect("Failed to open database");

        Self {
            temp_dir,
            db,
            codec: Arc::new(TokenCodec::from_base64_key(TEST_KEY).expect("Invalid test key")),
            oauth: Arc::new(FakeOAuth::default()),
            mailbox: Arc::new(FakeMailbox::default()),
            messenger: Arc::new(FakeMessenger::default()),
            settings,
        }
    }

    /// Refresh token the harness stores for `account_id`.
    pub fn refresh_token(account_id: &str) -> String {
        format!("refresh-{}", account_id)
    }

    /// Seeds an account with a mailbox credential and a chat binding.
    pub fn link_account(&self, account_id: &str, chat_user: &str) {
        let enc = self
            .codec
            .encrypt(&Self::refresh_token(account_id))
            .expect("Failed to encrypt");
        account_repo::upsert_mailbox_credential(&self.db, account_id, &enc, LINKED_AT)
            .expect("Failed to store credential");
        account_repo::set_chat_binding(&self.db, account_id, chat_user, LINKED_AT)
            .expect("Failed to bind chat user");
    }

    /// Adds a filter and returns its id.
    pub fn add_filter(&self, account_id: &str, title: &str, query: &str, enabled: bool) -> String {
        let now = format_timestamp(Utc::now());
        let id = filter_repo::new_id();
        filter_repo::insert(
            &self.db,
            &filter_repo::FilterRow {
                id: id.clone(),
                account_id: account_id.to_string(),
                title: title.to_string(),
                query: query.to_string(),
                enabled,
                created_at: now.clone(),
                updated_at: now,
            },
        )
        .expect("Failed to insert filter");
        id
    }

    pub fn processor(&self) -> Arc<AccountProcessor> {
        let credentials = Arc::new(CredentialProvider::new(
            self.db.clone(),
            self.codec.clone(),
            self.oauth.clone(),
        ));
        Arc::new(AccountProcessor::new(
            self.db.clone(),
            credentials,
            self.mailbox.clone(),
            self.messenger.clone(),
            self.settings.clone(),
        ))
    }

    pub fn orchestrator(&self) -> PollOrchestrator {
        PollOrchestrator::new(self.db.clone(), self.processor(), self.settings.clone())
    }

    /// Runs one poll cycle.
    pub async fn poll(&self) -> PollReport {
        self.orchestrator()
            .run()
            .await
            .expect("Poll cycle failed to enumerate accounts")
    }

    pub fn sent(&self, account_id: &str, message_id: &str) -> Option<sent_repo::SentRow> {
        sent_repo::find(&self.db, account_id, message_id).expect("Failed to read ledger")
    }

    pub fn sent_count(&self, account_id: &str) -> u64 {
        sent_repo::count_by_account(&self.db, account_id).expect("Failed to count ledger")
    }

    pub fn account(&self, account_id: &str) -> account_repo::AccountRow {
        account_repo::find(&self.db, account_id)
            .expect("Failed to read account")
            .expect("Account missing")
    }
}
