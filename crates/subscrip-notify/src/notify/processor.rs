//! One account's slice of a poll cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use super::format::{effective_query, notification_text};
use super::ledger::SentLedger;
use crate::chat::ChatMessenger;
use crate::config::PollSettings;
use crate::db::{account_repo, filter_repo, format_timestamp, Database};
use crate::error::{NotifyError, Result};
use crate::mailbox::{CredentialProvider, MailboxSearch, MessageSummary};

/// Searches an account's filters and pushes a notification for every match
/// not yet in the ledger.
pub struct AccountProcessor {
    db: Database,
    credentials: Arc<CredentialProvider>,
    mailbox: Arc<dyn MailboxSearch>,
    messenger: Arc<dyn ChatMessenger>,
    ledger: SentLedger,
    settings: PollSettings,
}

impl AccountProcessor {
    pub fn new(
        db: Database,
        credentials: Arc<CredentialProvider>,
        mailbox: Arc<dyn MailboxSearch>,
        messenger: Arc<dyn ChatMessenger>,
        settings: PollSettings,
    ) -> Self {
        Self {
            ledger: SentLedger::new(db.clone()),
            db,
            credentials,
            mailbox,
            messenger,
            settings,
        }
    }

    /// Processes one account and returns the number of notifications sent.
    ///
    /// An error means nothing was attempted for the account (no credential,
    /// no chat binding, or the filters could not be read) and the checkpoint
    /// was left alone. Failures of a single search or push are logged and
    /// skipped. Once sending has started the count is always returned, even
    /// if the checkpoint cannot be written.
    pub async fn process(&self, account: &account_repo::AccountRow) -> Result<usize> {
        let chat_user = account
            .chat_user_id()
            .ok_or(NotifyError::NotConfigured("chat binding"))?;

        let access_token = self.credentials.access_token(account).await?;
        let filters = filter_repo::list_enabled(&self.db, &account.id)?;
        debug!(account_id = %account.id, filters = filters.len(), "Evaluating filters");

        let mut sent = 0;
        for filter in &filters {
            let query = effective_query(&filter.query, &self.settings.recency_window);
            let messages = match self
                .mailbox
                .search(&access_token, &query, self.settings.max_results)
                .await
            {
                Ok(messages) => messages,
                Err(e) => {
                    error!(account_id = %account.id, filter_id = %filter.id, error = %e, "Mailbox search failed");
                    continue;
                }
            };

            for message in &messages {
                if self.deliver(account, chat_user, filter, message).await {
                    sent += 1;
                }
            }
        }

        if let Err(e) =
            account_repo::touch_last_checked(&self.db, &account.id, &format_timestamp(Utc::now()))
        {
            warn!(account_id = %account.id, error = %e, "Failed to advance checkpoint");
        }
        info!(account_id = %account.id, sent, "Account processed");
        Ok(sent)
    }

    /// Returns whether a notification went out for `message`.
    async fn deliver(
        &self,
        account: &account_repo::AccountRow,
        chat_user: &str,
        filter: &filter_repo::FilterRow,
        message: &MessageSummary,
    ) -> bool {
        match self.ledger.exists(&account.id, &message.message_id) {
            Ok(true) => return false,
            Ok(false) => {}
            Err(e) => {
                error!(account_id = %account.id, message_id = %message.message_id, error = %e, "Ledger lookup failed");
                return false;
            }
        }

        let text = notification_text(&filter.title, message);
        if let Err(e) = self.messenger.push(chat_user, &text).await {
            error!(account_id = %account.id, message_id = %message.message_id, error = %e, "Chat push failed");
            return false;
        }

        match self
            .ledger
            .record(&account.id, &message.message_id, &filter.id, Utc::now())
        {
            Ok(true) => {}
            Ok(false) => {
                debug!(account_id = %account.id, message_id = %message.message_id, "Message already recorded");
            }
            Err(e) => {
                warn!(account_id = %account.id, message_id = %message.message_id, error = %e, "Failed to record sent message");
            }
        }
        true
    }
}
