//! A full poll cycle across every eligible account.

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};

use super::processor::AccountProcessor;
use crate::config::PollSettings;
use crate::db::{account_repo, Database};
use crate::error::Result;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollReport {
    /// Notifications sent across all accounts.
    pub processed: usize,
    pub accounts_total: usize,
    /// Accounts without a mailbox credential or chat user.
    pub accounts_skipped: usize,
    /// Accounts that errored, timed out, or were cut off by the deadline.
    pub accounts_failed: usize,
}

/// Drives [`AccountProcessor`] over every chat-enabled account.
pub struct PollOrchestrator {
    db: Database,
    processor: Arc<AccountProcessor>,
    settings: PollSettings,
}

impl PollOrchestrator {
    pub fn new(db: Database, processor: Arc<AccountProcessor>, settings: PollSettings) -> Self {
        Self {
            db,
            processor,
            settings,
        }
    }

    /// Runs one cycle.
    ///
    /// Only a failure to list accounts is returned as an error. Everything
    /// that goes wrong inside an account is logged and counted in the report.
    pub async fn run(&self) -> Result<PollReport> {
        let accounts = account_repo::list_chat_enabled(&self.db)?;
        let mut report = PollReport {
            accounts_total: accounts.len(),
            ..Default::default()
        };

        let eligible: Vec<_> = accounts
            .into_iter()
            .filter(|a| a.refresh_credential().is_some() && a.chat_user_id().is_some())
            .collect();
        report.accounts_skipped = report.accounts_total - eligible.len();
        let pending = eligible.len();

        info!(
            accounts = report.accounts_total,
            eligible = pending,
            concurrency = self.settings.concurrency,
            "Poll cycle started"
        );

        let account_timeout = self.settings.account_timeout;
        let mut results = stream::iter(eligible.into_iter().map(|account| {
            let processor = Arc::clone(&self.processor);
            let span = info_span!("poll_account", account_id = %account.id);
            async move {
                let outcome = tokio::time::timeout(account_timeout, processor.process(&account)).await;
                (account.id, outcome)
            }
            .instrument(span)
        }))
        .buffer_unordered(self.settings.concurrency.max(1));

        let deadline = tokio::time::sleep(self.settings.deadline);
        tokio::pin!(deadline);

        let mut finished = 0;
        loop {
            tokio::select! {
                next = results.next() => {
                    let Some((account_id, outcome)) = next else { break };
                    finished += 1;
                    match outcome {
                        Ok(Ok(sent)) => report.processed += sent,
                        Ok(Err(e)) => {
                            report.accounts_failed += 1;
                            error!(account_id = %account_id, error = %e, "Account processing failed");
                        }
                        Err(_) => {
                            report.accounts_failed += 1;
                            warn!(account_id = %account_id, timeout_secs = account_timeout.as_secs(), "Account processing timed out");
                        }
                    }
                }
                _ = &mut deadline => {
                    let abandoned = pending - finished;
                    report.accounts_failed += abandoned;
                    warn!(abandoned, "Poll deadline reached, abandoning remaining accounts");
                    break;
                }
            }
        }

        info!(
            processed = report.processed,
            skipped = report.accounts_skipped,
            failed = report.accounts_failed,
            "Poll cycle finished"
        );
        Ok(report)
    }
}
