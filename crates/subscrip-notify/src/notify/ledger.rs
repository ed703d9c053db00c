//! Per-account record of messages already notified.

use chrono::{DateTime, Utc};

use crate::db::{format_timestamp, sent_repo, Database, DatabaseError};

/// Dedup ledger over the `sent_messages` table.
///
/// Entries are only ever added, and only after a successful dispatch.
#[derive(Clone)]
pub struct SentLedger {
    db: Database,
}

impl SentLedger {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn exists(&self, account_id: &str, message_id: &str) -> Result<bool, DatabaseError> {
        sent_repo::exists(&self.db, account_id, message_id)
    }

    /// Records a delivered message. Returns `false` if it was already there.
    pub fn record(
        &self,
        account_id: &str,
        message_id: &str,
        filter_id: &str,
        sent_at: DateTime<Utc>,
    ) -> Result<bool, DatabaseError> {
        sent_repo::insert(
            &self.db,
            &sent_repo::SentRow {
                account_id: account_id.to_string(),
                message_id: message_id.to_string(),
                filter_id: filter_id.to_string(),
                sent_at: format_timestamp(sent_at),
            },
        )
    }
}
