//! Sent message repository — the `sent_messages` table.
//!
//! Rows are write-once: `insert` never replaces an existing record and
//! nothing in this module deletes one.

use rusqlite::params;

use super::{Database, DatabaseError};

/// A record that a notification was delivered for a message.
#[derive(Debug, Clone)]
pub struct SentRow {
    pub account_id: String,
    pub message_id: String,
    /// Filter that matched the message.
    pub filter_id: String,
    pub sent_at: String,
}

/// Returns whether a record exists for the (account, message) pair.
pub fn exists(db: &Database, account_id: &str, message_id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sent_messages WHERE account_id = ?1 AND message_id = ?2)",
            params![account_id, message_id],
            |r| r.get(0),
        )?;
        Ok(found)
    })
}

/// Inserts a record unless one already exists.
///
/// Returns `true` when a new row was written.
pub fn insert(db: &Database, row: &SentRow) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT OR IGNORE INTO sent_messages (account_id, message_id, filter_id, sent_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![row.account_id, row.message_id, row.filter_id, row.sent_at],
        )?;
        Ok(changed > 0)
    })
}

/// Finds the record for an (account, message) pair.
pub fn find(
    db: &Database,
    account_id: &str,
    message_id: &str,
) -> Result<Option<SentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT account_id, message_id, filter_id, sent_at FROM sent_messages
             WHERE account_id = ?1 AND message_id = ?2",
        )?;
        let mut rows = stmt.query_map(params![account_id, message_id], |row| {
            Ok(SentRow {
                account_id: row.get(0)?,
                message_id: row.get(1)?,
                filter_id: row.get(2)?,
                sent_at: row.get(3)?,
            })
        })?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Counts records for an account.
pub fn count_by_account(db: &Database, account_id: &str) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM sent_messages WHERE account_id = ?1",
            params![account_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn sample(account: &str, message: &str, filter: &str) -> SentRow {
        SentRow {
            account_id: account.to_string(),
            message_id: message.to_string(),
            filter_id: filter.to_string(),
            sent_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    #[test]
    fn test_insert_and_exists() {
        let db = test_db();
        assert!(!exists(&db, "a", "m1").unwrap());
        assert!(insert(&db, &sample("a", "m1", "f1")).unwrap());
        assert!(exists(&db, "a", "m1").unwrap());
    }

    #[test]
    fn test_exists_is_scoped_to_account() {
        let db = test_db();
        insert(&db, &sample("a", "m1", "f1")).unwrap();
        assert!(!exists(&db, "b", "m1").unwrap());
    }

    #[test]
    fn test_insert_never_overwrites() {
        let db = test_db();
        assert!(insert(&db, &sample("a", "m1", "f1")).unwrap());

        let mut second = sample("a", "m1", "f2");
        second.sent_at = "2026-02-01T00:00:00.000Z".to_string();
        assert!(!insert(&db, &second).unwrap());

        let stored = find(&db, "a", "m1").unwrap().unwrap();
        assert_eq!(stored.filter_id, "f1");
        assert_eq!(stored.sent_at, "2026-01-01T00:00:00.000Z");
        assert_eq!(count_by_account(&db, "a").unwrap(), 1);
    }

    #[test]
    fn test_find_missing() {
        let db = test_db();
        assert!(find(&db, "a", "nope").unwrap().is_none());
    }
}
