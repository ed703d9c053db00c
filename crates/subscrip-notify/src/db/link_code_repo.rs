//! Link code repository — the `link_codes` table.
//!
//! Both writes are single conditional statements, so concurrent callers
//! cannot interleave a check with its update.

use rusqlite::{params, OptionalExtension};

use super::{Database, DatabaseError};

/// A raw link code row from the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCodeRow {
    pub code: String,
    pub account_id: String,
    pub expires_at: String,
    pub used: bool,
}

/// Inserts a fresh, unused code unless the value is held by a code that is
/// still valid at `now`.
///
/// A used or expired holder is replaced. Returns `false` when a valid holder
/// blocked the insert.
pub fn insert_if_vacant(
    db: &Database,
    code: &str,
    account_id: &str,
    expires_at: &str,
    now: &str,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "INSERT INTO link_codes (code, account_id, expires_at, used)
             VALUES (?1, ?2, ?3, 0)
             ON CONFLICT(code) DO UPDATE SET
               account_id = excluded.account_id,
               expires_at = excluded.expires_at,
               used = 0
             WHERE link_codes.used = 1 OR link_codes.expires_at <= ?4",
            params![code, account_id, expires_at, now],
        )?;
        Ok(changed > 0)
    })
}

/// Marks a valid code as used and returns its owner in one statement.
///
/// Returns `None` if the code is unknown, already used, or expired at `now`.
pub fn consume(db: &Database, code: &str, now: &str) -> Result<Option<String>, DatabaseError> {
    db.with_conn(|conn| {
        let account_id = conn
            .query_row(
                "UPDATE link_codes SET used = 1
                 WHERE code = ?1 AND used = 0 AND expires_at > ?2
                 RETURNING account_id",
                params![code, now],
                |r| r.get::<_, String>(0),
            )
            .optional()?;
        Ok(account_id)
    })
}

/// Finds a code record.
pub fn find(db: &Database, code: &str) -> Result<Option<LinkCodeRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                "SELECT code, account_id, expires_at, used FROM link_codes WHERE code = ?1",
                params![code],
                |row| {
                    Ok(LinkCodeRow {
                        code: row.get(0)?,
                        account_id: row.get(1)?,
                        expires_at: row.get(2)?,
                        used: row.get(3)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    })
}
