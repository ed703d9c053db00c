//! Account repository — operations on the `accounts` table.

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, OptionalExtension};

use super::{parse_timestamp, Database, DatabaseError};

/// Subscription tier of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Plan {
    #[default]
    Free,
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
        }
    }
}

impl FromSql for Plan {
    /// Unknown tiers read as [`Plan::Free`]; the pipeline never branches on
    /// the plan, so one odd row must not make the account unreadable.
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value.as_str()? {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            other => {
                log::warn!("Unknown plan '{}', treating as free", other);
                Ok(Plan::Free)
            }
        }
    }
}

impl ToSql for Plan {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(self.as_str().into())
    }
}

/// A raw account row from the database.
#[derive(Debug, Clone)]
pub struct AccountRow {
    pub id: String,
    /// Refresh credential, encrypted with the token codec.
    pub refresh_token_enc: Option<String>,
    /// Cached access credential, encrypted with the token codec.
    pub access_token_enc: Option<String>,
    pub access_token_expires_at: Option<String>,
    pub last_checked_at: Option<String>,
    pub line_user_id: Option<String>,
    pub line_enabled: bool,
    pub plan: Plan,
    pub created_at: String,
    pub updated_at: String,
}

impl AccountRow {
    /// Returns the stored refresh credential, if a non-empty one exists.
    pub fn refresh_credential(&self) -> Option<&str> {
        self.refresh_token_enc.as_deref().filter(|s| !s.is_empty())
    }

    /// Returns the bound chat user id, if a non-empty one exists.
    pub fn chat_user_id(&self) -> Option<&str> {
        self.line_user_id.as_deref().filter(|s| !s.is_empty())
    }

    pub fn access_token_expiry(&self) -> Option<DateTime<Utc>> {
        self.access_token_expires_at
            .as_deref()
            .and_then(parse_timestamp)
    }

    pub fn last_checked(&self) -> Option<DateTime<Utc>> {
        self.last_checked_at.as_deref().and_then(parse_timestamp)
    }
}

const COLUMNS: &str = "id, refresh_token_enc, access_token_enc, access_token_expires_at,
    last_checked_at, line_user_id, line_enabled, plan, created_at, updated_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AccountRow> {
    Ok(AccountRow {
        id: row.get(0)?,
        refresh_token_enc: row.get(1)?,
        access_token_enc: row.get(2)?,
        access_token_expires_at: row.get(3)?,
        last_checked_at: row.get(4)?,
        line_user_id: row.get(5)?,
        line_enabled: row.get(6)?,
        plan: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Stores a freshly linked mailbox credential.
///
/// Creates the account if needed. On re-link the cached access credential is
/// dropped (it belongs to the old grant) while `plan`, `created_at` and the
/// chat binding are preserved.
pub fn upsert_mailbox_credential(
    db: &Database,
    account_id: &str,
    refresh_token_enc: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO accounts (id, refresh_token_enc, last_checked_at, plan, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?3, ?3)
             ON CONFLICT(id) DO UPDATE SET
               refresh_token_enc = excluded.refresh_token_enc,
               access_token_enc = NULL,
               access_token_expires_at = NULL,
               last_checked_at = excluded.last_checked_at,
               updated_at = excluded.updated_at",
            params![account_id, refresh_token_enc, now, Plan::Free],
        )?;
        Ok(())
    })
}

/// Binds a chat user to the account and enables notifications.
pub fn set_chat_binding(
    db: &Database,
    account_id: &str,
    line_user_id: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO accounts (id, line_user_id, line_enabled, plan, created_at, updated_at)
             VALUES (?1, ?2, 1, ?3, ?4, ?4)
             ON CONFLICT(id) DO UPDATE SET
               line_user_id = excluded.line_user_id,
               line_enabled = 1,
               updated_at = excluded.updated_at",
            params![account_id, line_user_id, Plan::Free, now],
        )?;
        Ok(())
    })
}

/// Caches an (encrypted) access credential and its expiry.
pub fn store_access_token(
    db: &Database,
    account_id: &str,
    access_token_enc: &str,
    expires_at: &str,
    now: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE accounts SET access_token_enc = ?2, access_token_expires_at = ?3, updated_at = ?4
             WHERE id = ?1",
            params![account_id, access_token_enc, expires_at, now],
        )?;
        Ok(())
    })
}

/// Advances the mailbox checkpoint.
pub fn touch_last_checked(db: &Database, account_id: &str, now: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE accounts SET last_checked_at = ?2, updated_at = ?2 WHERE id = ?1",
            params![account_id, now],
        )?;
        Ok(())
    })
}

/// Finds an account by id.
pub fn find(db: &Database, account_id: &str) -> Result<Option<AccountRow>, DatabaseError> {
    db.with_conn(|conn| {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM accounts WHERE id = ?1", COLUMNS),
                params![account_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    })
}

/// Lists every account whose chat binding is enabled, oldest first.
///
/// A row that fails to decode is logged and left out so the remaining
/// accounts are still listed.
pub fn list_chat_enabled(db: &Database) -> Result<Vec<AccountRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM accounts WHERE line_enabled = 1 ORDER BY created_at, id",
            COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_row)?
            .filter_map(|row| match row {
                Ok(row) => Some(row),
                Err(e) => {
                    log::warn!("Skipping unreadable account row: {}", e);
                    None
                }
            })
            .collect();
        Ok(rows)
    })
}
