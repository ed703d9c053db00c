//! Filter repository — operations on the `filters` table.
//!
//! Filters are managed outside this service; the pipeline only reads them.
//! `insert` exists for seeding and tests.

use rusqlite::params;

use super::{Database, DatabaseError};

/// A raw filter row from the database.
#[derive(Debug, Clone)]
pub struct FilterRow {
    pub id: String,
    pub account_id: String,
    /// Display label used in notifications.
    pub title: String,
    /// Mailbox search expression.
    pub query: String,
    pub enabled: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Generates a new filter id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Inserts a filter record.
pub fn insert(db: &Database, row: &FilterRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO filters (id, account_id, title, query, enabled, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                row.id,
                row.account_id,
                row.title,
                row.query,
                row.enabled,
                row.created_at,
                row.updated_at,
            ],
        )?;
        Ok(())
    })
}

/// Lists the enabled filters of an account in creation order.
pub fn list_enabled(db: &Database, account_id: &str) -> Result<Vec<FilterRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT id, account_id, title, query, enabled, created_at, updated_at
             FROM filters WHERE account_id = ?1 AND enabled = 1
             ORDER BY created_at, id",
        )?;
        let rows = stmt
            .query_map(params![account_id], |row| {
                Ok(FilterRow {
                    id: row.get(0)?,
                    account_id: row.get(1)?,
                    title: row.get(2)?,
                    query: row.get(3)?,
                    enabled: row.get(4)?,
                    created_at: row.get(5)?,
                    updated_at: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
