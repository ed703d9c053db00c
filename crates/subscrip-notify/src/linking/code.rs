//! Short-lived six-digit codes that bind a chat user to an account.
//!
//! A code is issued to a signed-in account holder, typed into the chat, and
//! consumed exactly once by the webhook. Both steps are single conditional
//! statements in [`link_code_repo`], so concurrent resolution of the same
//! code yields at most one owner.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::db::{format_timestamp, link_code_repo, Database, DatabaseError};
use crate::secrets::rand_bytes;

/// Lifetime of an issued code.
pub const LINK_CODE_TTL_MINUTES: i64 = 10;

/// Number of fresh codes drawn before giving up on a collision streak.
const MAX_GENERATE_ATTEMPTS: usize = 8;

const CODE_SPACE: u32 = 1_000_000;

/// Errors from issuing link codes.
#[derive(Error, Debug)]
pub enum LinkCodeError {
    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error("Random number generator failed: {0}")]
    Random(String),

    #[error("No free link code after {attempts} attempts")]
    Exhausted { attempts: usize },
}

pub type Result<T> = std::result::Result<T, LinkCodeError>;

/// An issued code and the instant it stops being accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkCode {
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

type CodeSource = Arc<dyn Fn() -> Result<String> + Send + Sync>;

/// Issues and resolves link codes.
#[derive(Clone)]
pub struct LinkCodeService {
    db: Database,
    ttl: Duration,
    source: CodeSource,
}

impl LinkCodeService {
    pub fn new(db: Database) -> Self {
        Self::with_code_source(db, random_code)
    }

    /// Uses `source` instead of the OS RNG to draw candidate codes.
    pub fn with_code_source<F>(db: Database, source: F) -> Self
    where
        F: Fn() -> Result<String> + Send + Sync + 'static,
    {
        Self {
            db,
            ttl: Duration::minutes(LINK_CODE_TTL_MINUTES),
            source: Arc::new(source),
        }
    }

    pub fn generate(&self, account_id: &str) -> Result<LinkCode> {
        self.generate_at(account_id, Utc::now())
    }

    /// Issues a code valid from `now` for the configured lifetime.
    ///
    /// A value still held by a valid code is never reassigned; a used or
    /// expired holder is replaced.
    pub fn generate_at(&self, account_id: &str, now: DateTime<Utc>) -> Result<LinkCode> {
        let expires_at = now + self.ttl;
        let expires = format_timestamp(expires_at);
        let now_str = format_timestamp(now);

        for attempt in 1..=MAX_GENERATE_ATTEMPTS {
            let code = (self.source)()?;
            if link_code_repo::insert_if_vacant(&self.db, &code, account_id, &expires, &now_str)? {
                info!(account_id, "Link code issued");
                return Ok(LinkCode { code, expires_at });
            }
            debug!(attempt, "Link code collided with a valid code, drawing again");
        }

        warn!(account_id, "Could not find a free link code");
        Err(LinkCodeError::Exhausted {
            attempts: MAX_GENERATE_ATTEMPTS,
        })
    }

    pub fn resolve(&self, code: &str) -> std::result::Result<Option<String>, DatabaseError> {
        self.resolve_at(code, Utc::now())
    }

    /// Consumes a code and returns its owner.
    ///
    /// Unknown, used, and expired codes all resolve to `None`.
    pub fn resolve_at(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<Option<String>, DatabaseError> {
        link_code_repo::consume(&self.db, code, &format_timestamp(now))
    }
}

/// Draws a uniformly distributed six-digit code from the OS RNG.
fn random_code() -> Result<String> {
    // Largest multiple of CODE_SPACE that fits; values at or above it are
    // rejected so every code is equally likely.
    let zone = u32::MAX - (u32::MAX % CODE_SPACE);
    loop {
        let bytes = rand_bytes::<4>().map_err(|e| LinkCodeError::Random(e.to_string()))?;
        let value = u32::from_le_bytes(bytes);
        if value < zone {
            return Ok(format!("{:06}", value % CODE_SPACE));
        }
    }
}

/// Returns whether `text` is shaped like a link code.
pub fn is_link_code(text: &str) -> bool {
    text.len() == 6 && text.bytes().all(|b| b.is_ascii_digit())
}
