//! Turns an account's encrypted refresh credential into a usable access
//! credential.
//!
//! Access credentials are cached on the account (encrypted) and reused until
//! shortly before they expire.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::error::{MailboxError, Result};
use super::oauth::OAuthClient;
use crate::db::{account_repo, format_timestamp, Database};
use crate::secrets::TokenCodec;

/// Lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_EXPIRES_IN_SECONDS: u64 = 3600;

/// Maximum expires_in value we accept (1 year in seconds).
/// This prevents overflow when casting u64 to i64.
const MAX_EXPIRES_IN_SECONDS: u64 = 365 * 24 * 60 * 60;

/// A cached credential is not reused within this many seconds of expiry.
const EXPIRY_BUFFER_SECONDS: i64 = 60;

/// Issues access credentials for accounts.
pub struct CredentialProvider {
    db: Database,
    codec: Arc<TokenCodec>,
    oauth: Arc<dyn OAuthClient>,
}

impl CredentialProvider {
    pub fn new(db: Database, codec: Arc<TokenCodec>, oauth: Arc<dyn OAuthClient>) -> Self {
        Self { db, codec, oauth }
    }

    /// Returns an access credential for the account.
    ///
    /// Fails with [`MailboxError::Credential`] when the stored refresh
    /// credential does not decrypt, and with the token endpoint's error when
    /// the refresh is rejected. The refresh credential is checked even when a
    /// cached access credential is still valid.
    pub async fn access_token(&self, account: &account_repo::AccountRow) -> Result<SecretString> {
        let now = Utc::now();

        let refresh_enc = account
            .refresh_credential()
            .ok_or(MailboxError::MissingCredential)?;
        let refresh_token = SecretString::from(self.codec.decrypt(refresh_enc)?);

        if let Some(cached) = self.cached_token(account, now) {
            debug!(account_id = %account.id, "Reusing cached access token");
            return Ok(cached);
        }

        let grant = self.oauth.refresh(&refresh_token).await?;
        let access_token = SecretString::from(grant.access_token);

        let expires_in = grant.expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECONDS);
        self.store_cache(&account.id, &access_token, now + safe_duration_seconds(expires_in), now);

        Ok(access_token)
    }

    fn cached_token(
        &self,
        account: &account_repo::AccountRow,
        now: DateTime<Utc>,
    ) -> Option<SecretString> {
        let encrypted = account.access_token_enc.as_deref()?;
        let expires_at = account.access_token_expiry()?;
        if expires_at <= now + Duration::seconds(EXPIRY_BUFFER_SECONDS) {
            return None;
        }

        match self.codec.decrypt(encrypted) {
            Ok(token) => Some(SecretString::from(token)),
            Err(e) => {
                warn!(account_id = %account.id, error = %e, "Discarding unreadable cached access token");
                None
            }
        }
    }

    /// Caching is best effort: a failure here only costs a refresh next time.
    fn store_cache(
        &self,
        account_id: &str,
        access_token: &SecretString,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) {
        let encrypted = match self.codec.encrypt(access_token.expose_secret()) {
            Ok(value) => value,
            Err(e) => {
                warn!(account_id, error = %e, "Failed to encrypt access token for cache");
                return;
            }
        };

        if let Err(e) = account_repo::store_access_token(
            &self.db,
            account_id,
            &encrypted,
            &format_timestamp(expires_at),
            &format_timestamp(now),
        ) {
            warn!(account_id, error = %e, "Failed to cache access token");
        }
    }
}

/// Converts expires_in seconds to a Duration, clamping to prevent overflow.
fn safe_duration_seconds(expires_in_seconds: u64) -> Duration {
    let clamped = expires_in_seconds.min(MAX_EXPIRES_IN_SECONDS);
    Duration::seconds(clamped as i64)
}
