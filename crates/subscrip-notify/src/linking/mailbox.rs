//! Mailbox linking: authorization code in, encrypted refresh credential
//! stored.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;

use crate::db::{account_repo, format_timestamp, Database};
use crate::error::Result;
use crate::mailbox::{MailboxError, OAuthClient};
use crate::secrets::TokenCodec;

/// Everything the client hands over after the consent screen.
#[derive(Debug, Clone)]
pub struct MailboxGrant {
    pub account_id: String,
    pub auth_code: String,
    pub redirect_uri: String,
    pub code_verifier: String,
}

/// Exchanges the grant for a refresh credential and stores it encrypted.
///
/// The account is created on first link. A re-link replaces the credential,
/// resets the checkpoint to now, and keeps everything else.
pub async fn link_mailbox(
    db: &Database,
    codec: &TokenCodec,
    oauth: &dyn OAuthClient,
    grant: &MailboxGrant,
) -> Result<()> {
    let tokens = oauth
        .exchange_code(&grant.auth_code, &grant.redirect_uri, &grant.code_verifier)
        .await?;

    let refresh_token = tokens
        .refresh_token
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| MailboxError::OAuth2("Code exchange returned no refresh token".to_string()))?;

    let encrypted = codec.encrypt(refresh_token.expose_secret())?;
    account_repo::upsert_mailbox_credential(
        db,
        &grant.account_id,
        &encrypted,
        &format_timestamp(Utc::now()),
    )?;

    info!(account_id = %grant.account_id, "Mailbox linked");
    Ok(())
}
