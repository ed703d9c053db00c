use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use subscrip_notify::linking::link_mailbox;
use subscrip_notify::MailboxGrant;
use tracing::{error, info};

use super::present;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleAuthRequest {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub auth_code: Option<String>,
    #[serde(default)]
    pub redirect_uri: Option<String>,
    #[serde(default)]
    pub code_verifier: Option<String>,
}

impl GoogleAuthRequest {
    fn into_grant(self) -> Option<MailboxGrant> {
        Some(MailboxGrant {
            account_id: present(&self.uid)?.to_string(),
            auth_code: present(&self.auth_code)?.to_string(),
            redirect_uri: present(&self.redirect_uri)?.to_string(),
            code_verifier: present(&self.code_verifier)?.to_string(),
        })
    }
}

/// `POST /auth/google`: links a mailbox from an authorization code.
pub async fn google(
    State(state): State<AppState>,
    body: Option<Json<GoogleAuthRequest>>,
) -> Result<Json<Value>, ApiError> {
    let grant = body
        .map(|Json(b)| b)
        .unwrap_or_default()
        .into_grant()
        .ok_or_else(|| {
            ApiError::Validation("uid, authCode, redirectUri, codeVerifier are required".to_string())
        })?;

    let Some(codec) = state.codec.as_ref() else {
        error!("Google auth failed: TOKEN_ENCRYPTION_KEY is not configured");
        return Err(ApiError::GoogleAuthFailed);
    };

    match link_mailbox(&state.db, codec, state.oauth.as_ref(), &grant).await {
        Ok(()) => {
            info!(account_id = %grant.account_id, "Google auth completed");
            Ok(Json(json!({ "ok": true })))
        }
        Err(e) => {
            error!(account_id = %grant.account_id, error = %e, "Google auth failed");
            Err(ApiError::GoogleAuthFailed)
        }
    }
}
