use axum::extract::State;
use axum::Json;
use chrono::SecondsFormat;
use serde::Deserialize;
use serde_json::{json, Value};
use subscrip_notify::linking::parse_events;
use tracing::error;

use super::present;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LinkStartRequest {
    #[serde(default)]
    pub uid: Option<String>,
}

/// `POST /line/link/start`: issues a link code for a signed-in user.
pub async fn link_start(
    State(state): State<AppState>,
    body: Option<Json<LinkStartRequest>>,
) -> Result<Json<Value>, ApiError> {
    let request = body.map(|Json(b)| b);
    let Some(uid) = request.as_ref().and_then(|r| present(&r.uid)) else {
        return Err(ApiError::Validation("uid is required".to_string()));
    };

    let issued = state.link_codes.generate(uid).map_err(|e| {
        error!(error = %e, "Failed to generate link code");
        ApiError::Internal
    })?;

    Ok(Json(json!({
        "code": issued.code,
        "expiresAt": issued.expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })))
}

/// `POST /line/webhook`: always acknowledges so the platform does not retry.
pub async fn webhook(State(state): State<AppState>, body: Option<Json<Value>>) -> Json<Value> {
    if let Some(Json(body)) = body {
        let events = parse_events(&body);
        state.webhook.handle_events(&events).await;
    }
    Json(json!({ "ok": true }))
}
