use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};
use tracing::error;

use crate::error::ApiError;
use crate::state::AppState;

/// `POST /jobs/poll`: runs one poll cycle and reports how many
/// notifications went out.
pub async fn poll(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let Some(orchestrator) = state.orchestrator.as_ref() else {
        error!("Poll job failed: TOKEN_ENCRYPTION_KEY is not configured");
        return Err(ApiError::PollFailed);
    };

    match orchestrator.run().await {
        Ok(report) => Ok(Json(json!({ "ok": true, "processed": report.processed }))),
        Err(e) => {
            error!(error = %e, "Poll job failed");
            Err(ApiError::PollFailed)
        }
    }
}
