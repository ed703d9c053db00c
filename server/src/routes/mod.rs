//! Route table.

pub mod auth;
pub mod jobs;
pub mod line;

use axum::middleware::from_fn_with_state;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::middleware::scheduler_auth;
use crate::state::AppState;

pub const SERVICE_NAME: &str = "subscrip-notify";

pub fn router(state: AppState) -> Router {
    let jobs = Router::new()
        .route("/poll", post(jobs::poll))
        .route_layer(from_fn_with_state(state.clone(), scheduler_auth));

    Router::new()
        .route("/", get(health))
        .route("/auth/google", post(auth::google))
        .route("/line/link/start", post(line::link_start))
        .route("/line/webhook", post(line::webhook))
        .nest("/jobs", jobs)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "service": SERVICE_NAME }))
}

/// Treats a missing or empty string field as absent.
pub(crate) fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
