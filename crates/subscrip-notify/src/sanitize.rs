//! Helpers for sanitizing data before it enters log lines and span fields.
//!
//! Logs are safe to share for debugging. These functions keep chat user ids
//! and oversized upstream error bodies out of them.

/// Upstream response bodies are cut to this many characters.
const MAX_LOGGED_BODY_CHARS: usize = 200;

/// Number of leading characters of a chat user id kept in logs.
const USER_ID_PREFIX_CHARS: usize = 8;

/// Shortens an upstream response body for inclusion in an error or log line.
pub fn truncate_for_log(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY_CHARS {
        return body.to_string();
    }
    let head: String = body.chars().take(MAX_LOGGED_BODY_CHARS).collect();
    format!("{}... (truncated)", head)
}

/// Redacts a chat user id to a short prefix.
///
/// - `U4af4980629...` → `U4af4980...`
pub fn redact_user_id(user_id: &str) -> String {
    let prefix: String = user_id.chars().take(USER_ID_PREFIX_CHARS).collect();
    format!("{}...", prefix)
}
