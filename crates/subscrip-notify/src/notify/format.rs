//! Notification text.

use crate::mailbox::MessageSummary;

/// Renders the chat message for a matched mail.
///
/// The snippet line is left out when the message has no snippet.
pub fn notification_text(filter_title: &str, message: &MessageSummary) -> String {
    let mut lines = vec![
        format!("【{}】", filter_title),
        format!("件名: {}", message.subject),
        format!("差出人: {}", message.from),
        format!("日時: {}", message.date),
    ];
    if !message.snippet.is_empty() {
        lines.push(format!("概要: {}", message.snippet));
    }
    lines.join("\n")
}

/// Appends the recency bound to a filter query.
pub fn effective_query(filter_query: &str, recency_window: &str) -> String {
    format!("{} {}", filter_query, recency_window)
}
