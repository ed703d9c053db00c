//! The polling and delivery pipeline.

pub mod format;
pub mod ledger;
pub mod orchestrator;
pub mod processor;

pub use format::notification_text;
pub use ledger::SentLedger;
pub use orchestrator::{PollOrchestrator, PollReport};
pub use processor::AccountProcessor;
