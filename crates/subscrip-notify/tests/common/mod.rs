//! Shared test utilities for subscrip-notify integration tests.
//!
//! This module provides:
//! - `TestHarness` wiring a file-backed database and fake collaborators
//!   into the real processor and orchestrator
//! - Fakes for the mailbox, OAuth and chat services

pub mod fakes;
pub mod harness;

pub use fakes::*;
pub use harness::{TestHarness, LINKED_AT};
