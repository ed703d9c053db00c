//! Account linking: mailbox consent and chat identity binding.

pub mod code;
pub mod mailbox;
pub mod webhook;

pub use code::{LinkCode, LinkCodeError, LinkCodeService, LINK_CODE_TTL_MINUTES};
pub use mailbox::{link_mailbox, MailboxGrant};
pub use webhook::{parse_events, WebhookEvent, WebhookHandler};
