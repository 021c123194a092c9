//! Slack client for the on-call bot.
//!
//! Two halves, matching the two Slack surfaces the bot uses:
//!
//! - [`api`] — request/response Web API calls (`chat.postMessage`,
//!   `auth.test`, `conversations.list`).
//! - [`socket`] — the persistent Socket Mode connection delivering the
//!   inbound event stream.

pub mod api;
pub mod error;
pub mod socket;

pub use api::{Attachment, AttachmentField, SlackClient};
pub use error::SlackError;
pub use socket::{InboundEvent, MessageEvent, SocketConnection};
