//! Inbound command handling.
//!
//! Watches the live message stream for on-call queries: a leading direct
//! mention of the bot (`<@BOTID> oncall`) or the configured prefix command
//! (`!oncall`), case-insensitively, trailing arguments ignored. Commands
//! never mutate persisted state.

use std::sync::Arc;

use slack::InboundEvent;
use tracing::{debug, warn};

use crate::context::AppContext;
use crate::notify::{Announcer, Target, QUERY_PRETEXT};

/// A command parsed from a message addressed to the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Who is on call?
    Oncall,
    /// Addressed to the bot, but not a command we know.
    Unknown(String),
}

/// What the listener did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// Not a human channel message addressed to the bot.
    Ignored,
    /// An on-call query was answered.
    Answered,
    /// An unknown command got the help reply.
    Help,
}

/// Case-insensitive ASCII prefix check that leaves the remainder sliceable.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let len = prefix.len();
    if text.len() >= len && text.as_bytes()[..len].eq_ignore_ascii_case(prefix.as_bytes()) {
        Some(&text[len..])
    } else {
        None
    }
}

/// Consumes inbound chat events and answers recognized commands.
pub struct CommandListener {
    announcer: Arc<dyn Announcer>,
    ctx: Arc<AppContext>,
    bot_user_id: String,
}

impl CommandListener {
    #[must_use]
    pub fn new(announcer: Arc<dyn Announcer>, ctx: Arc<AppContext>, bot_user_id: String) -> Self {
        Self {
            announcer,
            ctx,
            bot_user_id,
        }
    }

    /// Parse a command out of message text. `None` means the message was
    /// not addressed to the bot at all.
    fn parse_command(&self, text: &str) -> Option<Command> {
        let text = text.trim();
        let mention = format!("<@{}>", self.bot_user_id);

        let rest = if let Some(rest) = strip_prefix_ignore_case(text, &mention) {
            rest
        } else {
            strip_prefix_ignore_case(text, &self.ctx.config.prefix_char)?
        };

        let token = rest.split_whitespace().next().unwrap_or("");
        if token.eq_ignore_ascii_case("oncall") {
            Some(Command::Oncall)
        } else {
            Some(Command::Unknown(token.to_string()))
        }
    }

    /// Handle one inbound event.
    pub async fn handle_event(&self, event: &InboundEvent) -> Handled {
        let InboundEvent::Message(message) = event else {
            return Handled::Ignored;
        };
        // Subtyped messages are edits/joins/bot posts, never commands.
        if message.subtype.is_some() {
            return Handled::Ignored;
        }
        if message.user == self.bot_user_id {
            return Handled::Ignored;
        }

        let Some(command) = self.parse_command(&message.text) else {
            return Handled::Ignored;
        };

        match command {
            Command::Oncall => {
                let oncall = self.ctx.oncall.read().await.clone();
                if let Err(e) = self
                    .announcer
                    .announce(Target::Id(&message.channel), &oncall, QUERY_PRETEXT)
                    .await
                {
                    warn!(error = %e, channel = %message.channel, "failed to answer oncall query");
                }
                Handled::Answered
            }
            Command::Unknown(token) => {
                debug!(token = %token, channel = %message.channel, "unrecognized command");
                let help = format!(
                    "Try `{}oncall` to see who is currently on call.",
                    self.ctx.config.prefix_char
                );
                if let Err(e) = self.announcer.reply(&message.channel, &help).await {
                    warn!(error = %e, "failed to send help reply");
                }
                Handled::Help
            }
        }
    }
}
