//! On-call assignment model and contact-handle derivation.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// IRC handle marker in a user bio: `:<token>`.
static IRC_NICK_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r":\s*([\w-]+)").unwrap());

/// Slack handle marker in a user bio: `@<token> on Slack`.
static SLACK_NICK_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@(.+) on Slack").unwrap());

/// The engineer currently on call for a rotation.
///
/// Replaced wholesale on every successful fetch; never merged with a
/// previous value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    /// PagerDuty user ID.
    #[serde(default)]
    pub id: String,
    /// Stable identity for change detection.
    pub email: String,
    /// Display name.
    pub name: String,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,
    /// PagerDuty profile URL.
    #[serde(default)]
    pub html_url: String,
    /// IRC handle, derived from the bio or the email local part.
    #[serde(default)]
    pub irc_nick: String,
    /// Slack handle, derived from the bio or the email local part.
    #[serde(default)]
    pub slack_nick: String,
    /// Coverage window start (opaque display string).
    #[serde(default)]
    pub start: String,
    /// Coverage window end (opaque display string).
    #[serde(default)]
    pub end: String,
}

impl Assignment {
    /// Derive the IRC and Slack handles from a free-text bio.
    ///
    /// Both default to the local part of the email. Each marker is scanned
    /// independently; first match wins and absence is not an error.
    pub fn derive_handles(&mut self, bio: Option<&str>) {
        let local_part = self.email.split('@').next().unwrap_or_default();
        self.irc_nick = local_part.to_string();
        self.slack_nick = local_part.to_string();

        let Some(bio) = bio else { return };

        if let Some(m) = IRC_NICK_PATTERN.captures(bio) {
            self.irc_nick = m[1].to_string();
        }
        if let Some(m) = SLACK_NICK_PATTERN.captures(bio) {
            self.slack_nick = m[1].to_string();
        }
    }

    /// Formatted coverage window for message footers.
    #[must_use]
    pub fn coverage_window(&self) -> String {
        format!("Oncall from {} to {}.", self.start, self.end)
    }
}
