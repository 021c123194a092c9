//! Announcement formatting and dispatch.
//!
//! Builds the "who's on call" attachment and posts it through the Slack
//! Web API, resolving human channel names through the channel directory.

use std::sync::Arc;

use async_trait::async_trait;
use pagerduty::Assignment;
use slack::{Attachment, AttachmentField, SlackClient, SlackError};
use thiserror::Error;
use tracing::info;

use crate::context::AppContext;

/// Pretext used by the reconciler when the assignment changes.
pub const CHANGE_PRETEXT: &str = "The current oncall engineer is now:";

/// Pretext used when answering an on-demand query.
pub const QUERY_PRETEXT: &str = "The current oncall engineer is:";

/// Attachment sidebar color.
const ATTACHMENT_COLOR: &str = "#36a64f";

/// Errors that can occur dispatching an announcement.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The configured channel name is not in the channel directory.
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    /// The message post itself failed.
    #[error("message post failed: {0}")]
    PostFailed(#[from] SlackError),
}

/// Where an announcement goes.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
    /// A human-readable channel name, resolved through the directory.
    Name(&'a str),
    /// A concrete channel ID, such as the channel a command arrived on.
    Id(&'a str),
}

/// Dispatch seam between the reconciler/listener and Slack.
#[async_trait]
pub trait Announcer: Send + Sync {
    /// Post the on-call attachment for `assignment` to `target`.
    async fn announce(
        &self,
        target: Target<'_>,
        assignment: &Assignment,
        pretext: &str,
    ) -> Result<(), DispatchError>;

    /// Post a plain-text reply to a channel ID.
    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DispatchError>;
}

/// Build the single structured message describing an assignment.
#[must_use]
pub fn build_attachment(assignment: &Assignment, pretext: &str) -> Attachment {
    Attachment {
        color: ATTACHMENT_COLOR.to_string(),
        pretext: pretext.to_string(),
        title: assignment.name.clone(),
        title_link: assignment.html_url.clone(),
        fields: vec![
            AttachmentField::short("IRC", assignment.irc_nick.clone()),
            AttachmentField::short("Slack", assignment.slack_nick.clone()),
            AttachmentField::short("Email", assignment.email.clone()),
        ],
        thumb_url: assignment.avatar_url.clone(),
        footer: assignment.coverage_window(),
    }
}

/// Production announcer over the Slack Web API.
pub struct Notifier {
    slack: Arc<SlackClient>,
    ctx: Arc<AppContext>,
}

impl Notifier {
    #[must_use]
    pub fn new(slack: Arc<SlackClient>, ctx: Arc<AppContext>) -> Self {
        Self { slack, ctx }
    }

    async fn resolve(&self, target: Target<'_>) -> Result<String, DispatchError> {
        match target {
            Target::Id(id) => Ok(id.to_string()),
            Target::Name(name) => {
                let channels = self.ctx.channels.read().await;
                channels
                    .get(name)
                    .cloned()
                    .ok_or_else(|| DispatchError::ChannelNotFound(name.to_string()))
            }
        }
    }
}

#[async_trait]
impl Announcer for Notifier {
    async fn announce(
        &self,
        target: Target<'_>,
        assignment: &Assignment,
        pretext: &str,
    ) -> Result<(), DispatchError> {
        let channel_id = self.resolve(target).await?;
        info!(oncall = %assignment.email, channel = %channel_id, "posting current oncall");

        let attachment = build_attachment(assignment, pretext);
        self.slack
            .post_message(&channel_id, None, &[attachment])
            .await?;
        Ok(())
    }

    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DispatchError> {
        self.slack.post_message(channel_id, Some(text), &[]).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::PersistedState;
    use crate::testutil::{test_assignment, test_config};

    #[test]
    fn test_attachment_shape() {
        let assignment = test_assignment("jane@example.com");
        let attachment = build_attachment(&assignment, QUERY_PRETEXT);

        assert_eq!(attachment.color, "#36a64f");
        assert_eq!(attachment.pretext, QUERY_PRETEXT);
        assert_eq!(attachment.title, "Jane Doe");
        assert_eq!(attachment.fields.len(), 3);
        assert_eq!(attachment.fields[0].title, "IRC");
        assert_eq!(attachment.fields[2].value, "jane@example.com");
        assert!(attachment.footer.starts_with("Oncall from"));
    }

    #[tokio::test]
    async fn test_unresolvable_channel_name_is_channel_not_found() {
        let ctx = Arc::new(AppContext::new(
            test_config("/tmp/unused-state.yml"),
            PersistedState::default(),
        ));
        let slack = Arc::new(SlackClient::new("xoxb-test", None).unwrap());
        let notifier = Notifier::new(slack, ctx);

        // Directory is empty, so resolution fails before any network call.
        let err = notifier
            .announce(
                Target::Name("netops"),
                &test_assignment("jane@example.com"),
                CHANGE_PRETEXT,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::ChannelNotFound(name) if name == "netops"));
    }
}
