//! Shared fixtures for unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use pagerduty::{Assignment, FetchError};
use slack::SlackError;

use crate::config::Config;
use crate::notify::{Announcer, DispatchError, Target};
use crate::reconcile::OncallSource;

/// A fully-derived assignment for the given identity.
pub fn test_assignment(email: &str) -> Assignment {
    let mut assignment = Assignment {
        id: "PUSER1".to_string(),
        email: email.to_string(),
        name: "Jane Doe".to_string(),
        avatar_url: "https://example.com/avatar.png".to_string(),
        html_url: "https://example.pagerduty.com/users/PUSER1".to_string(),
        irc_nick: String::new(),
        slack_nick: String::new(),
        start: "2026-08-24T00:00:00Z".to_string(),
        end: "2026-08-31T00:00:00Z".to_string(),
    };
    assignment.derive_handles(None);
    assignment
}

/// A config pointing at the given state file.
pub fn test_config(state_file: impl Into<PathBuf>) -> Config {
    Config {
        slack_api_token: "xoxb-test".to_string(),
        slack_app_token: "xapp-test".to_string(),
        pagerduty_api_token: "pd-test".to_string(),
        pagerduty_escalation_policy: "POLICY1".to_string(),
        pagerduty_oncall_schedule: "SCHED1".to_string(),
        oncall_announce_channel: "netops".to_string(),
        default_oncall: test_assignment("fallback@example.com"),
        prefix_char: "!".to_string(),
        state_file: state_file.into(),
    }
}

/// Source that always returns the same assignment.
pub struct FixedSource(pub Assignment);

#[async_trait]
impl OncallSource for FixedSource {
    async fn current_oncall(&self) -> Result<Assignment, FetchError> {
        Ok(self.0.clone())
    }
}

/// Source that always times out.
pub struct FailingSource;

#[async_trait]
impl OncallSource for FailingSource {
    async fn current_oncall(&self) -> Result<Assignment, FetchError> {
        Err(FetchError::Timeout)
    }
}

/// Announcer that records calls and can be told to fail announcements.
#[derive(Default)]
pub struct RecordingAnnouncer {
    /// `(target, identity, pretext)` per announcement.
    pub announcements: Mutex<Vec<(String, String, String)>>,
    /// `(channel_id, text)` per plain-text reply.
    pub replies: Mutex<Vec<(String, String)>>,
    fail: AtomicBool,
}

impl RecordingAnnouncer {
    pub fn fail_announcements(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(
        &self,
        target: Target<'_>,
        assignment: &Assignment,
        pretext: &str,
    ) -> Result<(), DispatchError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(DispatchError::PostFailed(SlackError::Api(
                "channel_not_found".to_string(),
            )));
        }
        let target = match target {
            Target::Name(name) => format!("name:{name}"),
            Target::Id(id) => format!("id:{id}"),
        };
        self.announcements.lock().unwrap().push((
            target,
            assignment.email.clone(),
            pretext.to_string(),
        ));
        Ok(())
    }

    async fn reply(&self, channel_id: &str, text: &str) -> Result<(), DispatchError> {
        self.replies
            .lock()
            .unwrap()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }
}
