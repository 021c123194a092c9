//! Connection supervision.
//!
//! Owns the Slack connection lifecycle: connect, run the per-session
//! activities (reconciliation ticks and the inbound event stream), detect
//! failure, back off, reconnect. Fatal authorization failures terminate
//! the process instead of retrying forever.

use std::sync::Arc;
use std::time::Duration;

use slack::{SlackClient, SlackError, SocketConnection};
use thiserror::Error;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::listener::CommandListener;
use crate::notify::{Announcer, Notifier};
use crate::reconcile::{OncallSource, Reconciler, TICK_INTERVAL};

/// Fixed wait between reconnection attempts.
pub const RECONNECT_BACKOFF: Duration = Duration::from_secs(30);

/// Connection-level failures. The supervisor is the only component that
/// reacts to these.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Worth retrying after backoff.
    #[error("transient connection failure: {0}")]
    Transient(String),

    /// Retrying can never succeed (bad credentials and the like).
    #[error("fatal connection failure: {0}")]
    Fatal(String),
}

impl From<SlackError> for ConnectionError {
    fn from(err: SlackError) -> Self {
        if err.is_fatal() {
            Self::Fatal(err.to_string())
        } else {
            Self::Transient(err.to_string())
        }
    }
}

/// Drives connect/run/backoff cycles forever.
pub struct Supervisor {
    ctx: Arc<AppContext>,
    slack: Arc<SlackClient>,
    source: Arc<dyn OncallSource>,
    announcer: Arc<dyn Announcer>,
}

impl Supervisor {
    #[must_use]
    pub fn new(ctx: Arc<AppContext>, slack: Arc<SlackClient>, source: Arc<dyn OncallSource>) -> Self {
        let announcer = Arc::new(Notifier::new(slack.clone(), ctx.clone()));
        Self {
            ctx,
            slack,
            source,
            announcer,
        }
    }

    /// Run until a fatal connection failure. Transient failures and
    /// server-side disconnects back off and reconnect indefinitely.
    pub async fn run(&self) -> anyhow::Result<()> {
        loop {
            match self.run_session().await {
                Ok(()) => info!("Slack session ended; reconnecting"),
                Err(ConnectionError::Fatal(reason)) => {
                    error!(reason = %reason, "fatal connection failure");
                    anyhow::bail!("fatal Slack connection failure: {reason}");
                }
                Err(ConnectionError::Transient(reason)) => {
                    warn!(reason = %reason, backoff_secs = RECONNECT_BACKOFF.as_secs(), "connection failure; backing off");
                }
            }
            sleep(RECONNECT_BACKOFF).await;
        }
    }

    /// One connected session: startup actions, then the periodic tick and
    /// the event stream raced over the same connection. Returns `Ok(())`
    /// when the server closed the connection gracefully.
    async fn run_session(&self) -> Result<(), ConnectionError> {
        let bot_user_id = self.slack.auth_test().await?;
        let ws_url = self
            .slack
            .connections_open(&self.ctx.config.slack_app_token)
            .await?;
        let mut socket = SocketConnection::connect(&ws_url).await?;

        let directory = self.slack.channel_directory().await?;
        {
            let mut channels = self.ctx.channels.write().await;
            *channels = directory;
        }
        info!(bot_user_id = %bot_user_id, "connected to Slack");

        let reconciler = Reconciler::new(
            self.source.clone(),
            self.announcer.clone(),
            self.ctx.clone(),
        );
        let listener =
            CommandListener::new(self.announcer.clone(), self.ctx.clone(), bot_user_id);

        // The ticker lives and dies with the connection; a slow tick
        // delays the next one rather than stacking up.
        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    reconciler.tick().await;
                }
                event = socket.next_event() => match event {
                    Ok(Some(event)) => {
                        listener.handle_event(&event).await;
                    }
                    Ok(None) => return Ok(()),
                    Err(e) => return Err(e.into()),
                },
            }
        }
    }
}
