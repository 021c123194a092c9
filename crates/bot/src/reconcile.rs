//! On-call reconciliation.
//!
//! Once per tick: fetch the current assignment, compare it against the
//! last-announced identity, and announce-then-persist on change. An
//! announcement is attempted at most once per identity transition; if
//! dispatch fails the persisted state is left alone so the next tick
//! retries the same transition.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use pagerduty::{Assignment, FetchError, PagerDutyClient};
use tracing::{error, info, warn};

use crate::context::AppContext;
use crate::notify::{Announcer, Target, CHANGE_PRETEXT};

/// Fixed reconciliation period, tick start to tick start.
pub const TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Source of the current on-call assignment.
#[async_trait]
pub trait OncallSource: Send + Sync {
    async fn current_oncall(&self) -> Result<Assignment, FetchError>;
}

#[async_trait]
impl OncallSource for PagerDutyClient {
    async fn current_oncall(&self) -> Result<Assignment, FetchError> {
        PagerDutyClient::current_oncall(self).await
    }
}

/// Outcome of one reconciliation tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Fetch failed; previous assignment retained, nothing announced.
    FetchFailed,
    /// Fetched identity matches the last-announced one.
    Unchanged,
    /// Announcement dispatched and state persisted.
    Announced { from: String, to: String },
    /// Dispatch failed; state untouched, the transition retries next tick.
    DispatchFailed,
}

/// Compares fetched assignments against persisted state and drives
/// announcements.
pub struct Reconciler {
    source: Arc<dyn OncallSource>,
    announcer: Arc<dyn Announcer>,
    ctx: Arc<AppContext>,
}

impl Reconciler {
    #[must_use]
    pub fn new(
        source: Arc<dyn OncallSource>,
        announcer: Arc<dyn Announcer>,
        ctx: Arc<AppContext>,
    ) -> Self {
        Self {
            source,
            announcer,
            ctx,
        }
    }

    /// Run one reconciliation tick.
    pub async fn tick(&self) -> TickOutcome {
        let fetched = match self.source.current_oncall().await {
            Ok(assignment) => assignment,
            Err(e) => {
                warn!(error = %e, "on-call fetch failed; keeping previous assignment");
                return TickOutcome::FetchFailed;
            }
        };

        // Both write locks are held across the replace-and-persist
        // sequence so a concurrent command handler never observes a
        // half-applied update.
        let mut oncall = self.ctx.oncall.write().await;
        let mut state = self.ctx.state.write().await;

        *oncall = fetched;
        if oncall.email == state.current_oncall {
            return TickOutcome::Unchanged;
        }

        let previous = state.current_oncall.clone();
        info!(from = %previous, to = %oncall.email, "on-call changed");

        let result = self
            .announcer
            .announce(
                Target::Name(&self.ctx.config.oncall_announce_channel),
                &oncall,
                CHANGE_PRETEXT,
            )
            .await;

        match result {
            Ok(()) => {
                state.current_oncall = oncall.email.clone();
                if let Err(e) = state.save(&self.ctx.config.state_file) {
                    error!(error = %e, "failed to persist state file");
                }
                TickOutcome::Announced {
                    from: previous,
                    to: state.current_oncall.clone(),
                }
            }
            Err(e) => {
                warn!(error = %e, "announcement dispatch failed; will retry next tick");
                TickOutcome::DispatchFailed
            }
        }
    }
}
