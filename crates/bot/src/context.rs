//! Shared application context.
//!
//! One struct owns configuration, the in-memory assignment, persisted
//! state, and the channel directory. Components receive an
//! `Arc<AppContext>` explicitly rather than reaching for globals.

use std::collections::HashMap;

use pagerduty::Assignment;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::state::PersistedState;

/// Shared state for all bot components.
pub struct AppContext {
    /// Immutable configuration.
    pub config: Config,
    /// Current in-memory assignment; replaced wholesale by the reconciler,
    /// read by command handlers.
    pub oncall: RwLock<Assignment>,
    /// Last-announced identity, mirrored to the state file.
    pub state: RwLock<PersistedState>,
    /// Channel name to channel ID, refreshed at connection start.
    pub channels: RwLock<HashMap<String, String>>,
}

impl AppContext {
    /// Build a context from loaded configuration and persisted state.
    /// The in-memory assignment starts as the configured fallback.
    #[must_use]
    pub fn new(config: Config, state: PersistedState) -> Self {
        let oncall = RwLock::new(config.default_oncall.clone());
        Self {
            config,
            oncall,
            state: RwLock::new(state),
            channels: RwLock::new(HashMap::new()),
        }
    }
}
