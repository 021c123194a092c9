//! Persisted announcement state.
//!
//! A single YAML mapping `{current_oncall: <identity>}` recording the last
//! assignment that was successfully announced, so restarts never
//! double-announce.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Identity used before anyone has ever been announced.
pub const SENTINEL_ONCALL: &str = "nobody";

/// The last-announced on-call identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedState {
    /// Identity of the most recent assignment whose announcement was
    /// successfully dispatched.
    pub current_oncall: String,
}

impl Default for PersistedState {
    fn default() -> Self {
        Self {
            current_oncall: SENTINEL_ONCALL.to_string(),
        }
    }
}

impl PersistedState {
    /// Load state from a YAML file. A missing, unreadable, or corrupt
    /// file yields the sentinel state; this is never fatal.
    pub fn load(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no state file; starting from sentinel");
                return Self::default();
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "unreadable state file; starting from sentinel");
                return Self::default();
            }
        };

        match serde_yaml::from_str(&contents) {
            Ok(state) => state,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "corrupt state file; starting from sentinel");
                Self::default()
            }
        }
    }

    /// Write state atomically: serialize to a sibling temp file, then
    /// rename over the target.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_yaml::to_string(self).context("failed to serialize state")?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("failed to write state file {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("failed to replace state file {}", path.display()))?;
        Ok(())
    }
}
