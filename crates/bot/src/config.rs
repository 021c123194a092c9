//! Bot configuration, loaded once at startup from a YAML file.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use pagerduty::Assignment;
use serde::Deserialize;

/// Default configuration file path.
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

fn default_prefix() -> String {
    "!".to_string()
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.yml")
}

/// Bot configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Slack bot token (`xoxb-…`) for Web API calls.
    pub slack_api_token: String,
    /// Slack app-level token (`xapp-…`) for Socket Mode.
    pub slack_app_token: String,
    /// PagerDuty REST API token.
    pub pagerduty_api_token: String,
    /// Escalation policy ID scoping the on-call query.
    pub pagerduty_escalation_policy: String,
    /// Schedule ID scoping the on-call query.
    pub pagerduty_oncall_schedule: String,
    /// Human-readable name of the announcement channel.
    pub oncall_announce_channel: String,
    /// Fallback assignment used until the first successful fetch.
    pub default_oncall: Assignment,
    /// Command trigger character for chat queries.
    #[serde(default = "default_prefix")]
    pub prefix_char: String,
    /// Path of the persisted state file.
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Config {
    /// Load configuration from a YAML file. A missing or invalid file is
    /// fatal at startup.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&contents)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

/// Outbound proxy from `HTTPS_PROXY`, prefixing `http://` when the scheme
/// is absent.
pub fn proxy_from_env() -> Option<String> {
    let proxy = std::env::var("HTTPS_PROXY").ok()?;
    if proxy.is_empty() {
        return None;
    }
    if proxy.starts_with("http://") || proxy.starts_with("https://") {
        Some(proxy)
    } else {
        Some(format!("http://{proxy}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG_YAML: &str = r#"
slack_api_token: xoxb-test
slack_app_token: xapp-test
pagerduty_api_token: pd-test
pagerduty_escalation_policy: POLICY1
pagerduty_oncall_schedule: SCHED1
oncall_announce_channel: netops
default_oncall:
  email: fallback@example.com
  name: Fallback Engineer
"#;

    #[test]
    fn test_load_config() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG_YAML.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.slack_api_token, "xoxb-test");
        assert_eq!(config.oncall_announce_channel, "netops");
        assert_eq!(config.default_oncall.email, "fallback@example.com");
        // Defaults apply when keys are absent.
        assert_eq!(config.prefix_char, "!");
        assert_eq!(config.state_file, PathBuf::from("state.yml"));
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG_YAML.as_bytes()).unwrap();
        file.write_all(b"mystery_knob: 42\n").unwrap();

        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        assert!(Config::load(Path::new("/nonexistent/config.yml")).is_err());
    }
}
