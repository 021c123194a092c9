//! On-call announcement bot.
//!
//! Polls PagerDuty for the current on-call engineer, announces changes to
//! a Slack channel, and answers `!oncall` queries over Slack Socket Mode.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use pagerduty::PagerDutyClient;
use slack::SlackClient;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod context;
mod listener;
mod notify;
mod reconcile;
mod state;
mod supervisor;
#[cfg(test)]
mod testutil;

use config::Config;
use context::AppContext;
use state::PersistedState;
use supervisor::Supervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oncall_bot=info,info")),
        )
        .init();

    let config = Config::load(Path::new(config::DEFAULT_CONFIG_FILE))?;
    let proxy = config::proxy_from_env();
    if let Some(proxy) = &proxy {
        info!(proxy = %proxy, "routing HTTP through proxy");
    }

    let state = PersistedState::load(&config.state_file);
    info!(current_oncall = %state.current_oncall, state_file = %config.state_file.display(), "loaded persisted state");

    let slack = Arc::new(
        SlackClient::new(&config.slack_api_token, proxy.as_deref())
            .context("failed to build Slack client")?,
    );
    let pagerduty = Arc::new(
        PagerDutyClient::new(
            &config.pagerduty_api_token,
            &config.pagerduty_escalation_policy,
            &config.pagerduty_oncall_schedule,
            proxy.as_deref(),
        )
        .context("failed to build PagerDuty client")?,
    );

    let ctx = Arc::new(AppContext::new(config, state));
    Supervisor::new(ctx, slack, pagerduty).run().await
}
