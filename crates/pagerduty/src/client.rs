//! PagerDuty API client implementation.
//!
//! API Documentation: <https://developer.pagerduty.com/api-reference/>

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::assignment::Assignment;

/// Base URL for the PagerDuty REST API.
const API_BASE_URL: &str = "https://api.pagerduty.com";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur when fetching the on-call assignment.
///
/// All variants are non-fatal to the caller: the previous assignment is
/// retained and the next scheduled tick retries.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The API request timed out.
    #[error("PagerDuty API timed out")]
    Timeout,

    /// Transport-level connection failure.
    #[error("PagerDuty API failed to connect: {0}")]
    ConnectionFailed(String),

    /// Any other response or parse error.
    #[error("unexpected PagerDuty response: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::ConnectionFailed(err.to_string())
        } else {
            Self::Unexpected(err.to_string())
        }
    }
}

/// Client for the PagerDuty `oncalls` endpoint, scoped to one escalation
/// policy and one schedule.
#[derive(Clone)]
pub struct PagerDutyClient {
    /// HTTP client.
    client: reqwest::Client,
    /// API token for authentication.
    api_token: String,
    /// Escalation policy ID filter.
    escalation_policy: String,
    /// Schedule ID filter.
    schedule: String,
    /// API base URL (overridable for tests).
    base_url: String,
}

impl PagerDutyClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns `FetchError::Unexpected` if the HTTP client cannot be built
    /// (for example, an invalid proxy URL).
    pub fn new(
        api_token: impl Into<String>,
        escalation_policy: impl Into<String>,
        schedule: impl Into<String>,
        proxy: Option<&str>,
    ) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(
            DEFAULT_TIMEOUT_SECS,
        ));
        if let Some(proxy) = proxy {
            builder = builder.proxy(
                reqwest::Proxy::all(proxy)
                    .map_err(|e| FetchError::Unexpected(format!("invalid proxy: {e}")))?,
            );
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            api_token: api_token.into(),
            escalation_policy: escalation_policy.into(),
            schedule: schedule.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL. Used by tests against a local server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the current on-call assignment.
    ///
    /// Issues a bounded-timeout GET to `/oncalls` filtered by the
    /// configured escalation policy and schedule, and normalizes the first
    /// returned entry.
    ///
    /// # Errors
    /// See [`FetchError`].
    pub async fn current_oncall(&self) -> Result<Assignment, FetchError> {
        let url = format!("{}/oncalls", self.base_url);
        debug!(url = %url, "fetching on-call assignment");

        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Token token={}", self.api_token))
            .header(
                "Content-Type",
                "application/vnd.pagerduty+json;version=2",
            )
            .query(&[
                ("time_zone", "UTC"),
                ("include[]", "users"),
                ("escalation_policy_ids[]", self.escalation_policy.as_str()),
                ("schedule_ids[]", self.schedule.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(FetchError::Unexpected(format!(
                "status {status}: {text}"
            )));
        }

        let decoded: OncallsResponse = serde_json::from_str(&text).map_err(|e| {
            warn!(error = %e, "failed to parse oncalls response");
            FetchError::Unexpected(format!("invalid oncalls payload: {e}"))
        })?;

        let entry = decoded
            .oncalls
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::Unexpected("empty oncalls list".to_string()))?;

        Ok(entry.into_assignment())
    }
}

#[derive(Debug, Deserialize)]
struct OncallsResponse {
    oncalls: Vec<OncallEntry>,
}

#[derive(Debug, Deserialize)]
struct OncallEntry {
    user: OncallUser,
    #[serde(default)]
    start: String,
    #[serde(default)]
    end: String,
}

#[derive(Debug, Deserialize)]
struct OncallUser {
    #[serde(default)]
    id: String,
    email: String,
    name: String,
    #[serde(default)]
    avatar_url: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    description: Option<String>,
}

impl OncallEntry {
    fn into_assignment(self) -> Assignment {
        let mut assignment = Assignment {
            id: self.user.id,
            email: self.user.email,
            name: self.user.name,
            avatar_url: self.user.avatar_url,
            html_url: self.user.html_url,
            irc_nick: String::new(),
            slack_nick: String::new(),
            start: self.start,
            end: self.end,
        };
        assignment.derive_handles(self.user.description.as_deref());
        assignment
    }
}
