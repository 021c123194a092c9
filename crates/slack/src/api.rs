//! Slack Web API client.
//!
//! Thin request/response wrapper over the handful of methods the bot
//! needs: `auth.test`, `chat.postMessage`, `conversations.list`, and
//! `apps.connections.open`.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::error::SlackError;

/// Slack Web API base URL.
const API_BASE_URL: &str = "https://slack.com/api";

/// Default timeout for API requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Page size for `conversations.list`.
const CHANNEL_PAGE_LIMIT: &str = "200";

/// A message attachment, in Slack's legacy attachment format.
#[derive(Debug, Clone, Serialize)]
pub struct Attachment {
    pub color: String,
    pub pretext: String,
    pub title: String,
    pub title_link: String,
    pub fields: Vec<AttachmentField>,
    pub thumb_url: String,
    pub footer: String,
}

/// A short titled field inside an [`Attachment`].
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

impl AttachmentField {
    #[must_use]
    pub fn short(title: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short: true,
        }
    }
}

/// Slack Web API client.
#[derive(Clone)]
pub struct SlackClient {
    /// HTTP client.
    http: reqwest::Client,
    /// Bot token (`xoxb-…`) for Web API calls.
    bot_token: String,
    /// API base URL (overridable for tests).
    base_url: String,
}

impl SlackClient {
    /// Create a new client.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built (for example,
    /// an invalid proxy URL).
    pub fn new(bot_token: impl Into<String>, proxy: Option<&str>) -> Result<Self, SlackError> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            bot_token: bot_token.into(),
            base_url: API_BASE_URL.to_string(),
        })
    }

    /// Override the API base URL. Used by tests against a local server.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Call `auth.test` to resolve the bot's own user ID.
    pub async fn auth_test(&self) -> Result<String, SlackError> {
        let body = self.call("auth.test", &self.bot_token, None).await?;
        body["user_id"]
            .as_str()
            .map(String::from)
            .ok_or_else(|| SlackError::Malformed("no user_id in auth.test response".to_string()))
    }

    /// Call `apps.connections.open` with an app-level token to obtain a
    /// Socket Mode WebSocket URL.
    pub async fn connections_open(&self, app_token: &str) -> Result<String, SlackError> {
        let body = self.call("apps.connections.open", app_token, None).await?;
        body["url"].as_str().map(String::from).ok_or_else(|| {
            SlackError::Malformed("no url in apps.connections.open response".to_string())
        })
    }

    /// Post a message to a channel, optionally with attachments.
    pub async fn post_message(
        &self,
        channel_id: &str,
        text: Option<&str>,
        attachments: &[Attachment],
    ) -> Result<(), SlackError> {
        let mut payload = json!({ "channel": channel_id });
        if let Some(text) = text {
            payload["text"] = json!(text);
        }
        if !attachments.is_empty() {
            payload["attachments"] = serde_json::to_value(attachments)?;
        }

        debug!(channel = %channel_id, "posting message");
        self.call("chat.postMessage", &self.bot_token, Some(payload))
            .await?;
        Ok(())
    }

    /// Build the channel directory: human-readable name to channel ID,
    /// following `conversations.list` pagination to exhaustion.
    pub async fn channel_directory(&self) -> Result<HashMap<String, String>, SlackError> {
        let mut directory = HashMap::new();
        let mut cursor = String::new();

        loop {
            let mut payload = json!({
                "limit": CHANNEL_PAGE_LIMIT,
                "exclude_archived": true,
            });
            if !cursor.is_empty() {
                payload["cursor"] = json!(cursor);
            }

            let body = self
                .call("conversations.list", &self.bot_token, Some(payload))
                .await?;

            if let Some(channels) = body["channels"].as_array() {
                for channel in channels {
                    if let (Some(name), Some(id)) =
                        (channel["name"].as_str(), channel["id"].as_str())
                    {
                        directory.insert(name.to_string(), id.to_string());
                    }
                }
            }

            cursor = body["response_metadata"]["next_cursor"]
                .as_str()
                .unwrap_or("")
                .to_string();
            if cursor.is_empty() {
                break;
            }
        }

        debug!(channels = directory.len(), "refreshed channel directory");
        Ok(directory)
    }

    /// POST a Web API method and check the `ok` field.
    async fn call(
        &self,
        api_method: &str,
        token: &str,
        payload: Option<Value>,
    ) -> Result<Value, SlackError> {
        let url = format!("{}/{api_method}", self.base_url);
        let mut request = self.http.post(&url).bearer_auth(token);
        if let Some(payload) = payload {
            request = request.json(&payload);
        }

        let body: Value = request.send().await?.json().await?;
        if body["ok"].as_bool() == Some(true) {
            Ok(body)
        } else {
            let code = body["error"].as_str().unwrap_or("unknown").to_string();
            warn!(api_method = %api_method, error = %code, "Slack API call failed");
            Err(SlackError::Api(code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> SlackClient {
        SlackClient::new("xoxb-test", None)
            .unwrap()
            .with_base_url(base_url)
    }

    #[tokio::test]
    async fn test_auth_test_resolves_user_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "user_id": "BOT123",
            })))
            .mount(&server)
            .await;

        let user_id = client(&server.uri()).auth_test().await.unwrap();
        assert_eq!(user_id, "BOT123");
    }

    #[tokio::test]
    async fn test_auth_test_invalid_auth_is_fatal_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth.test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "invalid_auth",
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).auth_test().await.unwrap_err();
        assert!(matches!(&err, SlackError::Api(code) if code == "invalid_auth"));
        assert!(err.is_fatal());
    }

    #[tokio::test]
    async fn test_post_message_sends_attachments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .and(body_partial_json(serde_json::json!({
                "channel": "C123",
                "attachments": [{"title": "Jane Doe"}],
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let attachment = Attachment {
            color: "#36a64f".to_string(),
            pretext: "The current oncall engineer is:".to_string(),
            title: "Jane Doe".to_string(),
            title_link: "https://example.pagerduty.com/users/P1".to_string(),
            fields: vec![AttachmentField::short("Email", "jane@example.com")],
            thumb_url: String::new(),
            footer: "Oncall from a to b.".to_string(),
        };

        client(&server.uri())
            .post_message("C123", None, &[attachment])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_post_message_not_ok_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat.postMessage"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": false,
                "error": "channel_not_found",
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri())
            .post_message("C404", Some("hi"), &[])
            .await
            .unwrap_err();
        assert!(matches!(&err, SlackError::Api(code) if code == "channel_not_found"));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_channel_directory_follows_pagination() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/conversations.list"))
            .and(body_partial_json(serde_json::json!({"cursor": "page2"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channels": [{"id": "C2", "name": "netops"}],
                "response_metadata": {"next_cursor": ""},
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/conversations.list"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "channels": [{"id": "C1", "name": "general"}],
                "response_metadata": {"next_cursor": "page2"},
            })))
            .mount(&server)
            .await;

        let directory = client(&server.uri()).channel_directory().await.unwrap();
        assert_eq!(directory.get("general"), Some(&"C1".to_string()));
        assert_eq!(directory.get("netops"), Some(&"C2".to_string()));
    }
}
