//! Slack Socket Mode connection.
//!
//! Owns the WebSocket delivering the inbound event stream. Envelopes are
//! ACKed before processing, pings are answered, and Slack's `disconnect`
//! control frame is treated as a graceful close so the supervisor can
//! reconnect.

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use crate::error::SlackError;

/// Socket Mode envelope received from Slack.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    /// Envelope ID, ACKed immediately on receipt.
    pub envelope_id: String,
    /// Envelope type: `"events_api"`, `"slash_commands"`, `"interactive"`.
    #[serde(rename = "type")]
    pub envelope_type: String,
    /// The wrapped payload.
    #[serde(default)]
    pub payload: Value,
}

/// ACK response sent back to Slack.
#[derive(Debug, Serialize)]
struct SocketAck {
    envelope_id: String,
}

/// An inbound event extracted from an `events_api` envelope.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// A channel message event.
    Message(MessageEvent),
    /// Any other event type (reactions, joins, app mentions, ...).
    Other { event_type: String },
}

/// The fields of a `message` event the bot cares about.
#[derive(Debug, Clone, Default)]
pub struct MessageEvent {
    /// Channel ID the message arrived on.
    pub channel: String,
    /// Sender's user ID.
    pub user: String,
    /// Message text.
    pub text: String,
    /// Present for system-generated variants (edits, joins, bot posts).
    pub subtype: Option<String>,
}

/// Extract an [`InboundEvent`] from an `events_api` envelope payload.
#[must_use]
pub fn event_from_payload(payload: &Value) -> Option<InboundEvent> {
    let event = payload.get("event")?;
    let event_type = event["type"].as_str()?;

    if event_type != "message" {
        return Some(InboundEvent::Other {
            event_type: event_type.to_string(),
        });
    }

    Some(InboundEvent::Message(MessageEvent {
        channel: event["channel"].as_str().unwrap_or_default().to_string(),
        user: event["user"].as_str().unwrap_or_default().to_string(),
        text: event["text"].as_str().unwrap_or_default().to_string(),
        subtype: event
            .get("subtype")
            .and_then(Value::as_str)
            .map(String::from),
    }))
}

/// What a single text frame amounted to.
enum Frame {
    /// An event worth handing to the listener.
    Event(InboundEvent),
    /// Slack asked us to drop the connection and reconnect.
    Disconnect,
    /// Hello, ACK-only, or otherwise uninteresting.
    Control,
}

/// A live Socket Mode connection.
pub struct SocketConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl SocketConnection {
    /// Connect to a Socket Mode WebSocket URL obtained from
    /// `apps.connections.open`.
    pub async fn connect(ws_url: &str) -> Result<Self, SlackError> {
        let (stream, _) = connect_async(ws_url)
            .await
            .map_err(|e| SlackError::WebSocket(e.to_string()))?;
        info!("connected to Slack Socket Mode");
        Ok(Self { stream })
    }

    /// Wait for the next inbound event.
    ///
    /// Returns `Ok(None)` when the connection closed or Slack requested a
    /// disconnect; the caller should reconnect. Control frames (hello,
    /// pings, non-events envelopes) are consumed internally.
    pub async fn next_event(&mut self) -> Result<Option<InboundEvent>, SlackError> {
        loop {
            let message = match self.stream.next().await {
                Some(Ok(message)) => message,
                Some(Err(e)) => return Err(SlackError::WebSocket(e.to_string())),
                None => {
                    info!("Slack WebSocket stream ended");
                    return Ok(None);
                }
            };

            match message {
                WsMessage::Text(text) => match self.handle_text(text.as_str()).await? {
                    Frame::Event(event) => return Ok(Some(event)),
                    Frame::Disconnect => return Ok(None),
                    Frame::Control => {}
                },
                WsMessage::Ping(data) => {
                    self.stream
                        .send(WsMessage::Pong(data))
                        .await
                        .map_err(|e| SlackError::WebSocket(e.to_string()))?;
                }
                WsMessage::Close(_) => {
                    info!("Slack WebSocket closed by server");
                    return Ok(None);
                }
                _ => {}
            }
        }
    }

    /// Handle one text frame: control messages, then envelope + ACK.
    async fn handle_text(&mut self, text: &str) -> Result<Frame, SlackError> {
        if let Ok(control) = serde_json::from_str::<Value>(text) {
            match control["type"].as_str() {
                Some("hello") => {
                    info!("received Socket Mode hello");
                    return Ok(Frame::Control);
                }
                Some("disconnect") => {
                    let reason = control["reason"].as_str().unwrap_or("unknown");
                    info!(reason = %reason, "Slack requested disconnect");
                    return Ok(Frame::Disconnect);
                }
                _ => {}
            }
        }

        let envelope: SocketEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                debug!(error = %e, "unparseable Socket Mode frame");
                return Ok(Frame::Control);
            }
        };

        self.ack(&envelope.envelope_id).await;

        if envelope.envelope_type != "events_api" {
            debug!(envelope_type = %envelope.envelope_type, "ignoring non-events_api envelope");
            return Ok(Frame::Control);
        }

        Ok(event_from_payload(&envelope.payload).map_or(Frame::Control, Frame::Event))
    }

    /// ACK an envelope (best-effort; a lost ACK only causes a redelivery).
    async fn ack(&mut self, envelope_id: &str) {
        let ack = SocketAck {
            envelope_id: envelope_id.to_string(),
        };
        match serde_json::to_string(&ack) {
            Ok(json) => {
                if let Err(e) = self.stream.send(WsMessage::Text(json.into())).await {
                    warn!(error = %e, "failed to send envelope ACK");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize envelope ACK"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_deserialize() {
        let raw = r#"{
            "envelope_id": "abc123",
            "type": "events_api",
            "payload": {"event": {"type": "message"}}
        }"#;
        let envelope: SocketEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(envelope.envelope_id, "abc123");
        assert_eq!(envelope.envelope_type, "events_api");
    }

    #[test]
    fn test_message_event_extraction() {
        let payload = json!({
            "event": {
                "type": "message",
                "channel": "C123",
                "user": "U456",
                "text": "!oncall",
            }
        });
        let Some(InboundEvent::Message(event)) = event_from_payload(&payload) else {
            panic!("expected a message event");
        };
        assert_eq!(event.channel, "C123");
        assert_eq!(event.user, "U456");
        assert_eq!(event.text, "!oncall");
        assert!(event.subtype.is_none());
    }

    #[test]
    fn test_subtype_is_preserved() {
        let payload = json!({
            "event": {
                "type": "message",
                "subtype": "message_changed",
                "channel": "C123",
            }
        });
        let Some(InboundEvent::Message(event)) = event_from_payload(&payload) else {
            panic!("expected a message event");
        };
        assert_eq!(event.subtype.as_deref(), Some("message_changed"));
    }

    #[test]
    fn test_non_message_event_is_other() {
        let payload = json!({
            "event": {"type": "reaction_added", "user": "U1"}
        });
        let Some(InboundEvent::Other { event_type }) = event_from_payload(&payload) else {
            panic!("expected an Other event");
        };
        assert_eq!(event_type, "reaction_added");
    }

    #[test]
    fn test_empty_payload_yields_nothing() {
        assert!(event_from_payload(&json!({})).is_none());
        assert!(event_from_payload(&json!({"event": {}})).is_none());
    }
}
