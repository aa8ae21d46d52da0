//! Wire frames for the live notification stream.
//!
//! Outbound: JSON subscribe frames, sent once per connection for the
//! broadcast topic and the per-user queue. Inbound: every text frame is a
//! JSON-encoded [`NotificationEvent`]; frames without a usable id are
//! malformed and must be dropped by the caller, never forwarded.

use ladle_core::NotificationEvent;
use serde::Serialize;

/// Broadcast topic every client subscribes to.
pub const TOPIC_BROADCAST: &str = "/topic/notifications";

/// Per-recipient private queue.
pub const QUEUE_USER: &str = "/user/queue/notifications";

/// Outbound subscription frame.
#[derive(Debug, Serialize)]
pub struct SubscribeFrame<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    destination: &'a str,
}

impl<'a> SubscribeFrame<'a> {
    /// Build a subscribe frame for the given destination.
    pub fn new(destination: &'a str) -> Self {
        Self {
            kind: "subscribe",
            destination,
        }
    }
}

/// Why an inbound frame was rejected.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The frame body was not valid notification JSON.
    #[error("invalid notification frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame parsed but carries no server-assigned id.
    #[error("notification frame has an empty id")]
    EmptyId,
}

/// Parse an inbound text frame into a [`NotificationEvent`].
///
/// Returns `Err` for malformed JSON, a missing `id` field, or an empty
/// id string. Callers log the error and drop the frame.
pub fn parse_event(text: &str) -> Result<NotificationEvent, ParseError> {
    let event: NotificationEvent = serde_json::from_str(text)?;
    if event.id.trim().is_empty() {
        return Err(ParseError::EmptyId);
    }
    Ok(event)
}
