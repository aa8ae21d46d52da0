//! Inbound frame processing loop.
//!
//! Reads raw frames from the notification WebSocket, parses each text
//! frame into a [`NotificationEvent`](ladle_core::NotificationEvent), and
//! fans it out through the [`CallbackRegistry`]. Malformed frames are
//! logged and dropped; they never reach a listener.

use futures::StreamExt;
use tokio_tungstenite::tungstenite::Message;

use crate::messages::parse_event;
use crate::registry::CallbackRegistry;

/// Process frames until the connection closes or errors.
///
/// Returns when the stream is exhausted; the caller decides whether a
/// reconnect follows.
pub async fn process_messages(
    ws_stream: &mut tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
    registry: &CallbackRegistry,
) {
    while let Some(frame_result) = ws_stream.next().await {
        match frame_result {
            Ok(Message::Text(text)) => {
                handle_text_frame(&text, registry);
            }
            Ok(Message::Binary(_)) => {
                tracing::trace!("Ignoring binary frame on notification stream");
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                // Handled automatically by tungstenite.
            }
            Ok(Message::Close(frame)) => {
                tracing::info!(?frame, "Notification stream closed by server");
                break;
            }
            Ok(Message::Frame(_)) => {}
            Err(e) => {
                tracing::error!(error = %e, "Notification stream receive error");
                break;
            }
        }
    }
}

/// Parse one text frame and fan it out; drop it when malformed.
fn handle_text_frame(text: &str, registry: &CallbackRegistry) {
    match parse_event(text) {
        Ok(event) => {
            tracing::debug!(
                id = %event.id,
                notification_type = ?event.notification_type,
                read_status = event.read_status,
                dismissed = event.dismissed,
                "Notification received",
            );
            registry.deliver(&event);
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                raw_frame = %text,
                "Dropping malformed notification frame",
            );
        }
    }
}
