//! WebSocket client for the live notification stream.
//!
//! [`WsClient`] holds the connection target. Call [`WsClient::connect`]
//! to perform the handshake and the channel subscriptions, yielding a
//! live [`WsConnection`].

use futures::SinkExt;
use ladle_core::Timestamp;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream};

use crate::messages::{SubscribeFrame, QUEUE_USER, TOPIC_BROADCAST};

/// Configuration handle for the notification stream endpoint.
pub struct WsClient {
    ws_url: String,
}

/// A live, subscribed WebSocket connection.
pub struct WsConnection {
    /// Unique session id sent during the handshake.
    pub session_id: String,
    /// When the connection was established (UTC).
    pub connected_at: Timestamp,
    /// The raw WebSocket stream for reading frames.
    pub ws_stream: tokio_tungstenite::WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>,
}

/// Errors that can occur when establishing the notification stream.
#[derive(Debug, thiserror::Error)]
pub enum WsClientError {
    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A protocol-level error on an already-established connection.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl WsClient {
    /// Create a new client targeting a backend instance.
    ///
    /// * `ws_url` - WebSocket base URL, e.g. `ws://host:8080`; the client
    ///   appends `/ws` and a session id.
    pub fn new(ws_url: String) -> Self {
        Self { ws_url }
    }

    /// WebSocket base URL.
    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    /// Connect to the notification stream.
    ///
    /// Performs the handshake with the bearer credential, then subscribes
    /// to the broadcast topic and the per-user queue. The server routes
    /// private notifications by the authenticated principal, so no user id
    /// appears in the URL.
    pub async fn connect(&self, token: &str) -> Result<WsConnection, WsClientError> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let url = format!("{}/ws?session={}", self.ws_url, session_id);

        let mut request = url
            .into_client_request()
            .map_err(|e| WsClientError::Connection(format!("Invalid WebSocket URL: {e}")))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| WsClientError::Connection(format!("Invalid auth credential: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);

        let (mut ws_stream, _response) = connect_async(request).await.map_err(|e| {
            WsClientError::Connection(format!(
                "Failed to connect to notification stream at {}: {e}",
                self.ws_url
            ))
        })?;

        // Subscribe to both logical channels before handing the stream out.
        for destination in [TOPIC_BROADCAST, QUEUE_USER] {
            let frame = serde_json::to_string(&SubscribeFrame::new(destination))
                .map_err(|e| WsClientError::Protocol(format!("Subscribe frame encode: {e}")))?;
            ws_stream
                .send(Message::Text(frame))
                .await
                .map_err(|e| WsClientError::Protocol(format!("Subscribe send failed: {e}")))?;
        }

        tracing::info!(
            session_id = %session_id,
            "Connected to notification stream at {}",
            self.ws_url,
        );

        Ok(WsConnection {
            session_id,
            connected_at: chrono::Utc::now(),
            ws_stream,
        })
    }
}
