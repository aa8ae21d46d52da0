//! Notification transport and REST client for the Ladle admin dashboard.
//!
//! Provides the REST wrapper for the notification endpoints, the
//! WebSocket client for the live notification stream, callback fan-out
//! with per-callback isolation, and the bounded reconnection logic that
//! keeps the stream alive across connection drops.

pub mod api;
pub mod client;
pub mod messages;
pub mod processor;
pub mod reconnect;
pub mod registry;
pub mod transport;

pub use api::{NotificationsApi, NotificationsApiError};
pub use reconnect::ReconnectPolicy;
pub use registry::{CallbackId, CallbackRegistry};
pub use transport::{
    start_health_check, ConnectionState, NotificationTransport, TransportConfig,
};
