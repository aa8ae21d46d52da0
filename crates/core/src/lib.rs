//! Shared domain types and configuration for the Ladle admin services.
//!
//! Everything here is plain data: the notification model exchanged with
//! the backend, the pagination envelope, and the environment-driven
//! configuration the binaries load at startup.

pub mod config;
pub mod notification;
pub mod page;
pub mod types;

pub use config::AdminConfig;
pub use notification::{NotificationEvent, NotificationType};
pub use page::Page;
pub use types::Timestamp;
