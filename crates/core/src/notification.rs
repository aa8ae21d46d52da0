//! Notification domain model.
//!
//! The backend delivers the same JSON shape over both the paginated REST
//! endpoints and the live WebSocket push, so a single [`NotificationEvent`]
//! struct covers both paths.

use serde::{Deserialize, Serialize};

/// Category tag carried by every notification.
///
/// The backend emits SCREAMING_SNAKE_CASE tags. Tags this client does not
/// recognize deserialize as [`Info`](NotificationType::Info) so that new
/// server-side types degrade to a generic entry instead of a parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// A recipe was submitted for moderation.
    RecipeSubmitted,
    /// A recipe passed moderation.
    RecipeApproved,
    /// A recipe was rejected by a moderator.
    RecipeRejected,
    /// A new user account was registered.
    UserRegistered,
    /// A comment was posted on a recipe.
    CommentAdded,
    /// Platform-level alert aimed at administrators.
    SystemAlert,
    /// Generic informational notification; also the catch-all for
    /// unrecognized tags.
    #[default]
    #[serde(other)]
    Info,
}

/// One moderation/activity notification.
///
/// `id` is server-assigned and required; a payload without it is malformed.
/// Every other field defaults when absent so partial payloads from older
/// backend versions still parse.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationEvent {
    /// Opaque server-assigned identifier, unique per notification.
    pub id: String,

    /// Short display title.
    #[serde(default)]
    pub title: String,

    /// Longer display text.
    #[serde(default)]
    pub message: String,

    /// Category tag driving the badge icon in the dashboard.
    #[serde(default)]
    pub notification_type: NotificationType,

    /// Pre-formatted display date (the backend owns the formatting).
    #[serde(default)]
    pub date: String,

    /// Pre-formatted display time.
    #[serde(default)]
    pub time: String,

    /// Whether the recipient has read this notification.
    #[serde(default)]
    pub read_status: bool,

    /// Whether the notification is hidden from the default feed.
    /// Dismissed is distinct from read: a dismissed notification may still
    /// be unread, but it never appears in the default feed or the badge.
    #[serde(default)]
    pub dismissed: bool,

    /// Target user, when the notification is addressed rather than broadcast.
    #[serde(default)]
    pub recipient_id: Option<String>,
}

impl NotificationEvent {
    /// Whether this notification counts toward the unread badge.
    pub fn counts_as_unread(&self) -> bool {
        !self.read_status && !self.dismissed
    }
}
