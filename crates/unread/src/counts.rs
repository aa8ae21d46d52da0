//! Shared unread-count aggregation.
//!
//! [`UnreadCounts`] owns the badge value every screen displays. The count
//! is mutated only here: the initial page-0 snapshot, the live-push
//! increment, and the centralized mark-read/dismiss/delete mutators that
//! mirror each change to the backend before touching the count.

use std::sync::{Arc, Mutex, MutexGuard, Weak};

use ladle_core::{NotificationEvent, Page};
use ladle_notify::{CallbackId, NotificationTransport, NotificationsApi};
use tokio::sync::watch;

/// Process-wide unread badge, shared as `Arc<UnreadCounts>`.
///
/// The initial value is a best-effort snapshot of page 0: unread items
/// beyond the first page are under-reported until live events correct
/// the count.
pub struct UnreadCounts {
    api: Arc<NotificationsApi>,
    transport: Arc<NotificationTransport>,
    count_tx: watch::Sender<u64>,
    /// Live-pushed events that arrived already dismissed; kept out of the
    /// badge but available to the dismissed-feed screen.
    dismissed: Mutex<Vec<NotificationEvent>>,
    callback_id: Mutex<Option<CallbackId>>,
}

impl UnreadCounts {
    /// Snapshot page 0, register with the transport, and connect.
    ///
    /// A failed snapshot degrades to an empty page (the badge starts at
    /// zero) and a not-yet-ready transport is tolerated; the health
    /// check brings the stream up later. Neither failure is propagated.
    pub async fn start(
        api: Arc<NotificationsApi>,
        transport: Arc<NotificationTransport>,
        page_size: u32,
    ) -> Arc<Self> {
        let page = match api.list(0, page_size).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Initial notification fetch failed; starting the badge at zero",
                );
                Page::empty(0, page_size)
            }
        };

        let initial = page
            .content
            .iter()
            .filter(|n| n.counts_as_unread())
            .count() as u64;
        let (count_tx, _) = watch::channel(initial);

        let this = Arc::new(Self {
            api,
            transport: Arc::clone(&transport),
            count_tx,
            dismissed: Mutex::new(Vec::new()),
            callback_id: Mutex::new(None),
        });

        // The callback holds a Weak so events delivered after teardown are
        // ignored rather than keeping the counter alive.
        let weak: Weak<Self> = Arc::downgrade(&this);
        let id = transport.register_callback(move |event| {
            if let Some(counts) = weak.upgrade() {
                counts.add_notification(&event);
            }
        });
        *lock(&this.callback_id) = Some(id);

        tracing::info!(
            unread = initial,
            sampled = page.content.len(),
            "Unread badge initialized from page 0",
        );

        if !this.transport.connect().await {
            tracing::warn!(
                "Notification transport not ready; badge updates resume once the stream recovers",
            );
        }

        this
    }

    /// Current badge value.
    pub fn count(&self) -> u64 {
        *self.count_tx.borrow()
    }

    /// Watch the badge value; the consumption hook for screens.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.count_tx.subscribe()
    }

    /// Snapshot of live-pushed events that arrived already dismissed.
    pub fn dismissed(&self) -> Vec<NotificationEvent> {
        lock(&self.dismissed).clone()
    }

    /// Account for a newly learned event.
    ///
    /// This is the push-side entry point, used by the transport callback
    /// and by screens that learn of a new event through another channel.
    /// Dismissed events go to the dismissed bucket and never touch the
    /// count; unread visible events increment it by one.
    pub fn add_notification(&self, event: &NotificationEvent) {
        if event.dismissed {
            tracing::debug!(id = %event.id, "Dismissed notification routed to the dismissed bucket");
            lock(&self.dismissed).push(event.clone());
            return;
        }
        if !event.read_status {
            self.count_tx.send_modify(|count| *count += 1);
        }
    }

    /// Mark one notification read on the backend and decrement the badge
    /// when the event was unread and visible. Returns `false` on failure
    /// (the count is left untouched) so screens can surface an alert.
    pub async fn mark_read(&self, event: &NotificationEvent) -> bool {
        match self.api.mark_read(&event.id).await {
            Ok(()) => {
                if event.counts_as_unread() {
                    self.decrement();
                }
                true
            }
            Err(e) => {
                tracing::warn!(id = %event.id, error = %e, "Failed to mark notification read");
                false
            }
        }
    }

    /// Mark everything read on the backend and reset the badge to zero.
    pub async fn mark_all_read(&self) -> bool {
        match self.api.mark_all_read().await {
            Ok(()) => {
                self.count_tx.send_replace(0);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to mark all notifications read");
                false
            }
        }
    }

    /// Hide one notification from the default feed, moving it to the
    /// dismissed bucket and decrementing the badge when it was unread.
    pub async fn dismiss(&self, event: &NotificationEvent) -> bool {
        match self.api.dismiss(&event.id).await {
            Ok(()) => {
                if event.counts_as_unread() {
                    self.decrement();
                }
                let mut hidden = event.clone();
                hidden.dismissed = true;
                lock(&self.dismissed).push(hidden);
                true
            }
            Err(e) => {
                tracing::warn!(id = %event.id, error = %e, "Failed to dismiss notification");
                false
            }
        }
    }

    /// Restore a dismissed notification to the default feed. An unread
    /// event rejoins the badge it was excluded from while hidden.
    pub async fn unhide(&self, event: &NotificationEvent) -> bool {
        match self.api.unhide(&event.id).await {
            Ok(()) => {
                lock(&self.dismissed).retain(|n| n.id != event.id);
                if !event.read_status {
                    self.count_tx.send_modify(|count| *count += 1);
                }
                true
            }
            Err(e) => {
                tracing::warn!(id = %event.id, error = %e, "Failed to unhide notification");
                false
            }
        }
    }

    /// Hard-delete one notification, decrementing the badge when it was
    /// unread and visible.
    pub async fn delete(&self, event: &NotificationEvent) -> bool {
        match self.api.delete(&event.id).await {
            Ok(()) => {
                if event.counts_as_unread() {
                    self.decrement();
                }
                lock(&self.dismissed).retain(|n| n.id != event.id);
                true
            }
            Err(e) => {
                tracing::warn!(id = %event.id, error = %e, "Failed to delete notification");
                false
            }
        }
    }

    /// Detach from the transport.
    ///
    /// Idempotent; the transport is left connected, other consumers may
    /// still depend on the stream.
    pub fn shutdown(&self) {
        if let Some(id) = lock(&self.callback_id).take() {
            self.transport.unregister_callback(id);
            tracing::debug!("Unread counter detached from the notification transport");
        }
    }

    /// Decrement the badge, clamped at zero.
    fn decrement(&self) {
        self.count_tx
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

impl Drop for UnreadCounts {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Lock a mutex, recovering from poisoning; the guarded data stays valid
/// because no callback runs under these locks.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
