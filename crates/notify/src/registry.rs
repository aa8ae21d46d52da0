//! Listener registry for notification fan-out.
//!
//! [`CallbackRegistry`] holds the ordered list of delivery callbacks.
//! Every inbound event is handed to every callback in registration order;
//! a panicking callback is isolated so the remaining callbacks still run.

use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use ladle_core::NotificationEvent;

type Entry = (CallbackId, Arc<dyn Fn(NotificationEvent) + Send + Sync>);

/// Handle returned by [`CallbackRegistry::register`], used to unregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Ordered list of notification listeners.
///
/// Thread-safe via an interior lock; the lock is held only while the list
/// is copied or mutated, never while callbacks run.
pub struct CallbackRegistry {
    entries: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Add a listener; it will be invoked after all earlier registrations.
    pub fn register(
        &self,
        callback: impl Fn(NotificationEvent) + Send + Sync + 'static,
    ) -> CallbackId {
        let id = CallbackId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock_entries().push((id, Arc::new(callback)));
        id
    }

    /// Remove a listener. Unknown ids are a no-op.
    pub fn unregister(&self, id: CallbackId) {
        self.lock_entries().retain(|(entry_id, _)| *entry_id != id);
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether no listeners are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Deliver one event to every listener in registration order.
    ///
    /// A panic inside a callback is caught and logged; delivery continues
    /// with the next listener.
    pub fn deliver(&self, event: &NotificationEvent) {
        let snapshot: Vec<_> = self.lock_entries().clone();
        for (id, callback) in snapshot {
            let result = std::panic::catch_unwind(AssertUnwindSafe(|| callback(event.clone())));
            if result.is_err() {
                tracing::error!(
                    callback_id = id.0,
                    event_id = %event.id,
                    "Notification callback panicked; continuing fan-out",
                );
            }
        }
    }

    /// Lock the entry list, recovering from a poisoned lock.
    ///
    /// Callbacks run outside the lock, so poisoning can only come from a
    /// panic during a trivial list operation; the list is still valid.
    fn lock_entries(&self) -> MutexGuard<'_, Vec<Entry>> {
        match self.entries.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for CallbackRegistry {
    fn default() -> Self {
        Self::new()
    }
}
