//! Fixed-delay, bounded reconnection policy for the notification stream.
//!
//! When the connection drops, the transport retries after a fixed delay,
//! up to a maximum number of consecutive automatic attempts. A successful
//! connection or a manual [`connect`](crate::NotificationTransport::connect)
//! resets the budget; exhaustion stops every automatic path until then.

use std::time::Duration;

/// Tunable parameters for automatic reconnection.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Fixed pause before each automatic attempt.
    pub delay: Duration,
    /// Maximum consecutive automatic attempts before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(2),
            max_attempts: 10,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before the next automatic attempt, given how many have already
    /// been made since the last reset. `None` once the budget is spent.
    pub fn next_attempt(&self, attempts_so_far: u32) -> Option<Duration> {
        (attempts_so_far < self.max_attempts).then_some(self.delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_attempts_up_to_the_maximum() {
        let policy = ReconnectPolicy::default();
        for attempts in 0..policy.max_attempts {
            assert_eq!(policy.next_attempt(attempts), Some(policy.delay));
        }
    }

    #[test]
    fn exhausted_budget_yields_none() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.next_attempt(policy.max_attempts), None);
        assert_eq!(policy.next_attempt(policy.max_attempts + 5), None);
    }

    #[test]
    fn delay_is_fixed_across_attempts() {
        let policy = ReconnectPolicy {
            delay: Duration::from_millis(2000),
            max_attempts: 10,
        };
        assert_eq!(policy.next_attempt(0), policy.next_attempt(9));
    }

    #[test]
    fn zero_budget_never_retries() {
        let policy = ReconnectPolicy {
            delay: Duration::from_secs(2),
            max_attempts: 0,
        };
        assert_eq!(policy.next_attempt(0), None);
    }
}
