//! # Reconnect Policy
//!
//! Connection states of the live feed and the bounded exponential backoff that
//! drives the transitions between them.
//!
//! ```text
//! Idle -> Connecting -> Open -> Closed -> Connecting ... (attempts remain)
//!                                      -> Exhausted     (cap reached)
//! ```

use std::fmt;
use std::time::Duration;

/// Lifecycle of a live feed connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No connection and nothing scheduled. Initial state, and the state after `disconnect()`.
    Idle,
    /// A transport handshake is in flight.
    Connecting,
    /// The transport is open and messages are being dispatched.
    Open,
    /// The transport closed unexpectedly; a reconnect is scheduled.
    Closed,
    /// The reconnect budget is spent. Nothing happens until `connect()` is called again.
    Exhausted,
}

impl ConnectionState {
    /// True while a supervisor is working on (or holding) a connection.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open | Self::Closed)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Exhausted => "exhausted",
        };
        f.write_str(name)
    }
}

/// Smallest base delay the backoff will use.
pub const MIN_BASE_DELAY: Duration = Duration::from_millis(1);

/// Delay seed and attempt cap for reconnects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect; doubles per consecutive failure.
    pub base_delay: Duration,
    /// Number of reconnects allowed before giving up.
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    /// `base_delay * 2^attempt`, saturating. A zero base counts as one millisecond.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .max(MIN_BASE_DELAY)
            .saturating_mul(2u32.saturating_pow(attempt))
    }

    pub fn backoff(&self) -> Backoff {
        Backoff::new(*self)
    }
}

/// Tracks consecutive failures against a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    failures: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, failures: 0 }
    }

    /// Consumes one attempt and returns how long to wait before it, or `None`
    /// once the cap is reached.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.failures >= self.policy.max_attempts {
            return None;
        }
        let delay = self.policy.delay_for(self.failures);
        self.failures += 1;
        Some(delay)
    }

    /// Called on every successful open.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.failures
    }

    pub fn is_exhausted(&self) -> bool {
        self.failures >= self.policy.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_from_the_base() {
        let mut backoff = ReconnectPolicy::default().backoff();
        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay())
            .map(|d| d.as_secs())
            .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn delays_are_strictly_increasing_for_any_base() {
        let policy = ReconnectPolicy {
            base_delay: Duration::from_millis(7),
            max_attempts: 5,
        };
        let mut backoff = policy.backoff();
        let mut last = Duration::ZERO;
        while let Some(delay) = backoff.next_delay() {
            assert!(delay > last);
            last = delay;
        }
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn zero_base_still_backs_off() {
        let policy = ReconnectPolicy {
            base_delay: Duration::ZERO,
            max_attempts: 5,
        };
        let delays: Vec<u128> = std::iter::from_fn({
            let mut backoff = policy.backoff();
            move || backoff.next_delay()
        })
        .map(|d| d.as_millis())
        .collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn reset_restores_the_full_budget() {
        let mut backoff = ReconnectPolicy::default().backoff();
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.attempts(), 0);
        assert_eq!(backoff.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn zero_attempts_never_reconnects() {
        let mut backoff = ReconnectPolicy {
            base_delay: Duration::from_secs(1),
            max_attempts: 0,
        }
        .backoff();
        assert_eq!(backoff.next_delay(), None);
    }

    #[test]
    fn huge_attempt_numbers_saturate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.delay_for(64), Duration::from_secs(1).saturating_mul(u32::MAX));
    }

    #[test]
    fn live_states() {
        assert!(!ConnectionState::Idle.is_live());
        assert!(ConnectionState::Connecting.is_live());
        assert!(ConnectionState::Open.is_live());
        assert!(ConnectionState::Closed.is_live());
        assert!(!ConnectionState::Exhausted.is_live());
        assert_eq!(ConnectionState::Exhausted.to_string(), "exhausted");
    }
}
