use super::FailureKind;
use core::time::Duration;

/// How often and how patiently the gateway retries transient failures.
///
/// Backoff is linear: the n-th retry of a given kind waits `n` times the base delay
/// for that kind, or whatever the server asked for via `Retry-After` if that is longer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of times a request is sent, including the first.
    pub max_attempts: u32,
    pub transport_backoff: Duration,
    pub server_backoff: Duration,
    pub throttle_backoff: Duration,

    /// Treat a plain HTTP 403 as "not accessible" instead of aborting the run.
    pub skip_forbidden: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            transport_backoff: Duration::from_secs(2),
            server_backoff: Duration::from_secs(5),
            throttle_backoff: Duration::from_secs(10),
            skip_forbidden: false,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries immediately, for tests and local endpoints.
    #[must_use]
    pub fn without_backoff(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            transport_backoff: Duration::ZERO,
            server_backoff: Duration::ZERO,
            throttle_backoff: Duration::ZERO,
            skip_forbidden: false,
        }
    }

    #[must_use]
    pub const fn is_retryable(kind: FailureKind) -> bool {
        matches!(kind, FailureKind::Transport | FailureKind::Server | FailureKind::Throttled)
    }

    /// Delay before sending again after failing attempt number `attempt` (1-based).
    #[must_use]
    pub fn delay_for(&self, kind: FailureKind, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let base = match kind {
            FailureKind::Transport => self.transport_backoff,
            FailureKind::Server => self.server_backoff,
            FailureKind::Throttled => self.throttle_backoff,
            _ => Duration::ZERO,
        };

        let scaled = base.saturating_mul(attempt.max(1));
        retry_after.map_or(scaled, |requested| requested.max(scaled))
    }

    /// Whether another attempt is allowed after `attempts` have been made.
    #[must_use]
    pub const fn allows_another(&self, attempts: u32) -> bool {
        let max = if self.max_attempts == 0 { 1 } else { self.max_attempts };
        attempts < max
    }
}
