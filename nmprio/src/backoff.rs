//! Backoff applied while no candidate networks are visible.

use std::time::Duration;

use crate::models::BackoffPolicy;

/// Extra delay slept on cycles that find no candidate networks.
///
/// The value starts at zero, jumps to `policy.initial` on the first empty
/// cycle, then grows geometrically by `policy.factor` up to `policy.max`.
/// Any cycle with at least one candidate resets it to zero.
///
/// `Backoff` is a plain value: the poll loop passes it into each cycle and
/// keeps the one handed back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    current: Duration,
    policy: BackoffPolicy,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: Duration::ZERO,
            policy,
        }
    }

    /// The delay to sleep on the current empty cycle.
    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn policy(&self) -> BackoffPolicy {
        self.policy
    }

    /// Back to zero after a cycle that saw candidates.
    #[must_use]
    pub fn reset(self) -> Self {
        Self {
            current: Duration::ZERO,
            ..self
        }
    }

    /// The delay for the next empty cycle.
    #[must_use]
    pub fn grow(self) -> Self {
        let next = if self.current.is_zero() {
            self.policy.initial
        } else {
            let millis = self.current.as_millis() as f64 * self.policy.factor;
            Duration::from_millis(millis.round() as u64)
        };
        Self {
            current: next.min(self.policy.max),
            ..self
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::default())
    }
}
