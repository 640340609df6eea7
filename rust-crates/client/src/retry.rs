use std::time::Duration;
use tokio::time::{
    Instant,
    sleep,
};

pub const INDEX_LOOKUP_ATTEMPTS: u32 = 5;
pub const INDEX_LOOKUP_DELAY: Duration = Duration::from_millis(1_500);
pub const INDEX_LOOKUP_MAX_DELAY: Duration = Duration::from_secs(12);

/// Bounds for polling something the chain has not indexed yet.
///
/// The loop ends at whichever comes first: `max_attempts` lookups, or the next
/// wait would run past `deadline` (measured from the first attempt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub multiplier: u32,
    pub max_delay: Duration,
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fixed(INDEX_LOOKUP_ATTEMPTS, INDEX_LOOKUP_DELAY)
    }
}

/// What a bounded poll ended with.
#[derive(Debug)]
pub struct Polled<T> {
    pub value: Option<T>,
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_delay: delay,
            multiplier: 1,
            max_delay: delay,
            deadline: None,
        }
    }

    /// Doubling delays from `initial_delay` up to `max_delay`, within a wall-clock budget.
    pub fn backoff(initial_delay: Duration, max_delay: Duration, deadline: Duration) -> Self {
        Self {
            max_attempts: u32::MAX,
            initial_delay,
            multiplier: 2,
            max_delay,
            deadline: Some(deadline),
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Index lookup policy from user overrides. A deadline switches to backoff;
    /// without one the fixed 1.5 s cadence stays.
    pub fn index_lookup(max_attempts: Option<u32>, deadline: Option<Duration>) -> Self {
        let policy = match deadline {
            Some(deadline) => Self::backoff(INDEX_LOOKUP_DELAY, INDEX_LOOKUP_MAX_DELAY, deadline),
            None => Self::default(),
        };
        match max_attempts {
            Some(max_attempts) => policy.with_max_attempts(max_attempts),
            None => policy,
        }
    }

    /// Wait after the `attempt`-th failed lookup (1-based).
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = self
            .multiplier
            .max(1)
            .saturating_pow(attempt.saturating_sub(1));
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }

    /// Runs `lookup` until it yields a value or the policy is exhausted. A failed
    /// lookup counts as an attempt and is logged, never returned.
    pub async fn poll<T, F, Fut>(&self, label: &str, mut lookup: F) -> Polled<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = anyhow::Result<Option<T>>>,
    {
        let started = Instant::now();
        let mut attempts = 0;
        while attempts < self.max_attempts {
            attempts += 1;
            match lookup(attempts).await {
                Ok(Some(value)) => {
                    return Polled {
                        value: Some(value),
                        attempts,
                    };
                }
                Ok(None) => {
                    tracing::debug!(%label, attempt = attempts, "not indexed yet");
                }
                Err(e) => {
                    tracing::warn!(%label, attempt = attempts, "lookup failed: {e:#}");
                }
            }
            if attempts == self.max_attempts {
                break;
            }
            let delay = self.delay_after(attempts);
            let past_deadline = self
                .deadline
                .is_some_and(|deadline| started.elapsed() + delay > deadline);
            if past_deadline {
                tracing::warn!(%label, attempts, "retry deadline reached");
                break;
            }
            sleep(delay).await;
        }
        Polled {
            value: None,
            attempts,
        }
    }
}
