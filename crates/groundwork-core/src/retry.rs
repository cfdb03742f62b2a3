//! Retry engine for transient cloud failures
//!
//! Every provisioning step is an idempotent create-or-update or read, so
//! re-issuing a call after a timeout or throttling response is always
//! safe. Only [`Error::Transient`] is retried; the fatal classes (auth,
//! not-found, conflict, crypto) return immediately.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::error::Result;

/// Backoff parameters for retried cloud calls.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    pub max_attempts: u32,
    /// Delay before the second attempt, in milliseconds
    pub initial_delay_ms: u64,
    /// Cap applied to every computed delay, in milliseconds
    pub max_delay_ms: u64,
    /// Exponential growth factor between attempts
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 250,
            max_delay_ms: 10_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries, for tests and dry runs.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }
}

/// Delay before the next attempt (1-indexed), exponential with cap.
///
/// Jitter adds up to 25% random variation to avoid thundering-herd
/// retries against a throttled control plane.
pub fn calculate_delay(policy: &RetryPolicy, attempt: u32, jitter: bool) -> Duration {
    let attempt_index = attempt.saturating_sub(1);
    let multiplier = policy.backoff_multiplier.powf(f64::from(attempt_index));
    let base_delay_ms = (policy.initial_delay_ms as f64 * multiplier) as u64;
    let capped_delay_ms = base_delay_ms.min(policy.max_delay_ms);

    let final_delay_ms = if jitter && capped_delay_ms > 0 {
        let jitter_range = capped_delay_ms / 4;
        capped_delay_ms + rand::rng().random_range(0..=jitter_range)
    } else {
        capped_delay_ms
    };

    Duration::from_millis(final_delay_ms)
}

/// Execute an idempotent async operation, retrying transient failures.
///
/// `label` names the operation in the retry log lines.
pub async fn retry_transient<F, Fut, T>(policy: &RetryPolicy, label: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < policy.max_attempts => {
                let delay = calculate_delay(policy, attempt, true);
                warn!(
                    "{label} failed (attempt {attempt}/{}), retrying in {delay:?}: {err}",
                    policy.max_attempts
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::Error;

    fn quick_policy(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay_ms: 1,
            max_delay_ms: 10,
            backoff_multiplier: 2.0,
        }
    }

    #[test]
    fn delay_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 1000,
            max_delay_ms: 3000,
            backoff_multiplier: 2.0,
        };
        assert_eq!(calculate_delay(&policy, 1, false), Duration::from_millis(1000));
        assert_eq!(calculate_delay(&policy, 2, false), Duration::from_millis(2000));
        // Capped at max_delay_ms from the third attempt on
        assert_eq!(calculate_delay(&policy, 3, false), Duration::from_millis(3000));
        assert_eq!(calculate_delay(&policy, 4, false), Duration::from_millis(3000));
    }

    #[test]
    fn jitter_stays_within_a_quarter_of_the_delay() {
        let policy = quick_policy(3);
        for _ in 0..100 {
            let delay = calculate_delay(&policy, 4, true);
            assert!(delay >= Duration::from_millis(8));
            assert!(delay <= Duration::from_millis(10));
        }
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result = retry_transient(&quick_policy(5), "probe", || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(Error::transient("throttled"))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn attempts_are_bounded_by_the_policy() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = retry_transient(&quick_policy(3), "probe", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::transient("still throttled"))
            }
        })
        .await;

        assert!(result.unwrap_err().is_transient());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn fatal_errors_short_circuit() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);

        let result: Result<()> = retry_transient(&quick_policy(5), "probe", || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err(Error::auth("token expired"))
            }
        })
        .await;

        assert!(matches!(result.unwrap_err(), Error::Auth { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
