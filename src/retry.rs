//! Bounded retry for read-modify-write operations.
//!
//! Node updates race against other controllers writing the same object, so
//! the whole fetch/compare/write cycle is re-run on failure instead of just
//! the write. There is no backoff by default: the next attempt re-reads the
//! object, which is what resolves a conflict.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Default number of total attempts for node schedule updates
pub const DEFAULT_MAX_ATTEMPTS: u32 = 4;

#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Must be at least 1.
    pub max_attempts: u32,
    /// Pause between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            delay: Duration::ZERO,
        }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
    }
}

/// Run `operation` until it succeeds or the attempt budget is spent.
///
/// Every failure is logged. On exhaustion the last error is returned so the
/// caller can wrap it with its own context.
pub async fn retry<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;

        match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    operation = %operation_name,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Attempt failed"
                );
                if attempt >= max_attempts {
                    return Err(e);
                }
                if !policy.delay.is_zero() {
                    tokio::time::sleep(policy.delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_succeeds_immediately() {
        let result: Result<i32, &str> =
            retry(&RetryPolicy::default(), "op", |_| async { Ok(42) }).await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_succeeds_after_failures() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let result: Result<u32, String> = retry(&RetryPolicy::default(), "op", |attempt| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                if attempt < 3 {
                    Err(format!("conflict on attempt {attempt}"))
                } else {
                    Ok(attempt)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let result: Result<(), String> =
            retry(&RetryPolicy::with_max_attempts(4), "op", |attempt| {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err(format!("failure {attempt}"))
                }
            })
            .await;

        assert_eq!(result, Err("failure 4".to_string()));
        assert_eq!(count.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let count = Arc::new(AtomicU32::new(0));
        let c = count.clone();

        let _: Result<(), &str> = retry(&RetryPolicy::with_max_attempts(0), "op", |_| {
            let c = c.clone();
            async move {
                c.fetch_add(1, Ordering::SeqCst);
                Err("nope")
            }
        })
        .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
