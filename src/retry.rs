use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::config::{RetryConfig, MAX_RETRY_DELAY_SECS};
use crate::error::Result;

/// Exponential backoff for fetch-class operations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_factor: f64,
}

impl RetryPolicy {
    /// Single attempt, no waiting.
    #[cfg(test)]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            backoff_factor: 1.0,
        }
    }

    /// Wait before the attempt following `attempt` (1-based), capped at
    /// `MAX_RETRY_DELAY_SECS`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let cap = Duration::from_secs(MAX_RETRY_DELAY_SECS);
        let exp = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let secs = self.base_delay.as_secs_f64() * self.backoff_factor.powi(exp);
        Duration::try_from_secs_f64(secs).map_or(cap, |d| d.min(cap))
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(c: RetryConfig) -> Self {
        let backoff_factor = if c.backoff_factor.is_finite() && c.backoff_factor >= 1.0 {
            c.backoff_factor
        } else {
            RetryConfig::default().backoff_factor
        };
        Self {
            max_attempts: c.max_attempts.max(1),
            base_delay: Duration::from_millis(c.base_delay_ms),
            backoff_factor,
        }
    }
}

/// Run `op` until it succeeds, `should_retry` declines the error, or the
/// attempts run out. The last error is returned.
pub async fn with_retry<T, F, Fut, P>(policy: &RetryPolicy, mut op: F, should_retry: P) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    P: Fn(&crate::error::AppError) -> bool,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if attempt < max_attempts && should_retry(&e) => {
                let delay = policy.delay_after(attempt);
                warn!(
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Attempt {attempt} failed: {e}. Retrying..."
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            base_delay: Duration::from_millis(1),
            backoff_factor: 2.0,
        }
    }

    #[test]
    fn delays_grow_geometrically() {
        let p = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(1000),
            backoff_factor: 2.0,
        };
        assert_eq!(p.delay_after(1), Duration::from_millis(1000));
        assert_eq!(p.delay_after(2), Duration::from_millis(2000));
        assert_eq!(p.delay_after(3), Duration::from_millis(4000));
    }

    #[test]
    fn delays_never_overflow() {
        let wild = RetryPolicy::from(RetryConfig {
            max_attempts: 5,
            base_delay_ms: 1000,
            backoff_factor: f64::INFINITY,
        });
        assert_eq!(wild.backoff_factor, 2.0);
        assert_eq!(wild.delay_after(2), Duration::from_millis(2000));

        let cap = Duration::from_secs(MAX_RETRY_DELAY_SECS);
        let huge_base = RetryPolicy::from(RetryConfig {
            max_attempts: 5,
            base_delay_ms: u64::MAX,
            backoff_factor: 10.0,
        });
        assert_eq!(huge_base.delay_after(1), cap);
        assert_eq!(huge_base.delay_after(4), cap);

        let unchecked = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            backoff_factor: f64::NAN,
        };
        assert_eq!(unchecked.delay_after(2), cap);
        assert_eq!(fast(3).delay_after(u32::MAX), cap);
    }

    #[tokio::test]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let out = with_retry(
            &fast(3),
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n < 3 {
                    Err(AppError::Transport(format!("flaky {n}")))
                } else {
                    Ok(n)
                }
            },
            AppError::is_transport,
        )
        .await
        .unwrap();
        assert_eq!(out, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let calls = AtomicU32::new(0);
        let err = with_retry(
            &fast(2),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AppError::Transport("down".into()))
            },
            AppError::is_transport,
        )
        .await
        .unwrap_err();
        assert_eq!(err.to_string(), "down");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn non_retryable_error_stops_immediately() {
        let calls = AtomicU32::new(0);
        let err = with_retry(
            &fast(5),
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(AppError::Validation("bad feed".into()))
            },
            AppError::is_transport,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
