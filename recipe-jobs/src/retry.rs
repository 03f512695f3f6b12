//! Retry policy for activities: bounded attempts, exponential backoff with
//! jitter, a hard per-attempt timeout, and immediate abort on
//! non-retryable failures.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::warn;

use crate::JobError;

#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub backoff_multiplier: f64,
    pub activity_timeout: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts at 1s/4s/16s backoff, ten-minute activity timeout.
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            backoff_multiplier: 4.0,
            activity_timeout: Duration::from_secs(600),
        }
    }
}

impl RetryPolicy {
    /// Run `op` under this policy. The delay before attempt `n` is
    /// `base * multiplier^(n-1)`, jittered ±20% so synchronized workers
    /// don't stampede a recovering service.
    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T, JobError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, JobError>>,
    {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = match tokio::time::timeout(self.activity_timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(JobError::Timeout {
                    seconds: self.activity_timeout.as_secs(),
                }),
            };
            match outcome {
                Ok(value) => return Ok(value),
                Err(err) if !err.is_retryable() || attempt >= self.max_attempts => {
                    return Err(err);
                }
                Err(err) => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        activity = label,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "activity failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let exp = self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let base = self.base_delay.as_secs_f64() * exp;
        let jitter = rand::rng().random_range(0.8..1.2);
        Duration::from_secs_f64(base * jitter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn transient() -> JobError {
        JobError::Timeout { seconds: 1 }
    }

    fn fatal() -> JobError {
        JobError::Validation(recipe_model::ValidationError::EmptyTitle)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures_up_to_the_limit() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let result: Result<(), JobError> = RetryPolicy::default()
            .run("always-failing", move || {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(transient())
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_a_transient_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let result = RetryPolicy::default()
            .run("flaky", move || {
                let seen = seen.clone();
                async move {
                    if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(transient())
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn validation_failures_abort_without_retry() {
        let calls = Arc::new(AtomicU32::new(0));
        let seen = calls.clone();
        let result: Result<(), JobError> = RetryPolicy::default()
            .run("invalid", move || {
                let seen = seen.clone();
                async move {
                    seen.fetch_add(1, Ordering::SeqCst);
                    Err(fatal())
                }
            })
            .await;
        assert!(matches!(result, Err(JobError::Validation(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn backoff_schedule_is_exponential() {
        let policy = RetryPolicy::default();
        let d1 = policy.delay_for(1).as_secs_f64();
        let d2 = policy.delay_for(2).as_secs_f64();
        let d3 = policy.delay_for(3).as_secs_f64();
        assert!((0.8..=1.2).contains(&d1));
        assert!((3.2..=4.8).contains(&d2));
        assert!((12.8..=19.2).contains(&d3));
    }
}
