//! Retry configuration and async retry helper with exponential backoff.

use std::future::Future;
use std::time::Duration;

use hive_kernel::AgentError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1_000
}

fn default_max_delay_ms() -> u64 {
    60_000
}

/// How many attempts to make and how long to wait between them.
///
/// The wait after the failed attempt `n` (0-indexed) is `base_delay * 2^n`,
/// capped at `max_delay`. No wait follows the last attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Total attempts (1 = no retry)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay_ms: u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX),
            ..Default::default()
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(base_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay_ms = u64::try_from(max_delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Sleep duration after the given failed attempt (0-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let ms = 1u64
            .checked_shl(attempt)
            .and_then(|factor| self.base_delay_ms.checked_mul(factor))
            .unwrap_or(self.max_delay_ms)
            .min(self.max_delay_ms);
        Duration::from_millis(ms)
    }
}

/// Successful outcome of [`retry_with_backoff`]
#[derive(Debug, Clone, PartialEq)]
pub struct Retried<T> {
    pub value: T,
    /// Attempts made, including the successful one
    pub attempts: u32,
}

/// Final failure of [`retry_with_backoff`]
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{last_error} (after {attempts} attempts)")]
pub struct RetryError {
    pub last_error: AgentError,
    pub attempts: u32,
}

impl From<RetryError> for AgentError {
    fn from(err: RetryError) -> Self {
        err.last_error
    }
}

/// Run `f` up to `config.max_attempts` times, sleeping with exponential
/// backoff between failures.
///
/// Stops early on the first error `is_retryable` rejects. The sleeps are
/// cancellation points: dropping the returned future abandons the loop.
pub async fn retry_with_backoff<F, Fut, T>(
    config: &RetryConfig,
    is_retryable: impl Fn(&AgentError) -> bool,
    mut f: F,
) -> Result<Retried<T>, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 0;

    loop {
        debug!(attempt = attempt + 1, max_attempts, "Attempting operation");
        match f().await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt + 1,
                });
            }
            Err(e) => {
                let attempts = attempt + 1;
                if !is_retryable(&e) || attempts >= max_attempts {
                    warn!(attempts, error = %e, "Operation failed, giving up");
                    return Err(RetryError {
                        last_error: e,
                        attempts,
                    });
                }

                let delay = config.delay_for(attempt);
                warn!(
                    attempt = attempts,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %e,
                    "Operation failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig::new(5, Duration::from_millis(100))
            .with_max_delay(Duration::from_millis(350));
        assert_eq!(config.delay_for(0), Duration::from_millis(100));
        assert_eq!(config.delay_for(1), Duration::from_millis(200));
        assert_eq!(config.delay_for(2), Duration::from_millis(350));
        assert_eq!(config.delay_for(63), Duration::from_millis(350));
        assert_eq!(config.delay_for(200), Duration::from_millis(350));
    }

    #[test]
    fn test_oversized_durations_saturate() {
        let config = RetryConfig::new(3, Duration::MAX).with_max_delay(Duration::MAX);
        assert_eq!(config.base_delay_ms, u64::MAX);
        assert_eq!(config.max_delay_ms, u64::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::new(3, Duration::from_secs(1));
        let started = tokio::time::Instant::now();

        let c = calls.clone();
        let result = retry_with_backoff(&config, AgentError::is_retryable, move || {
            let c = c.clone();
            async move {
                if c.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(AgentError::service_call_failed("weather", "HTTP 503"))
                } else {
                    Ok("sunny")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result.value, "sunny");
        assert_eq!(result.attempts, 3);
        // 1s after the first failure, 2s after the second
        assert_eq!(started.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_budget_surfaces_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::new(3, Duration::from_millis(10));

        let c = calls.clone();
        let err = retry_with_backoff(&config, AgentError::is_retryable, move || {
            let n = c.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(AgentError::ExecutionFailed(format!("failure {n}"))) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(err.attempts, 3);
        assert_eq!(err.last_error, AgentError::ExecutionFailed("failure 2".into()));
        assert_eq!(AgentError::from(err).to_string(), "failure 2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_retryable_error_stops_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let config = RetryConfig::new(5, Duration::from_secs(1));

        let c = calls.clone();
        let err = retry_with_backoff(&config, AgentError::is_retryable, move || {
            c.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(AgentError::InvalidInput("bad request".into())) }
        })
        .await
        .unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(err.attempts, 1);
    }

    #[tokio::test]
    async fn test_zero_attempts_still_runs_once() {
        let config = RetryConfig::new(0, Duration::from_millis(1));
        let result = retry_with_backoff(&config, |_| true, || async { Ok(7) })
            .await
            .unwrap();
        assert_eq!(result, Retried { value: 7, attempts: 1 });
    }
}
