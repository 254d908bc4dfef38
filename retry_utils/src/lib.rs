use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Classification of provider failures for the retry strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryableError {
    /// 429 from the provider - back off twice as long
    RateLimit,
    /// 5xx or dropped connection
    ServerError,
    /// Request or lookup timed out
    Timeout,
    /// Anything else (4xx, malformed payloads) - never retried
    Other,
}

impl RetryableError {
    fn is_retryable(self) -> bool {
        !matches!(self, RetryableError::Other)
    }

    fn delay_multiplier(self) -> u64 {
        match self {
            RetryableError::RateLimit => 2,
            _ => 1,
        }
    }
}

/// Bounded exponential backoff settings
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts including the first one
    pub max_attempts: u32,
    /// Delay before the first retry (milliseconds)
    pub base_delay_ms: u64,
    /// Upper bound for a single delay (milliseconds)
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 8000,
        }
    }
}

impl RetryConfig {
    /// Delay before retry number `retry` (0-indexed), doubling each time and capped
    pub fn delay_for(&self, retry: u32, error_type: RetryableError) -> Duration {
        let exp = 1u64.checked_shl(retry.min(16)).unwrap_or(u64::MAX);
        let raw = self
            .base_delay_ms
            .saturating_mul(exp)
            .saturating_mul(error_type.delay_multiplier());
        Duration::from_millis(raw.min(self.max_delay_ms))
    }
}

/// Error returned by [`with_timeout`]
#[derive(Debug, Error)]
#[error("operation timed out after {0:?}")]
pub struct TimedOut(pub Duration);

/// Retry an async operation with bounded exponential backoff
///
/// Non-retryable errors are returned immediately. Once `max_attempts` is reached the
/// last error is returned so the caller can decide whether to skip the item.
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    config: &RetryConfig,
    classify_error: impl Fn(&E) -> RetryableError,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1u32;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!("Operation succeeded on attempt {}/{}", attempt, max_attempts);
                }
                return Ok(result);
            }
            Err(e) => {
                let error_type = classify_error(&e);

                if !error_type.is_retryable() {
                    debug!("Non-retryable error, giving up: {}", e);
                    return Err(e);
                }

                if attempt >= max_attempts {
                    error!("Operation failed after {} attempts: {}", attempt, e);
                    return Err(e);
                }

                let delay = config.delay_for(attempt - 1, error_type);
                warn!(
                    "Attempt {}/{} failed ({:?}): {} - retrying in {}ms",
                    attempt,
                    max_attempts,
                    error_type,
                    e,
                    delay.as_millis()
                );

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Run `future` with a hard deadline
pub async fn with_timeout<F, T>(duration: Duration, future: F) -> Result<T, TimedOut>
where
    F: Future<Output = T>,
{
    tokio::time::timeout(duration, future)
        .await
        .map_err(|_| TimedOut(duration))
}

/// Sleep between provider batches; a zero delay is a no-op
pub async fn pace(delay_ms: u64) {
    if delay_ms > 0 {
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct TestError {
        kind: &'static str,
    }

    impl std::fmt::Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "TestError: {}", self.kind)
        }
    }

    fn fast() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 5,
            max_delay_ms: 20,
        }
    }

    #[tokio::test]
    async fn test_immediate_success() {
        let result = retry_with_backoff(
            || async { Ok::<_, TestError>(7) },
            &RetryConfig::default(),
            |_| RetryableError::Other,
        )
        .await;

        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_non_retryable_error_is_not_retried() {
        let mut attempts = 0;
        let result = retry_with_backoff(
            || {
                attempts += 1;
                async { Err::<i32, _>(TestError { kind: "bad request" }) }
            },
            &fast(),
            |_| RetryableError::Other,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let mut attempts = 0;
        let result = retry_with_backoff(
            || {
                attempts += 1;
                let current = attempts;
                async move {
                    if current < 3 {
                        Err(TestError { kind: "server" })
                    } else {
                        Ok(42)
                    }
                }
            },
            &fast(),
            |_| RetryableError::ServerError,
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let mut attempts = 0;
        let result = retry_with_backoff(
            || {
                attempts += 1;
                async { Err::<i32, _>(TestError { kind: "rate_limit" }) }
            },
            &fast(),
            |_| RetryableError::RateLimit,
        )
        .await;

        assert!(result.is_err());
        assert_eq!(attempts, 3);
    }

    #[test]
    fn test_delay_doubles_and_caps() {
        let config = RetryConfig {
            max_attempts: 5,
            base_delay_ms: 100,
            max_delay_ms: 350,
        };
        assert_eq!(config.delay_for(0, RetryableError::ServerError), Duration::from_millis(100));
        assert_eq!(config.delay_for(1, RetryableError::ServerError), Duration::from_millis(200));
        assert_eq!(config.delay_for(2, RetryableError::ServerError), Duration::from_millis(350));
        assert_eq!(config.delay_for(0, RetryableError::RateLimit), Duration::from_millis(200));
    }

    #[tokio::test]
    async fn test_with_timeout_elapses() {
        let result = with_timeout(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            1
        })
        .await;
        assert!(result.is_err());

        let ok = with_timeout(Duration::from_millis(200), async { 5 }).await;
        assert_eq!(ok.unwrap(), 5);
    }
}
