use std::{future::Future, time::Duration};

use serde::{Deserialize, Serialize};
use tokio::time::{sleep, timeout, Instant};
use tracing::warn;

use crate::errors::{ClientError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Total time budget across all attempts.
    pub timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retries: 5,
            retry_delay_ms: 500,
            timeout_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        RetryConfig {
            max_retries: 1,
            retry_delay_ms: 0,
            timeout_ms: 0,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Races `future` against `after`. Elapsing is reported as
/// [`ClientError::Timeout`], which callers may retry.
pub async fn with_timeout<T, F>(operation: &'static str, after: Duration, future: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout(after, future).await {
        Ok(result) => result,
        Err(_) => {
            warn!("{} timed out after {:?}", operation, after);
            Err(ClientError::Timeout { operation, after })
        }
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the attempt or time budget in `config` is spent.
pub async fn retry<F, Fut, T>(config: &RetryConfig, name: &'static str, operation: F) -> Result<T>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempts = 0;
    let start_time = Instant::now();
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                if !e.is_retryable() {
                    return Err(e);
                }
                attempts += 1;
                if attempts >= config.max_retries || start_time.elapsed() >= config.timeout() {
                    return Err(e);
                }
                warn!(
                    "{} failed, retrying in {:?} (attempt {}/{}): {}",
                    name,
                    config.retry_delay(),
                    attempts,
                    config.max_retries,
                    e
                );
                tokio::task::yield_now().await;
                sleep(config.retry_delay()).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::errors::TransportError;

    #[tokio::test]
    async fn test_retry_until_success() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 5,
            retry_delay_ms: 1,
            timeout_ms: 10_000,
        };
        let result = retry(&config, "flaky", || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(ClientError::Transport(TransportError::Rpc("busy".into())))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_permanent_error() {
        let calls = AtomicU32::new(0);
        let result: Result<()> = retry(&RetryConfig::default(), "tier", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::InvalidTier(9))
        })
        .await;
        assert_eq!(result, Err(ClientError::InvalidTier(9)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 3,
            retry_delay_ms: 1,
            timeout_ms: 10_000,
        };
        let result: Result<()> = retry(&config, "down", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ClientError::Transport(TransportError::Rpc("down".into())))
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_timeout() {
        let after = Duration::from_millis(50);
        let result: Result<()> = with_timeout("slow", after, async {
            sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert_eq!(
            result,
            Err(ClientError::Timeout {
                operation: "slow",
                after
            })
        );

        let result = with_timeout("fast", after, async { Ok(1) }).await;
        assert_eq!(result, Ok(1));
    }
}
