//! Single-retry helper for recoverable storage errors.
//!
//! IO and corruption errors get retried at most once within a single
//! operation before surfacing to the caller. Everything else surfaces
//! immediately.

use crate::error::Error;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry policy: at most one retry, with a short fixed backoff.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum additional attempts after the first (spec: at most one).
    pub max_retries: u32,
    /// Delay before the retry.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            delay: Duration::from_millis(20),
        }
    }
}

/// Runs `operation`, retrying once (per `config`) if the error is
/// recoverable (`Error::is_recoverable`).
pub async fn with_single_retry<F, T, Fut>(config: &RetryConfig, operation: F) -> Result<T, Error>
where
F: Fn() -> Fut,
Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_recoverable() || attempt >= config.max_retries {
                    return Err(err);
                }
                attempt += 1;
                warn!(attempt, error = %err, "retrying recoverable storage error");
                tokio::time::sleep(config.delay).await;
            }
        }
    }
}

/// Synchronous counterpart, used by the storage engine's blocking file I/O.
pub fn with_single_retry_sync<F, T>(config: &RetryConfig, operation: F) -> Result<T, Error>
where
F: Fn() -> Result<T, Error>,
{
    let mut attempt = 0;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_recoverable() || attempt >= config.max_retries {
                    return Err(err);
                }
                attempt += 1;
                warn!(attempt, error = %err, "retrying recoverable storage error");
                std::thread::sleep(config.delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn retries_once_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_single_retry_sync(&RetryConfig::default(), || {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Err(Error::IoFailure(std::io::Error::other("transient")))
                } else {
                    Ok(42)
                }
        });
        assert_eq!(result.expect("should succeed on retry"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn does_not_retry_non_recoverable() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, Error> = with_single_retry_sync(&RetryConfig::default(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::Validation("bad".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn gives_up_after_configured_retries() {
        let calls = AtomicU32::new(0);
        let result: Result<i32, Error> = with_single_retry_sync(&RetryConfig::default(), || {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::IoFailure(std::io::Error::other("still broken")))
        });
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
