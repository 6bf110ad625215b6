use log::{debug, warn};
use rand::random;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;

use crate::error::{ExporterError, Result};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts
    pub max_attempts: usize,

    /// Initial delay before first retry in milliseconds
    pub initial_delay_ms: u64,

    /// Multiplier for exponential backoff
    pub backoff_factor: f64,

    /// Maximum delay in milliseconds
    pub max_delay_ms: u64,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            backoff_factor: 2.0,
            max_delay_ms: 10_000, // 10 seconds
            jitter: true,
        }
    }
}

/// Execute a future with retry logic
pub async fn execute_with_retry<F, Fut, T, E>(
    operation: F,
    config: RetryConfig,
    context: &str,
) -> Result<T>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = std::result::Result<T, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut attempts = 0;
    let mut delay = Duration::from_millis(config.initial_delay_ms);

    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(err) => {
                attempts += 1;

                if attempts >= config.max_attempts {
                    return Err(ExporterError::Retry(format!(
                        "{context} failed after {attempts} attempts: {err}"
                    )));
                }

                warn!(
                    "{} (attempt {}/{}): {}",
                    context, attempts, config.max_attempts, err
                );

                sleep(delay).await;

                // Calculate next delay with exponential backoff
                let next_delay_ms = (delay.as_millis() as f64 * config.backoff_factor) as u64;

                // Apply jitter if configured
                if config.jitter {
                    delay = Duration::from_millis(
                        next_delay_ms.min(config.max_delay_ms) + random::<u64>() % 100,
                    );
                } else {
                    delay = Duration::from_millis(next_delay_ms.min(config.max_delay_ms));
                }

                debug!("Retrying after {:?} delay", delay);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fast_config(max_attempts: usize) -> RetryConfig {
        RetryConfig {
            max_attempts,
            initial_delay_ms: 1,
            backoff_factor: 1.0,
            max_delay_ms: 2,
            jitter: false,
        }
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = execute_with_retry(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, std::io::Error>(7)
                }
            },
            fast_config(3),
            "first attempt",
        )
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);

        let result = execute_with_retry(
            move || {
                let counter = Arc::clone(&counter);
                async move {
                    if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(std::io::Error::other("flaky"))
                    } else {
                        Ok(42)
                    }
                }
            },
            fast_config(5),
            "transient failure",
        )
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_context() {
        let result: Result<()> = execute_with_retry(
            || async { Err::<(), _>(std::io::Error::other("down")) },
            fast_config(2),
            "session open",
        )
        .await;

        let err = result.unwrap_err();
        assert!(err.to_string().contains("session open"));
        assert!(err.to_string().contains("2 attempts"));
    }
}
