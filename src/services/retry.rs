//! Retry utilities for outbound upstream calls.
//!
//! Provides a bounded retry loop with exponential backoff. The delay before
//! retry `n` (zero-indexed attempt counter) is `base_delay * 2^n`, with no
//! jitter and no cap beyond the attempt bound.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// Configuration for retry behavior.
#[derive(Clone, Debug)]
pub struct RetryConfig {
    /// Total number of attempts, including the initial one.
    pub max_attempts: u32,
    /// Backoff unit; the delay doubles on every retry.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryConfig {
    /// Delay to wait after a failed attempt with the given zero-indexed counter.
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt)
    }
}

/// Terminal outcome of a retried operation.
#[derive(Debug)]
pub enum RetryFailure<E> {
    /// The operation failed with an error the policy does not retry.
    Fatal(E),
    /// Every attempt failed with a retryable error.
    Exhausted { attempts: u32, last: E },
}

/// Execute an async operation with bounded exponential backoff.
///
/// The operation is attempted up to `config.max_attempts` times. Errors for
/// which `is_retryable` returns false abort the loop immediately; a retryable
/// error on the last attempt yields `RetryFailure::Exhausted` carrying the
/// number of attempts made. Backoff suspends only the calling task.
pub async fn retry_with_backoff<F, Fut, T, E, P>(
    config: &RetryConfig,
    operation: &str,
    is_retryable: P,
    f: F,
) -> Result<T, RetryFailure<E>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
    P: Fn(&E) -> bool,
{
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    info!(
                        operation,
                        attempt = attempt + 1,
                        "Upstream call succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) => {
                if !is_retryable(&err) {
                    warn!(
                        operation,
                        error = %err,
                        "Upstream call failed with non-retryable error"
                    );
                    return Err(RetryFailure::Fatal(err));
                }

                if attempt + 1 >= config.max_attempts {
                    warn!(
                        operation,
                        attempts = attempt + 1,
                        error = %err,
                        "Upstream call failed after max attempts"
                    );
                    return Err(RetryFailure::Exhausted {
                        attempts: attempt + 1,
                        last: err,
                    });
                }

                let backoff = config.backoff_duration(attempt);
                warn!(
                    operation,
                    attempt = attempt + 1,
                    backoff_ms = backoff.as_millis() as u64,
                    error = %err,
                    "Upstream call failed, retrying after backoff"
                );

                sleep(backoff).await;
                attempt += 1;
            }
        }
    }
}
