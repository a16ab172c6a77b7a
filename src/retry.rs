//! Retry logic with exponential backoff
//!
//! Only retrieval failures are ever retried. Directory and document errors never
//! reach this module: they are fatal by construction.
//!
//! # Example
//!
//! ```no_run
//! use board_attachments::retry::{IsRetryable, fetch_with_retry};
//! use board_attachments::config::RetryConfig;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Transient,
//!     Permanent,
//! }
//!
//! impl std::fmt::Display for MyError {
//!     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
//!         write!(f, "{:?}", self)
//!     }
//! }
//!
//! impl IsRetryable for MyError {
//!     fn is_retryable(&self) -> bool {
//!         matches!(self, MyError::Transient)
//!     }
//! }
//!
//! # async fn example() -> Result<(), MyError> {
//! let config = RetryConfig { max_attempts: 3, ..Default::default() };
//! fetch_with_retry(&config, || async {
//!     Ok::<_, MyError>(())
//! }).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::RetryConfig;
use crate::error::RetrievalError;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, server overload) return `true`.
/// Permanent failures (not found, forbidden, local disk errors) return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for RetrievalError {
    fn is_retryable(&self) -> bool {
        match self {
            RetrievalError::Network { .. } => true,
            RetrievalError::Timeout { .. } => true,
            // A short body usually means the connection dropped mid-transfer
            RetrievalError::Truncated { .. } => true,
            // Request timeout, rate limiting, and server-side failures
            RetrievalError::Status { status, .. } => {
                *status == 408 || *status == 429 || (500..=599).contains(status)
            }
            // Local disk problems will not fix themselves
            RetrievalError::Write { .. } => false,
            RetrievalError::Cancelled { .. } => false,
        }
    }
}

/// Run a retrieval, trying again after transient failures
///
/// The operation runs once, then up to `config.max_attempts` more times while it
/// fails with a retryable error. The wait starts at `initial_delay` and is
/// multiplied by `backoff_multiplier` after each retry, capped at `max_delay`.
/// Returns the first success, or the error that ended the attempts.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut retries_used = 0;

    loop {
        let error = match operation().await {
            Ok(value) => {
                if retries_used > 0 {
                    tracing::info!(retries = retries_used, "Attachment retrieved after retrying");
                }
                return Ok(value);
            }
            Err(error) => error,
        };

        if !error.is_retryable() {
            return Err(error);
        }
        if retries_used == config.max_attempts {
            if retries_used > 0 {
                tracing::error!(error = %error, retries = retries_used, "Giving up on attachment");
            }
            return Err(error);
        }

        retries_used += 1;
        let wait = if config.jitter { add_jitter(delay) } else { delay };
        tracing::warn!(
            error = %error,
            retry = retries_used,
            of = config.max_attempts,
            wait_ms = wait.as_millis() as u64,
            "Transient retrieval failure, trying again"
        );
        tokio::time::sleep(wait).await;

        delay = Duration::try_from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier)
            .unwrap_or(config.max_delay)
            .min(config.max_delay);
    }
}

/// Stretch a delay by a random factor in `[1, 2]`
///
/// Concurrent jobs hitting the same failing host then retry at different moments.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
