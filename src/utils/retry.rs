//! Exponential backoff for Metadata Store writes
//!
//! Used for the metadata update that follows a blob `replace`: the blob write
//! is idempotent for identical bytes, so only the record update needs to be
//! repeated when it fails transiently.

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::errors::{RepositoryError, RepositoryResult};
use crate::utils::jitter::jitter_percent;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    /// Add up to 25% jitter to each delay
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Policy for the post-replace metadata commit
    pub fn for_commit() -> Self {
        Self {
            max_attempts: 4,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

/// Run `operation` until it succeeds, fails with a non-transient error, or
/// attempts run out. The last error is returned.
pub async fn with_retry<T, F, Fut>(
    config: &RetryConfig,
    mut operation: F,
    operation_name: &str,
) -> RepositoryResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = RepositoryResult<T>>,
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    debug!(
                        operation = operation_name,
                        attempt, max_attempts, "metadata operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(err) if !is_retryable_error(&err) => {
                debug!(operation = operation_name, error = %err, "non-retryable metadata error");
                return Err(err);
            }
            Err(err) if attempt >= max_attempts => {
                warn!(
                    operation = operation_name,
                    attempts = max_attempts,
                    error = %err,
                    "metadata operation failed after all attempts"
                );
                return Err(err);
            }
            Err(err) => {
                let delay = calculate_delay(config, attempt);
                warn!(
                    operation = operation_name,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    error = %err,
                    "metadata operation failed, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Transient failures: timeouts, connection trouble, lock contention
pub fn is_retryable_error(error: &RepositoryError) -> bool {
    match error {
        RepositoryError::Timeout { .. } => true,
        RepositoryError::Database(db_err) => match db_err {
            sea_orm::DbErr::ConnectionAcquire(_) | sea_orm::DbErr::Conn(_) => true,
            other => {
                let msg = other.to_string().to_lowercase();
                msg.contains("database is locked")
                    || msg.contains("database is busy")
                    || msg.contains("connection reset")
                    || msg.contains("timeout")
            }
        },
        RepositoryError::RecordNotFound { .. } => false,
    }
}

fn calculate_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let exponential = config.initial_delay.as_millis() as f64 * config.backoff_multiplier.powi(exponent);
    let delay_ms = exponential.min(config.max_delay.as_millis() as f64) as u64;

    if config.jitter {
        Duration::from_millis(delay_ms + jitter_percent(delay_ms, 25))
    } else {
        Duration::from_millis(delay_ms)
    }
}
