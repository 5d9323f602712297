use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::RetryConfig;
use crate::store::StoreError;

/// Why a retried store read gave up.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RetryError {
    /// The caller cancelled the resolution.
    Cancelled,
    /// Every attempt failed with a transient error.
    Exhausted { attempts: u32, last: StoreError },
    /// A non-transient error; not retried.
    Permanent(StoreError),
}

/// Runs an idempotent store read with per-attempt timeout, exponential
/// backoff and cancellation.
pub(crate) async fn execute_with_retry<T, F, Fut>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, RetryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StoreError>>,
{
    let mut delay = config.initial_delay;
    let mut last_error = StoreError::Timeout;

    for attempt in 0..=config.max_retries {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            outcome = timeout(config.attempt_timeout, operation()) => outcome,
        };

        match outcome {
            Ok(Ok(value)) => {
                if attempt > 0 {
                    tracing::info!(
                        operation = operation_name,
                        retries = attempt,
                        "Store read succeeded after retries"
                    );
                }
                return Ok(value);
            }
            Ok(Err(err)) if !err.is_transient() => {
                tracing::warn!(
                    operation = operation_name,
                    error = %err,
                    "Store read failed permanently"
                );
                return Err(RetryError::Permanent(err));
            }
            Ok(Err(err)) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    error = %err,
                    "Store read failed"
                );
                last_error = err;
            }
            Err(_) => {
                tracing::warn!(
                    operation = operation_name,
                    attempt = attempt + 1,
                    timeout_ms = config.attempt_timeout.as_millis() as u64,
                    "Store read timed out"
                );
                last_error = StoreError::Timeout;
            }
        }

        if attempt < config.max_retries {
            tracing::debug!(
                operation = operation_name,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            delay = next_delay(delay, config);
        }
    }

    Err(RetryError::Exhausted {
        attempts: config.max_retries + 1,
        last: last_error,
    })
}

fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    current.mul_f64(config.delay_multiplier).min(config.max_delay)
}
