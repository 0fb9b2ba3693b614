//! Retry with exponential backoff and jitter.
//!
//! The retry decision is delegated entirely to [`LlmError::retry_policy`];
//! this module never inspects provider error shapes. Backoff sleeps suspend
//! only the calling task.

use std::future::Future;
use std::time::Duration;

use rand::Rng;
use tracing::debug;

use pipeline::{LlmError, RetryPolicy};

/// Tuning knobs for [`retry_with_backoff`].
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt.
    ///
    /// `max_retries + 1` attempts are made in total.
    pub max_retries: u32,
    /// Base delay before the first retry.
    pub base_delay: Duration,
    /// Upper bound on the exponential delay (jitter is added on top).
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

/// Runs `operation` up to `max_retries + 1` times.
///
/// Retryable failures (per [`LlmError::retry_policy`]) sleep
/// `min(base_delay × 2^attempt, max_delay)` plus up to 10% uniform jitter
/// between attempts; no sleep follows the final attempt. Non-retryable
/// failures — including rate-limit and quota conditions — surface
/// immediately without consuming a retry attempt.
///
/// On exhaustion, a terminal timeout is re-raised as [`LlmError::Timeout`];
/// any other terminal retryable failure is wrapped in
/// [`LlmError::Exhausted`] carrying the attempt count and last cause.
pub async fn retry_with_backoff<T, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt: u32 = 0;
    loop {
        let error = match operation().await {
            Ok(value) => return Ok(value),
            Err(error) => error,
        };

        match error.retry_policy() {
            RetryPolicy::NonRetryable => return Err(error),
            RetryPolicy::Retryable { .. } => {
                if attempt >= config.max_retries {
                    return Err(exhausted(config.max_retries + 1, error));
                }
                let delay = backoff_delay(config, attempt);
                debug!(attempt, delay_ms = delay.as_millis() as u64, %error, "retrying LLM call");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Maps a terminal retryable failure to its surfaced classification.
fn exhausted(attempts: u32, error: LlmError) -> LlmError {
    if matches!(error, LlmError::Timeout { .. }) {
        return error;
    }
    LlmError::Exhausted {
        attempts,
        source: Box::new(error),
    }
}

/// Computes the delay before retry number `attempt + 1`: capped exponential
/// plus up to 10% uniform jitter.
fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponential = config.base_delay.as_secs_f64() * 2_f64.powi(attempt as i32);
    let capped = exponential.min(config.max_delay.as_secs_f64());
    let jitter = rand::thread_rng().gen_range(0.0..=capped * 0.1);
    Duration::from_secs_f64(capped + jitter)
}
