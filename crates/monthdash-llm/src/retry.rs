//! Retry with exponential back-off and jitter for text-service calls.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries while
//! [`LlmError::is_transient`] holds. Permanent errors are returned immediately.

use std::future::Future;
use std::time::Duration;

use crate::error::LlmError;

/// Upper bound on a single back-off sleep.
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first; `4` means up to 5 calls.
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 4,
            backoff_base_ms: 1_000,
        }
    }
}

impl RetryPolicy {
    /// Sleep before retry number `attempt` (1-based), before jitter.
    ///
    /// | Attempt | Delay with `backoff_base_ms = 1_000` |
    /// |---------|--------------------------------------|
    /// | 1       | 1 000 ms                             |
    /// | 2       | 2 000 ms                             |
    /// | 3       | 4 000 ms                             |
    ///
    /// Capped at 60 s.
    #[must_use]
    pub fn base_delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(10);
        self.backoff_base_ms
            .saturating_mul(1u64 << exp)
            .min(MAX_DELAY_MS)
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors, sleeping `base_delay_ms ± 25 %` between attempts. A
/// rate-limit response with a `Retry-After` hint waits at least that long.
///
/// # Errors
///
/// Returns the last error once retries are exhausted, or the first permanent error.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    context: &str,
    mut operation: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let capped = policy.base_delay_ms(attempt);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let jittered = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                let delay_ms = match &err {
                    LlmError::RateLimited {
                        retry_after_secs: Some(secs),
                    } => jittered.max(secs.saturating_mul(1_000).min(MAX_DELAY_MS)),
                    _ => jittered,
                };
                tracing::warn!(
                    context,
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms,
                    error = %err,
                    "transient text-service error, retrying after back-off"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
