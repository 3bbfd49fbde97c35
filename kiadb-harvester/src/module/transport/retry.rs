//! Explicit retry-with-backoff wrapper

use std::future::Future;
use std::time::Duration;

use super::types::TransportError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): `base * 2^(retry-1)`, capped.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempt ceiling is reached. `op` receives the 1-based attempt number.
pub async fn with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, TransportError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, TransportError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < max_attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    "Attempt {}/{} failed for {}: {} (retrying in {:?})",
                    attempt,
                    max_attempts,
                    label,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::debug!(
                    "Giving up on {} after {} attempt(s): {}",
                    label,
                    attempt,
                    e
                );
                return Err(e);
            }
        }
    }
}
