//! Retry with exponential backoff for rate-limited model calls.
//!
//! Only rate-limit signals are retried (HTTP 429, or "429"/"quota" in the error text).
//! Everything else propagates on the first failure.

use std::future::Future;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::LlmError;

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BASE_DELAY_MS: u64 = 1000;

/// Matches "retry in 12s", "Please retry in 37.48s", `"retryDelay": "20s"`.
static RETRY_HINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)retry\D*?(\d+(?:\.\d+)?)\s*s").expect("retry hint pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            base_delay: Duration::from_millis(DEFAULT_BASE_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay before retrying after the 0-indexed `attempt` failed with `error`.
    /// A server-provided hint wins over the exponential schedule.
    pub fn delay_for(&self, attempt: u32, error: &LlmError) -> Duration {
        retry_hint(&error.to_string()).unwrap_or_else(|| {
            self.base_delay
                .saturating_mul(2u32.saturating_pow(attempt))
        })
    }
}

pub fn is_rate_limited(error: &LlmError) -> bool {
    if let LlmError::Api { status: 429, .. } = error {
        return true;
    }
    let message = error.to_string().to_lowercase();
    message.contains("429") || message.contains("quota")
}

/// Extracts an explicit "retry in N s" delay from an error message.
pub fn retry_hint(message: &str) -> Option<Duration> {
    let captures = RETRY_HINT.captures(message)?;
    let seconds: f64 = captures.get(1)?.as_str().parse().ok()?;
    Duration::try_from_secs_f64(seconds).ok()
}

/// Runs `op` until it succeeds, fails with a non-rate-limit error, or `policy.max_attempts`
/// is spent. The backoff sleep ends early with [`LlmError::Cancelled`] when `cancel` fires.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    cancel: &CancellationToken,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        let error = match op().await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };

        if !is_rate_limited(&error) || attempt + 1 >= policy.max_attempts {
            return Err(error);
        }

        let delay = policy.delay_for(attempt, &error);
        warn!(
            attempt = attempt + 1,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Rate limited, retrying: {error}"
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(LlmError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
