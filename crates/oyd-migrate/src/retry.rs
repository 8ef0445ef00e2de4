//! Backoff for idempotent reads against Azure.
//!
//! Only GETs go through [`with_retry`]. Calls that create resources are sent
//! once; a failed stage is replayed as a whole on resume instead.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// How often and how long to wait between attempts.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each further one.
    pub base_delay: Duration,
    /// Upper bound for any single wait, including server hints.
    pub max_delay: Duration,
    /// Spread waits by up to a quarter so parallel callers drift apart.
    pub jitter: bool,
}

/// ARM throttles per subscription with windows of several seconds.
impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 4,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter: false,
        }
    }

    /// Exponential wait before retry number `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = 2u32.saturating_pow(retry - 1);
        let delay = self.base_delay.saturating_mul(factor).min(self.max_delay);
        if self.jitter {
            (delay + delay.mul_f64(0.25 * jitter_fraction())).min(self.max_delay)
        } else {
            delay
        }
    }

    /// Wait after `error` before retry number `retry`.
    ///
    /// A throttling hint from the server wins over the backoff when it is
    /// longer, but never exceeds `max_delay`.
    pub fn delay_after(&self, error: &Error, retry: u32) -> Duration {
        let backoff = self.backoff(retry);
        match error {
            Error::RateLimit(secs) => Duration::from_secs(*secs).min(self.max_delay).max(backoff),
            _ => backoff,
        }
    }
}

/// Value in `[0, 1)` from a fresh v4 uuid.
fn jitter_fraction() -> f64 {
    (uuid::Uuid::new_v4().as_u128() % 1000) as f64 / 1000.0
}

/// Throttling, network failures and 5xx responses are worth another try.
///
/// Categorized errors qualify only when they carry a 5xx `status_code`
/// detail.
pub fn is_retryable_error(error: &Error) -> bool {
    match error {
        Error::RateLimit(_) | Error::Network { .. } | Error::Io(_) => true,
        Error::Http(e) => e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error()),
        other => other
            .details()
            .and_then(|d| d.get("status_code"))
            .and_then(serde_json::Value::as_u64)
            .is_some_and(|code| (500..600).contains(&code)),
    }
}

/// Runs `operation` until it succeeds, fails permanently or runs out of
/// retries; the last error is returned as is.
pub async fn with_retry<F, Fut, T>(config: &RetryConfig, operation_name: &str, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut retry = 0;
    loop {
        match operation().await {
            Ok(value) => {
                if retry > 0 {
                    debug!("{}: succeeded after {} retries", operation_name, retry);
                }
                return Ok(value);
            }
            Err(e) if retry < config.max_retries && is_retryable_error(&e) => {
                retry += 1;
                let delay = config.delay_after(&e, retry);
                warn!(
                    "{}: {} (retry {}/{} in {:?})",
                    operation_name, e, retry, config.max_retries, delay
                );
                sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}
