//! Backoff policy for current-weather lookups.
//!
//! Only the OpenWeather adapter retries. A lookup is repeated after a
//! timeout, a refused connection, a 5xx, a 429 or a 408; any other answer
//! is handed back to the adapter as-is.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};

pub const DEFAULT_MAX_RETRIES: u32 = 3;
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 100;
pub const DEFAULT_MAX_DELAY_MS: u64 = 5000;

/// How many times to repeat a weather lookup and how long to wait between tries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each later one
    pub initial_delay: Duration,
    /// Upper bound on any single wait
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_MAX_RETRIES,
            DEFAULT_INITIAL_DELAY_MS,
            DEFAULT_MAX_DELAY_MS,
        )
    }
}

impl RetryConfig {
    pub fn new(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            max_retries,
            initial_delay: Duration::from_millis(initial_delay_ms),
            max_delay: Duration::from_millis(max_delay_ms),
        }
    }

    /// Single attempt, no backoff
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    pub fn total_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Wait before retry `retry` (1-based).
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(31);
        self.initial_delay
            .saturating_mul(1u32 << exponent)
            .min(self.max_delay)
    }
}

/// Whether a provider status is worth asking again.
pub fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

/// Whether a transport failure is worth asking again.
pub fn is_transient_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    if error.is_decode() || error.is_builder() {
        return false;
    }
    error.status().is_some_and(is_transient_status)
}

/// Run `send` until it yields a non-transient outcome or the retry budget
/// is spent. The last response or error is returned unchanged.
pub async fn with_retry<F, Fut>(config: &RetryConfig, send: F) -> Result<Response, reqwest::Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let total = config.total_attempts();
    let mut retry = 0;

    loop {
        let outcome = send().await;
        let budget_left = retry < config.max_retries;

        let transient = match &outcome {
            Ok(response) => is_transient_status(response.status()),
            Err(e) => is_transient_error(e),
        };

        if !transient || !budget_left {
            match &outcome {
                Err(e) if transient => {
                    tracing::error!("Weather lookup failed after {} attempts: {}", total, e)
                }
                Ok(response) if transient => tracing::error!(
                    "Weather lookup still failing after {} attempts (status {})",
                    total,
                    response.status()
                ),
                _ if retry > 0 => tracing::info!("Weather lookup settled after {} retries", retry),
                _ => {}
            }
            return outcome;
        }

        retry += 1;
        let wait = config.backoff(retry);
        match &outcome {
            Ok(response) => tracing::warn!(
                "Weather API answered {}; retry {} of {} in {:?}",
                response.status(),
                retry,
                config.max_retries,
                wait
            ),
            Err(e) => tracing::warn!(
                "Weather API unreachable ({}); retry {} of {} in {:?}",
                e,
                retry,
                config.max_retries,
                wait
            ),
        }
        tokio::time::sleep(wait).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_provider_settings() {
        let config = RetryConfig::default();
        assert_eq!(config.total_attempts(), 4);
        assert_eq!(config.backoff(1), Duration::from_millis(100));
    }

    #[test]
    fn test_backoff_doubles_until_cap() {
        let config = RetryConfig::new(6, 250, 1500);
        let waits: Vec<u128> = (1..=5).map(|r| config.backoff(r).as_millis()).collect();
        assert_eq!(waits, vec![250, 500, 1000, 1500, 1500]);
    }

    #[test]
    fn test_none_has_single_attempt() {
        let config = RetryConfig::none();
        assert_eq!(config.total_attempts(), 1);
        assert_eq!(config.backoff(1), Duration::ZERO);
    }

    #[test]
    fn test_transient_statuses() {
        for status in [
            StatusCode::BAD_GATEWAY,
            StatusCode::GATEWAY_TIMEOUT,
            StatusCode::TOO_MANY_REQUESTS,
            StatusCode::REQUEST_TIMEOUT,
        ] {
            assert!(is_transient_status(status), "{}", status);
        }

        for status in [
            StatusCode::OK,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
        ] {
            assert!(!is_transient_status(status), "{}", status);
        }
    }
}
