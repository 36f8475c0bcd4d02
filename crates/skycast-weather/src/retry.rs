//! Retry policy for upstream GETs.
//!
//! Transient failures (timeouts, connection errors, 5xx, 408, 429) are
//! retried with capped exponential backoff. Client errors are returned
//! as-is. Backoff sleeps end early when the request is cancelled.

use std::future::Future;
use std::time::Duration;

use reqwest::{Response, StatusCode};
use skycast_core::NetworkConfig;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    /// Doubles each attempt
    pub initial_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&NetworkConfig::default())
    }
}

impl From<&NetworkConfig> for RetryConfig {
    fn from(net: &NetworkConfig) -> Self {
        Self {
            max_retries: net.max_retries,
            initial_delay: Duration::from_millis(net.initial_delay_ms),
            max_delay: Duration::from_millis(net.max_delay_ms),
        }
    }
}

impl RetryConfig {
    /// No retries at all; handy in tests that count upstream calls.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(self.max_delay)
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status.is_server_error()
        || status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
}

fn is_transient_error(error: &reqwest::Error) -> bool {
    if error.is_timeout() || error.is_connect() {
        return true;
    }
    error.status().is_some_and(is_transient_status)
}

/// Result of [`with_retry`].
#[derive(Debug)]
pub enum Attempted {
    Done(Result<Response, reqwest::Error>),
    Cancelled,
}

/// Run `operation` until it yields a non-transient result, retries run out,
/// or `token` is cancelled.
pub async fn with_retry<F, Fut>(
    config: &RetryConfig,
    token: &CancellationToken,
    operation: F,
) -> Attempted
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut attempt = 0;
    loop {
        if attempt > 0 {
            let delay = config.delay_for_attempt(attempt - 1);
            tracing::info!(
                "Retry attempt {} of {}, waiting {:?}",
                attempt,
                config.max_retries,
                delay
            );
            tokio::select! {
                biased;
                _ = token.cancelled() => return Attempted::Cancelled,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return Attempted::Cancelled,
            result = operation() => result,
        };

        let retries_left = attempt < config.max_retries;
        let retry = match &result {
            Ok(response) if is_transient_status(response.status()) && retries_left => {
                tracing::warn!(
                    "Upstream returned {}, attempt {} of {}",
                    response.status(),
                    attempt + 1,
                    config.max_retries + 1
                );
                true
            }
            Err(e) if is_transient_error(e) && retries_left => {
                tracing::warn!(
                    "Transient error on attempt {} of {}: {}",
                    attempt + 1,
                    config.max_retries + 1,
                    e
                );
                true
            }
            _ => false,
        };

        if !retry {
            if attempt > 0 {
                tracing::info!("Request settled after {} retries", attempt);
            }
            return Attempted::Done(result);
        }
        attempt += 1;
    }
}
