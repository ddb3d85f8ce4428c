//! Backoff policy for idempotent oracle reads.
//!
//! Listing and by-id lookups retry on 408, 429, any 5xx and on connect or
//! timeout errors. A `Retry-After` of under a minute replaces the computed
//! backoff. Combine requests go through [`RetryConfig::single_attempt`].
//!
//! Every attempt of one logical request carries the same `X-Request-Id`.

use std::time::Duration;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{RequestBuilder, Response, StatusCode};
use uuid::Uuid;

const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Down-jitter: 0.25 shortens each delay by up to 25%.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
            jitter_factor: 0.25,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// No retries. Used for non-idempotent requests.
    #[must_use]
    pub fn single_attempt() -> Self {
        Self::with_max_retries(0)
    }

    fn backoff(&self, step: u32, headers: Option<&HeaderMap>) -> Duration {
        if let Some(delay) = headers.and_then(retry_after) {
            return delay;
        }
        let base = self.initial_delay.as_secs_f64() * 2.0_f64.powi(step as i32);
        let capped = base.min(self.max_delay.as_secs_f64());
        let jitter = 1.0 - rand::random::<f64>() * self.jitter_factor;
        Duration::from_secs_f64(capped * jitter)
    }
}

/// How a request ended once retries were exhausted.
#[derive(Debug)]
pub enum RetryOutcome {
    Success(Response),
    /// Non-2xx status; the response is kept for its error body.
    HttpError(Response),
    ConnectionError { attempts: u32, source: reqwest::Error },
}

/// Send a request, rebuilding it with `build_request` for each attempt.
pub async fn send_with_retry<F>(build_request: F, config: &RetryConfig) -> RetryOutcome
where
    F: Fn() -> RequestBuilder,
{
    let request_id = format!("alchemist-{}", Uuid::new_v4());
    let mut attempt = 0;

    loop {
        let retries_left = attempt < config.max_retries;
        let sent = build_request()
            .header("X-Request-Id", &request_id)
            .send()
            .await;

        let delay = match sent {
            Ok(response) if response.status().is_success() => {
                return RetryOutcome::Success(response);
            }
            Ok(response) if retries_left && is_retryable_status(response.status()) => {
                tracing::debug!(status = %response.status(), attempt, "Retrying oracle read");
                config.backoff(attempt, Some(response.headers()))
            }
            Ok(response) => return RetryOutcome::HttpError(response),
            Err(e) if retries_left && (e.is_connect() || e.is_timeout()) => {
                tracing::debug!(error = %e, attempt, "Retrying oracle read");
                config.backoff(attempt, None)
            }
            Err(source) => {
                return RetryOutcome::ConnectionError {
                    attempts: attempt + 1,
                    source,
                };
            }
        };

        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status.is_server_error()
        || matches!(status, StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS)
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    let secs = headers.get(RETRY_AFTER)?.to_str().ok()?.trim().parse::<u64>().ok()?;
    let delay = Duration::from_secs(secs);
    (delay > Duration::ZERO && delay < MAX_RETRY_AFTER).then_some(delay)
}
