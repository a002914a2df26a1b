// SPDX-License-Identifier: MIT

//! Outbound HTTP plumbing shared by model providers and tools
//!
//! Transient failures (HTTP 429/500/502/503/504, connect errors and
//! timeouts) are retried with exponential backoff up to a bounded number
//! of attempts. A `Retry-After` header in seconds takes precedence over
//! the computed delay.

use crate::adk::error::HubError;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Exponential backoff policy for outbound calls
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts including the first one
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
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Backoff before retrying after the given (1-based) failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay
            .saturating_mul(1u32 << exp)
            .min(self.max_delay)
    }

    pub fn is_transient_status(status: StatusCode) -> bool {
        matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
    }

    /// Send a request, rebuilding it for each attempt.
    ///
    /// The final response is returned as-is, even when its status is an
    /// error; callers decide how to report it.
    pub async fn send<F>(&self, label: &str, mut make_request: F) -> Result<Response, HubError>
    where
        F: FnMut() -> RequestBuilder,
    {
        let mut attempt = 1;
        loop {
            let delay = match make_request().send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if !Self::is_transient_status(status) || attempt >= self.max_attempts {
                        return Ok(resp);
                    }
                    log::warn!(
                        "{} returned {} (attempt {}/{}), retrying",
                        label,
                        status,
                        attempt,
                        self.max_attempts
                    );
                    retry_after(&resp).unwrap_or_else(|| self.delay_for(attempt))
                }
                Err(e) => {
                    if !(e.is_timeout() || e.is_connect()) || attempt >= self.max_attempts {
                        return Err(e.into());
                    }
                    log::warn!(
                        "{} request failed (attempt {}/{}): {}",
                        label,
                        attempt,
                        self.max_attempts,
                        e
                    );
                    self.delay_for(attempt)
                }
            };
            tokio::time::sleep(delay.min(self.max_delay)).await;
            attempt += 1;
        }
    }
}

fn retry_after(resp: &Response) -> Option<Duration> {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

/// Client settings handed to every outbound integration
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
            retry: RetryPolicy::default(),
        }
    }
}

impl HttpOptions {
    /// Build a reqwest client carrying the per-request timeout
    pub fn client(&self) -> Result<Client, HubError> {
        Ok(Client::builder().timeout(self.timeout).build()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = RetryPolicy::new(5).with_base_delay(Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(3), Duration::from_millis(400));
        assert_eq!(policy.delay_for(30), policy.max_delay);
    }

    #[test]
    fn test_transient_statuses() {
        for code in [429u16, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(RetryPolicy::is_transient_status(status), "{code}");
        }
        for code in [200u16, 400, 401, 404, 422, 501] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(!RetryPolicy::is_transient_status(status), "{code}");
        }
    }

    #[test]
    fn test_at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0).max_attempts, 1);
    }
}
