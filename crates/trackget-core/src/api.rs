//! Lookup API client with bounded retry.
//!
//! One POST per attempt, 30 s per-attempt timeout, fixed 1 s delay between
//! attempts, no backoff. The server speaks a `{status: bool, ...}` envelope:
//! a missing or false status flag is an application-level failure regardless
//! of the HTTP code.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tracing::warn;

use crate::config::ApiConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request timed out")]
    Timeout,
    #[error("network error: {0}")]
    Network(reqwest::Error),
    #[error("server returned HTTP {0}")]
    Http(u16),
    #[error("{0}")]
    Server(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err)
        }
    }
}

/// Resolved track metadata from a successful lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackResult {
    pub title: String,
    pub artist: String,
    pub cover_url: Option<String>,
    pub duration_secs: Option<f64>,
    pub size_label: Option<String>,
    pub download_url: String,
}

/// Wire envelope returned by the lookup endpoint.
#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    status: bool,
    title: Option<String>,
    artist: Option<String>,
    cover: Option<String>,
    duration: Option<f64>,
    size: Option<String>,
    download_url: Option<String>,
    error: Option<String>,
    message: Option<String>,
}

impl LookupResponse {
    fn into_result(self) -> Result<TrackResult, FetchError> {
        if !self.status {
            let msg = self
                .error
                .or(self.message)
                .unwrap_or_else(|| "Failed to process track".to_string());
            return Err(FetchError::Server(msg));
        }

        let download_url = self
            .download_url
            .filter(|u| !u.is_empty())
            .ok_or_else(|| FetchError::Server("Response missing download link".to_string()))?;

        Ok(TrackResult {
            title: self.title.unwrap_or_else(|| "Unknown Track".to_string()),
            artist: self.artist.unwrap_or_else(|| "Unknown Artist".to_string()),
            cover_url: self.cover.filter(|c| !c.is_empty()),
            duration_secs: self.duration,
            size_label: self.size,
            download_url,
        })
    }
}

/// Fixed-delay retry budget.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Retries after the initial attempt.
    pub retries: u32,
    pub delay: Duration,
}

impl From<&ApiConfig> for RetryPolicy {
    fn from(config: &ApiConfig) -> Self {
        Self {
            retries: config.retries,
            delay: Duration::from_millis(config.retry_delay_ms),
        }
    }
}

/// Run `op` up to `1 + policy.retries` times with a fixed delay between
/// attempts. `notify` is called with the retry number before each wait so the
/// caller can surface "Retrying (n/m)" progress. The last error propagates
/// unchanged once the budget is spent.
pub async fn with_retry<T, F, Fut, N>(
    policy: RetryPolicy,
    mut notify: N,
    mut op: F,
) -> Result<T, FetchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, FetchError>>,
    N: FnMut(u32),
{
    let mut attempt = 0u32;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= policy.retries {
                    return Err(err);
                }
                attempt += 1;
                warn!("lookup attempt failed, retrying ({}/{}): {}", attempt, policy.retries, err);
                notify(attempt);
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}

/// HTTP client for the lookup endpoint.
pub struct TrackApi {
    client: reqwest::Client,
    endpoint: String,
    policy: RetryPolicy,
}

impl TrackApi {
    pub fn new(config: &ApiConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            policy: RetryPolicy::from(config),
        })
    }

    /// A reqwest client configured with the same per-attempt timeout,
    /// for HEAD checks and file downloads.
    pub fn http_client(&self) -> reqwest::Client {
        self.client.clone()
    }

    async fn lookup_once(&self, url: &str) -> Result<TrackResult, FetchError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Accept", "application/json")
            .json(&serde_json::json!({ "url": url }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FetchError::Http(response.status().as_u16()));
        }

        let body: LookupResponse = response.json().await?;
        body.into_result()
    }

    /// Resolve track metadata for a validated URL, retrying per the policy.
    pub async fn lookup<N: FnMut(u32)>(
        &self,
        url: &str,
        notify: N,
    ) -> Result<TrackResult, FetchError> {
        with_retry(self.policy, notify, || self.lookup_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    fn policy() -> RetryPolicy {
        RetryPolicy {
            retries: 3,
            delay: Duration::from_secs(1),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fails_twice_then_succeeds() {
        let calls = Cell::new(0u32);
        let started = tokio::time::Instant::now();

        let result = with_retry(policy(), |_| {}, || {
            let n = calls.get() + 1;
            calls.set(n);
            async move {
                if n <= 2 {
                    Err(FetchError::Timeout)
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.get(), 3);
        // Two fixed 1 s delays: 1→2 and 2→3.
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_budget_and_propagates_last_error() {
        let calls = Cell::new(0u32);
        let notified = RefCell::new(Vec::new());

        let result: Result<(), FetchError> = with_retry(
            policy(),
            |attempt| notified.borrow_mut().push(attempt),
            || {
                let n = calls.get() + 1;
                calls.set(n);
                async move { Err(FetchError::Server(format!("fail {}", n))) }
            },
        )
        .await;

        // 1 initial + 3 retries.
        assert_eq!(calls.get(), 4);
        assert_eq!(*notified.borrow(), vec![1, 2, 3]);
        match result {
            Err(FetchError::Server(msg)) => assert_eq!(msg, "fail 4"),
            other => panic!("expected last server error, got {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn test_immediate_success_skips_notify() {
        let notified = RefCell::new(Vec::new());
        let result = with_retry(
            policy(),
            |attempt| notified.borrow_mut().push(attempt),
            || async { Ok(42) },
        )
        .await;
        assert_eq!(result.unwrap(), 42);
        assert!(notified.borrow().is_empty());
    }

    #[test]
    fn test_envelope_status_false_uses_server_message() {
        let body: LookupResponse =
            serde_json::from_str(r#"{"status": false, "error": "no such track"}"#).unwrap();
        match body.into_result() {
            Err(FetchError::Server(msg)) => assert_eq!(msg, "no such track"),
            other => panic!("expected server error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_envelope_missing_status_is_server_failure() {
        let body: LookupResponse =
            serde_json::from_str(r#"{"message": "nope"}"#).unwrap();
        match body.into_result() {
            Err(FetchError::Server(msg)) => assert_eq!(msg, "nope"),
            other => panic!("expected server error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_envelope_success() {
        let body: LookupResponse = serde_json::from_str(
            r#"{"status": true, "title": "T", "artist": "A",
                "cover": "", "duration": 215.0, "size": "4.9 MB",
                "download_url": "http://x/y.mp3"}"#,
        )
        .unwrap();
        let track = body.into_result().unwrap();
        assert_eq!(track.title, "T");
        assert_eq!(track.artist, "A");
        assert_eq!(track.cover_url, None);
        assert_eq!(track.duration_secs, Some(215.0));
        assert_eq!(track.download_url, "http://x/y.mp3");
    }

    #[test]
    fn test_envelope_success_without_link_is_rejected() {
        let body: LookupResponse =
            serde_json::from_str(r#"{"status": true, "title": "T"}"#).unwrap();
        assert!(body.into_result().is_err());
    }
}
