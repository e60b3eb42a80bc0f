//! Outbound HTTP with bounded retries.

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};

#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {status}: {body}")]
    Status { status: StatusCode, body: String },
}

impl HttpError {
    /// Connection failures, timeouts and 5xx responses are worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            HttpError::Transport(e) => e.is_connect() || e.is_timeout(),
            HttpError::Status { status, .. } => status.is_server_error(),
        }
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            HttpError::Transport(e) => e.status(),
            HttpError::Status { status, .. } => Some(*status),
        }
    }

    /// Message of an upstream `{"error": ...}` body, or the raw body.
    pub fn upstream_message(&self) -> Option<String> {
        let HttpError::Status { body, .. } = self else {
            return None;
        };
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.clone());
        Some(message)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    pub fn no_delay(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    /// Longest time [`send_with_retry`] can take when every attempt runs
    /// into `per_attempt` timeout.
    pub fn max_elapsed(&self, per_attempt: Duration) -> Duration {
        let attempts = self.max_attempts.max(1);
        let mut total = per_attempt * attempts;
        let mut delay = self.initial_backoff;
        for _ in 1..attempts {
            total += delay;
            delay = (delay * 2).min(self.max_backoff);
        }
        total
    }
}

/// Sends the request built by `build` until it succeeds, fails permanently, or
/// the policy runs out of attempts. Non-2xx responses become [`HttpError::Status`].
pub async fn send_with_retry<F>(policy: RetryPolicy, mut build: F) -> Result<Response, HttpError>
where
    F: FnMut() -> RequestBuilder,
{
    let attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match send_once(build()).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_transient() && attempt < attempts => {
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    delay_ms = delay.as_millis() as u64,
                    "Upstream request failed, retrying: {e}"
                );
                tokio::time::sleep(delay).await;
                delay = (delay * 2).min(policy.max_backoff);
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

async fn send_once(request: RequestBuilder) -> Result<Response, HttpError> {
    let response = request.send().await?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HttpError::Status { status, body })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_retries_server_errors_up_to_limit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/themes")
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/themes", server.url());
        let result = send_with_retry(RetryPolicy::no_delay(3), || client.get(&url)).await;

        mock.assert_async().await;
        let err = result.unwrap_err();
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/generate")
            .with_status(404)
            .with_body(r#"{"error":"theme not found: neon"}"#)
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/generate", server.url());
        let err = send_with_retry(RetryPolicy::no_delay(3), || client.post(&url))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
        assert_eq!(err.upstream_message().as_deref(), Some("theme not found: neon"));
    }

    #[test]
    fn test_max_elapsed_counts_backoff() {
        let policy = RetryPolicy::default();
        assert_eq!(
            policy.max_elapsed(Duration::from_secs(10)),
            Duration::from_millis(31_500)
        );
        assert_eq!(
            RetryPolicy::no_delay(1).max_elapsed(Duration::from_secs(2)),
            Duration::from_secs(2)
        );
    }

    #[tokio::test]
    async fn test_success_returns_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_body("ok")
            .expect(1)
            .create_async()
            .await;

        let client = reqwest::Client::new();
        let url = format!("{}/health", server.url());
        let response = send_with_retry(RetryPolicy::default(), || client.get(&url))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.text().await.unwrap(), "ok");
    }
}
