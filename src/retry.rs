use std::time::Duration;

use crate::error::{AppError, Result};

/// Per-call settings for the resilient request client.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Hard timeout applied to every individual attempt.
    pub timeout: Duration,
    /// Extra attempts after the first one.
    pub max_retries: u32,
    /// Base delay between attempts. The delay before attempt n is
    /// `base_delay * n` (linear backoff).
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(timeout: Duration, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            base_delay,
        }
    }
}

/// A resilient wrapper around a single request/response exchange.
///
/// Retries on network-level failures (connection refused, timeout) and on
/// HTTP 5xx. A 4xx response is final and returned to the caller as-is, and
/// so is a 5xx on the last attempt: callers decide how to surface it.
#[derive(Clone)]
pub struct RetryClient {
    client: reqwest::Client,
    policy: RetryPolicy,
}

impl RetryClient {
    /// Creates a new `RetryClient` over a shared `reqwest::Client`.
    pub fn new(client: reqwest::Client, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Executes `request`, retrying transient failures per the policy.
    ///
    /// # Arguments
    ///
    /// * `request` - The request to send. It is cloned per attempt; a request
    ///   with a streaming body cannot be cloned and gets a single attempt.
    ///
    /// # Returns
    ///
    /// The first conclusive `reqwest::Response`, or the last observed
    /// transport error once retries are exhausted.
    pub async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        let mut last_err: Option<AppError> = None;

        for attempt in 0..=self.policy.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.policy.base_delay * attempt).await;
            }

            let mut req = match request.try_clone() {
                Some(r) => r,
                None => {
                    // Streaming body: single shot, no retries possible.
                    let mut req = request;
                    *req.timeout_mut() = Some(self.policy.timeout);
                    return self.client.execute(req).await.map_err(AppError::from);
                }
            };
            *req.timeout_mut() = Some(self.policy.timeout);

            match self.client.execute(req).await {
                Ok(resp) => {
                    if resp.status().is_server_error() && attempt < self.policy.max_retries {
                        tracing::warn!(
                            "Upstream returned {} on attempt {}, retrying",
                            resp.status(),
                            attempt + 1
                        );
                        last_err = Some(AppError::Upstream(format!(
                            "upstream returned {}",
                            resp.status()
                        )));
                        continue;
                    }
                    return Ok(resp);
                }
                Err(e) => {
                    tracing::warn!("Upstream request failed on attempt {}: {}", attempt + 1, e);
                    last_err = Some(AppError::Upstream(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| AppError::Upstream("Unknown network error".to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, extract::State, http::StatusCode, routing::get};
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn spawn_server(router: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    fn test_policy() -> RetryPolicy {
        RetryPolicy::new(Duration::from_secs(2), 2, Duration::from_millis(1))
    }

    async fn flaky(State(state): State<Arc<(AtomicUsize, usize)>>) -> (StatusCode, &'static str) {
        let n = state.0.fetch_add(1, Ordering::SeqCst);
        if n < state.1 {
            (StatusCode::SERVICE_UNAVAILABLE, "try later")
        } else {
            (StatusCode::OK, "ok")
        }
    }

    #[tokio::test]
    async fn succeeds_on_third_attempt_after_two_503s() {
        let hits = Arc::new((AtomicUsize::new(0), 2usize));
        let addr = spawn_server(
            Router::new()
                .route("/", get(flaky))
                .with_state(hits.clone()),
        )
        .await;

        let http = reqwest::Client::new();
        let client = RetryClient::new(http.clone(), test_policy());
        let req = http.get(format!("http://{addr}/")).build().unwrap();

        let resp = client.execute(req).await.unwrap();
        assert_eq!(resp.status().as_u16(), 200);
        assert_eq!(hits.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn returns_final_5xx_after_exactly_three_attempts() {
        let hits = Arc::new((AtomicUsize::new(0), usize::MAX));
        let addr = spawn_server(
            Router::new()
                .route("/", get(flaky))
                .with_state(hits.clone()),
        )
        .await;

        let http = reqwest::Client::new();
        let client = RetryClient::new(http.clone(), test_policy());
        let req = http.get(format!("http://{addr}/")).build().unwrap();

        let resp = client.execute(req).await.unwrap();
        assert_eq!(resp.status().as_u16(), 503);
        assert_eq!(hits.0.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn does_not_retry_4xx() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let addr = spawn_server(Router::new().route(
            "/",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { (StatusCode::UNPROCESSABLE_ENTITY, "bad") }
            }),
        ))
        .await;

        let http = reqwest::Client::new();
        let client = RetryClient::new(http.clone(), test_policy());
        let req = http.get(format!("http://{addr}/")).build().unwrap();

        let resp = client.execute(req).await.unwrap();
        assert_eq!(resp.status().as_u16(), 422);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn surfaces_last_error_when_nothing_listens() {
        // Bind and immediately drop to get a port with no listener.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let http = reqwest::Client::new();
        let client = RetryClient::new(http.clone(), test_policy());
        let req = http.get(format!("http://{addr}/")).build().unwrap();

        let err = client.execute(req).await.unwrap_err();
        assert!(matches!(err, AppError::Upstream(_)));
    }
}
