//! HTTP client utilities.

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, RequestBuilder};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::SourceError;

/// Shared HTTP client with sensible defaults and optional request throttling
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Arc<Client>,
    limiter: Option<Arc<DefaultDirectRateLimiter>>,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, SourceError> {
        Self::with_user_agent(
            concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),
            Duration::from_secs(30),
        )
    }

    /// Create a new HTTP client with a custom user agent and request timeout
    pub fn with_user_agent(user_agent: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| SourceError::Network(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            limiter: None,
        })
    }

    /// Throttle outgoing requests to at most `per_second` per second.
    ///
    /// A rate of zero disables throttling.
    pub fn rate_limited(mut self, per_second: u32) -> Self {
        self.limiter = NonZeroU32::new(per_second)
            .map(|rate| Arc::new(RateLimiter::direct(Quota::per_second(rate))));
        self
    }

    /// Start a GET request, waiting for a rate-limit slot first
    pub async fn get(&self, url: &str) -> RequestBuilder {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
        tracing::debug!("GET {}", url);
        self.client.get(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limited_client_sends_requests() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ping")
            .with_status(200)
            .with_body("pong")
            .expect(2)
            .create_async()
            .await;

        let client = HttpClient::new().unwrap().rate_limited(50);
        for _ in 0..2 {
            let body = client
                .get(&format!("{}/ping", server.url()))
                .await
                .send()
                .await
                .unwrap()
                .text()
                .await
                .unwrap();
            assert_eq!(body, "pong");
        }
        mock.assert_async().await;
    }

    #[test]
    fn test_zero_rate_disables_limiter() {
        let client = HttpClient::new().unwrap().rate_limited(0);
        assert!(client.limiter.is_none());
    }
}
