//! HTTP client abstraction for testability.
//!
//! Providers are generic over [`HttpClient`] so unit tests can substitute
//! scripted responses without a network. The real implementation is
//! [`ReqwestClient`].

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Errors raised by network fetches.
#[derive(Clone, Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connection, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// Server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Response body was not the JSON the caller expected.
    #[error("invalid JSON from {url}: {reason}")]
    Json { url: String, reason: String },
}

/// Trait for HTTP client operations.
///
/// This abstraction allows for dependency injection and easier testing
/// by enabling mock HTTP clients in tests.
pub trait HttpClient: Send + Sync {
    /// Performs an HTTP GET request and returns the raw response body.
    fn get_bytes(&self, url: &str) -> impl Future<Output = Result<Bytes, FetchError>> + Send;

    /// Performs an HTTP GET request with a query string and parses the
    /// response body as JSON.
    fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> impl Future<Output = Result<Value, FetchError>> + Send;
}

/// Real HTTP client implementation using reqwest.
#[derive(Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    /// Creates a new ReqwestClient with default configuration.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeout(DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a new ReqwestClient with custom timeout.
    pub fn with_timeout(timeout_secs: u64) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| FetchError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    async fn send(&self, request: reqwest::RequestBuilder, url: &str) -> Result<Bytes, FetchError> {
        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Http(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| FetchError::Http(format!("Failed to read response: {}", e)))
    }
}

impl HttpClient for ReqwestClient {
    async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        self.send(self.client.get(url), url).await
    }

    async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
        let body = self.send(self.client.get(url).query(query), url).await?;
        serde_json::from_slice(&body).map_err(|e| FetchError::Json {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    /// Mock HTTP client for testing.
    ///
    /// Byte responses are keyed by exact URL; JSON responses are served in
    /// the order they were queued. Every request URL (including the query
    /// string, unencoded) is recorded for assertions.
    #[derive(Default)]
    pub struct MockHttpClient {
        byte_responses: HashMap<String, Result<Bytes, FetchError>>,
        json_responses: Mutex<Vec<Result<Value, FetchError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl MockHttpClient {
        pub fn new() -> Self {
            Self::default()
        }

        /// Registers a byte response for an exact URL.
        pub fn with_bytes(mut self, url: &str, response: Result<Bytes, FetchError>) -> Self {
            self.byte_responses.insert(url.to_string(), response);
            self
        }

        /// Queues a JSON response; responses are consumed front to back.
        pub fn with_json(self, response: Result<Value, FetchError>) -> Self {
            self.json_responses.lock().push(response);
            self
        }

        /// All request URLs seen so far, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.lock().clone()
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().len()
        }
    }

    impl HttpClient for MockHttpClient {
        async fn get_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
            self.requests.lock().push(url.to_string());
            self.byte_responses
                .get(url)
                .cloned()
                .unwrap_or_else(|| {
                    Err(FetchError::Status {
                        status: 404,
                        url: url.to_string(),
                    })
                })
        }

        async fn get_json(&self, url: &str, query: &[(&str, &str)]) -> Result<Value, FetchError> {
            let query_string = query
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join("&");
            self.requests.lock().push(format!("{}?{}", url, query_string));

            let mut responses = self.json_responses.lock();
            if responses.is_empty() {
                return Err(FetchError::Status {
                    status: 404,
                    url: url.to_string(),
                });
            }
            responses.remove(0)
        }
    }

    #[tokio::test]
    async fn test_mock_client_bytes_success() {
        let mock = MockHttpClient::new()
            .with_bytes("http://example.com/a", Ok(Bytes::from_static(&[1, 2, 3])));

        let result = mock.get_bytes("http://example.com/a").await;
        assert_eq!(result.unwrap(), Bytes::from_static(&[1, 2, 3]));
        assert_eq!(mock.request_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_client_unknown_url_is_404() {
        let mock = MockHttpClient::new();

        let result = mock.get_bytes("http://example.com/missing").await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_mock_client_json_order_and_recording() {
        let mock = MockHttpClient::new()
            .with_json(Ok(serde_json::json!({"n": 1})))
            .with_json(Ok(serde_json::json!({"n": 2})));

        let first = mock.get_json("http://api", &[("q", "x")]).await.unwrap();
        let second = mock.get_json("http://api", &[]).await.unwrap();
        assert_eq!(first["n"], 1);
        assert_eq!(second["n"], 2);
        assert_eq!(mock.requests()[0], "http://api?q=x");
    }
}
