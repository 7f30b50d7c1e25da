//! Mock network for testing
//!
//! Serves scripted responses keyed by URL, records every request it sees,
//! and can be switched offline to exercise the cache fallbacks.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::Network;
use crate::error::NetworkError;
use crate::http::{Request, Response};

/// Mock network for testing.
///
/// # Example
/// ```ignore
/// let network = MockNetwork::new()
///     .with_response("http://localhost/api/news", Response::new(200, "[]"))
///     .await;
/// network.set_offline(true).await;
/// ```
#[derive(Default, Clone)]
pub struct MockNetwork {
    /// Responses by full URL
    responses: Arc<Mutex<HashMap<String, Response>>>,
    /// URLs that fail with a transport error even while online
    failing: Arc<Mutex<Vec<String>>>,
    /// When set, every fetch fails to connect
    offline: Arc<Mutex<bool>>,
    /// Every request seen, in order
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
}

/// A captured request for test assertions.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub url: String,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Configure the response for a URL. Unknown URLs get a 404.
    pub async fn with_response(self, url: &str, response: Response) -> Self {
        self.set_response(url, response).await;
        self
    }

    /// Make one URL fail at the transport level.
    pub async fn with_failure(self, url: &str) -> Self {
        self.failing.lock().await.push(url.to_string());
        self
    }

    /// Replace the response for a URL after construction.
    pub async fn set_response(&self, url: &str, response: Response) {
        self.responses
            .lock()
            .await
            .insert(url.to_string(), response);
    }

    /// Toggle the simulated offline state.
    pub async fn set_offline(&self, offline: bool) {
        *self.offline.lock().await = offline;
    }

    /// Total number of fetches attempted (including failed ones).
    pub async fn call_count(&self) -> usize {
        self.captured.lock().await.len()
    }

    /// Number of fetches for one URL.
    pub async fn calls_for(&self, url: &str) -> usize {
        self.captured
            .lock()
            .await
            .iter()
            .filter(|c| c.url == url)
            .count()
    }

    /// Every request seen so far, in order.
    pub async fn captured_requests(&self) -> Vec<CapturedRequest> {
        self.captured.lock().await.clone()
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetworkError> {
        let url = request.url.to_string();
        self.captured.lock().await.push(CapturedRequest {
            method: request.method.to_string(),
            url: url.clone(),
        });

        if *self.offline.lock().await {
            return Err(NetworkError::Connect(format!("offline: {}", url)));
        }
        if self.failing.lock().await.contains(&url) {
            return Err(NetworkError::Connect(format!("mock failure for {}", url)));
        }

        let responses = self.responses.lock().await;
        Ok(responses
            .get(&url)
            .cloned()
            .unwrap_or_else(|| Response::new(404, "Not Found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Url;

    #[tokio::test]
    async fn test_offline_is_a_connect_failure() {
        let url = "http://localhost/api/news";
        let network = MockNetwork::new()
            .with_response(url, Response::new(200, "[]"))
            .await;
        let request = Request::get(Url::parse(url).unwrap());

        assert_eq!(network.fetch(&request).await.unwrap().status, 200);

        network.set_offline(true).await;
        let err = network.fetch(&request).await.unwrap_err();
        assert!(matches!(err, NetworkError::Connect(_)));
        assert_eq!(network.calls_for(url).await, 2);
    }
}
