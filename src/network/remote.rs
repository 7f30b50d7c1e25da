//! reqwest-backed network implementation

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;

use super::Network;
use crate::error::{NetworkError, Result};
use crate::http::{Request, Response};

/// Performs requests against the real origin and API gateway
pub struct HttpNetwork {
    http: HttpClient,
}

impl HttpNetwork {
    /// Create a new network client with the given per-request timeout
    pub fn new(timeout: Duration) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .user_agent(concat!("nearly-offline/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(NetworkError::from)?;

        Ok(Self { http })
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> std::result::Result<Response, NetworkError> {
        let mut builder = self
            .http
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder.send().await?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        log::debug!("{} {} -> {}", request.method, request.url, status);

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
