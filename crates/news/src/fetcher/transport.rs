use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::errors::NewsError;

const USER_AGENT: &str = concat!("pulsefeed/", env!("CARGO_PKG_VERSION"));

/// Raw response from a feed endpoint.
#[derive(Clone, Debug)]
pub struct FeedResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl FeedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches raw feed documents.
///
/// Non-success statuses are returned as responses, not errors; only failures
/// to complete the exchange are errors.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FeedResponse, NewsError>;
}

/// `reqwest`-backed transport.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, NewsError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| NewsError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FeedTransport for HttpTransport {
    async fn get(&self, url: &str, timeout: Duration) -> Result<FeedResponse, NewsError> {
        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                NewsError::Timeout {
                    source_name: url.to_string(),
                }
            } else {
                NewsError::Network {
                    source_name: url.to_string(),
                    message: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_err)?;

        Ok(FeedResponse {
            status,
            body: body.to_vec(),
        })
    }
}
