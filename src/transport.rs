//! Wire transport behind the client core

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::models::{ApiResponse, RequestDescriptor};
use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::{debug, warn};

/// Failures where no HTTP status is available
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The client-side timeout elapsed
    #[error("request timed out")]
    Timeout,

    /// Sent, but no response came back (refused, reset, DNS, ...)
    #[error("no response: {0}")]
    NoResponse(String),

    /// The request could not be built
    #[error("invalid request: {0}")]
    Construction(String),
}

impl TransportError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout)
    }
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ClientError::timeout(),
            TransportError::NoResponse(detail) => ClientError::no_response(detail),
            TransportError::Construction(detail) => ClientError::request_construction(detail),
        }
    }
}

/// Sends one prepared request. Any HTTP status counts as success here.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &RequestDescriptor) -> std::result::Result<ApiResponse, TransportError>;
}

/// Default transport over `reqwest`
pub struct ReqwestTransport {
    client: Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for `config.base_url` with `config.timeout_ms`
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Self::with_client(client, &config.base_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self> {
        // A trailing slash makes Url::join append instead of replacing the last segment
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized)
            .map_err(|e| ClientError::Config(format!("Invalid base_url '{}': {}", base_url, e)))?;

        Ok(ReqwestTransport { client, base_url })
    }

    fn url_for(&self, path: &str) -> std::result::Result<Url, TransportError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| TransportError::Construction(format!("invalid path '{}': {}", path, e)))
    }

    fn classify(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_builder() {
            TransportError::Construction(err.to_string())
        } else {
            TransportError::NoResponse(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &RequestDescriptor) -> std::result::Result<ApiResponse, TransportError> {
        let url = self.url_for(&request.path)?;
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), url.clone())
            .headers(request.headers.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("{} {} failed: {}", request.method, url, e);
            Self::classify(e)
        })?;

        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Self::classify)?;

        debug!("{} {} -> {} ({} bytes)", request.method, url, status, body.len());
        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
