//! The polled samples resource.
//!
//! `SampleSource` returns the raw JSON body; shape handling lives in
//! `extract`. Failures are classified into `FetchError` so the engine can
//! decide between retrying, clearing, or giving up.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("samples endpoint rejected the credential (401)")]
    Unauthorized,
    #[error("samples endpoint denied access (403)")]
    Forbidden,
    #[error("samples endpoint answered HTTP {0}")]
    Http(u16),
    #[error("samples request timed out")]
    Timeout,
    #[error("samples request failed: {0}")]
    Network(String),
    #[error("samples response is not valid JSON: {0}")]
    Malformed(String),
}

impl FetchError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Unauthorized => "unauthorized",
            FetchError::Forbidden => "forbidden",
            FetchError::Http(_) => "http",
            FetchError::Timeout => "timeout",
            FetchError::Network(_) => "network",
            FetchError::Malformed(_) => "malformed",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Timeout | FetchError::Network(_))
    }
}

#[async_trait]
pub trait SampleSource: Send + Sync {
    /// Fetch the samples listing using `token` as bearer credential.
    async fn fetch(&self, token: &str) -> Result<Value, FetchError>;
    fn name(&self) -> &'static str;
}

/// `GET <endpoint>` with `Authorization: Bearer <token>`.
#[derive(Debug, Clone)]
pub struct HttpSampleSource {
    endpoint: String,
    client: Client,
    timeout: Duration,
}

impl HttpSampleSource {
    pub fn new(endpoint: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("quotation-notify/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(4))
            .build()
            .context("building samples http client")?;
        Ok(Self {
            endpoint: endpoint.into(),
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl SampleSource for HttpSampleSource {
    async fn fetch(&self, token: &str) -> Result<Value, FetchError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .bearer_auth(token)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(classify)?;

        match resp.status() {
            StatusCode::UNAUTHORIZED => return Err(FetchError::Unauthorized),
            StatusCode::FORBIDDEN => return Err(FetchError::Forbidden),
            s if !s.is_success() => return Err(FetchError::Http(s.as_u16())),
            _ => {}
        }

        let body = resp.text().await.map_err(classify)?;
        serde_json::from_str(body.trim()).map_err(|e| FetchError::Malformed(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

fn classify(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else {
        FetchError::Network(e.to_string())
    }
}
