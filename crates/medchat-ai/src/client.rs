//! HTTP client for the MedChat backend

use std::{pin::Pin, time::Duration};

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::Stream;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Error, Result},
    payload::ChatRequest,
};

/// Default backend address
pub const DEFAULT_BASE_URL: &str = "http://localhost:8500";

/// Raw response body as a stream of byte chunks
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>>> + Send>>;

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the backend, without a trailing `/api`
    pub base_url: String,
    /// Overall request timeout; `None` waits indefinitely
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Some(Duration::from_secs(300)),
        }
    }
}

/// Response of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub model_status: String,
    #[serde(default)]
    pub model: Option<String>,
}

impl HealthStatus {
    /// Whether the model behind the backend is ready to accept chats
    pub fn is_ready(&self) -> bool {
        self.model_status == "healthy"
    }
}

/// MedChat backend client
#[derive(Debug, Clone)]
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
}

impl ChatClient {
    /// Create a new client
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(Error::InvalidConfig(format!(
                "base_url must be an http(s) URL, got '{}'",
                config.base_url
            )));
        }

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Base URL this client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Query backend and model health
    pub async fn health(&self) -> Result<HealthStatus> {
        let url = format!("{}/api/health", self.base_url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::status(status.as_u16(), text));
        }

        Ok(response.json().await?)
    }

    /// Open a streaming chat request and return the raw response body.
    ///
    /// A non-2xx response is returned as [`Error::Status`] carrying the body
    /// text; the body is never handed to a decoder. Cancelling `cancel`
    /// before the response arrives yields [`Error::Aborted`].
    pub async fn open_chat(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream> {
        let url = format!("{}/api/chat", self.base_url);
        tracing::debug!(
            url = %url,
            messages = request.messages.len(),
            max_tokens = request.max_tokens,
            "opening chat stream"
        );

        let send = self
            .client
            .post(&url)
            .header("accept", "text/event-stream")
            .json(request)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Aborted),
            response = send => response?,
        };

        let status = response.status();
        if !status.is_success() {
            let body = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Error::Aborted),
                body = response.text() => body.unwrap_or_default(),
            };
            tracing::warn!(status = status.as_u16(), "chat request rejected");
            return Err(Error::status(status.as_u16(), body));
        }

        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(Error::from));
        Ok(Box::pin(body))
    }
}
