//! Transport abstraction for opening chat streams

use async_trait::async_trait;
use medchat_ai::{ByteStream, ChatClient, ChatRequest, ClientConfig, Result};
use tokio_util::sync::CancellationToken;

/// Opens the response body for one chat request.
///
/// A non-2xx response must be reported as [`medchat_ai::Error::Status`]
/// rather than handed back as a body.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ByteStream>;
}

/// Transport that talks to the MedChat backend over HTTP
pub struct HttpTransport {
    client: ChatClient,
}

impl HttpTransport {
    /// Create a transport from client configuration
    pub fn new(config: ClientConfig) -> crate::error::Result<Self> {
        Ok(Self {
            client: ChatClient::new(config)?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: ChatClient) -> Self {
        Self { client }
    }

    /// The underlying client, for health checks
    pub fn client(&self) -> &ChatClient {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open(&self, request: ChatRequest, cancel: CancellationToken) -> Result<ByteStream> {
        self.client.open_chat(&request, &cancel).await
    }
}
