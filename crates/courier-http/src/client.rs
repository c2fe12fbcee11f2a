//! Client entry point and process-wide shortcuts.

use bytes::Bytes;
use once_cell::sync::Lazy;
use std::sync::Arc;

use crate::builder::RequestBuilder;
use crate::config::ClientConfig;
use crate::dump::{DumpSink, TracingSink};
use crate::error::Result;
use crate::response::Response;
use crate::transport::Transport;

/// Owns a configuration and a transport; hands out request builders seeded
/// from them.
///
/// Cloning a `Client` is cheap and shares the transport.
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    transport: Transport,
    sink: Arc<dyn DumpSink>,
}

impl Client {
    /// Create a client with a custom config.
    pub fn new(config: ClientConfig) -> Self {
        let transport = Transport::new(config.user_agent.clone());
        Self {
            config: Arc::new(config),
            transport,
            sink: Arc::new(TracingSink),
        }
    }

    /// Create a client configured from the environment.
    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    /// Send debug dumps from every builder of this client to `sink`.
    pub fn with_sink(mut self, sink: Arc<dyn DumpSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The configuration new builders start from.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The client cache shared by every builder of this client.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Start a new request.
    pub fn request(&self) -> RequestBuilder {
        RequestBuilder::from_config(&self.config, self.transport.clone()).sink(Arc::clone(&self.sink))
    }

    /// Make a GET request.
    pub async fn get(&self, url: &str) -> Result<Response> {
        self.request().get(url).await
    }

    /// Make a HEAD request.
    pub async fn head(&self, url: &str) -> Result<Response> {
        self.request().head(url).await
    }

    /// Make a DELETE request.
    pub async fn delete(&self, url: &str) -> Result<Response> {
        self.request().delete(url).await
    }

    /// Make an OPTIONS request.
    pub async fn options(&self, url: &str) -> Result<Response> {
        self.request().options(url).await
    }

    /// Make a POST request with a raw body.
    pub async fn post(&self, url: &str, body: impl Into<Bytes>) -> Result<Response> {
        self.request().body(body).post(url).await
    }

    /// Make a PUT request with a raw body.
    pub async fn put(&self, url: &str, body: impl Into<Bytes>) -> Result<Response> {
        self.request().body(body).put(url).await
    }

    /// Make a PATCH request with a raw body.
    pub async fn patch(&self, url: &str, body: impl Into<Bytes>) -> Result<Response> {
        self.request().body(body).patch(url).await
    }
}

impl Default for Client {
    fn default() -> Self {
        Self::new(ClientConfig::default())
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("transport", &self.transport)
            .finish_non_exhaustive()
    }
}

static DEFAULT_CLIENT: Lazy<Client> = Lazy::new(Client::from_env);

/// The process-wide client used by the shortcut functions, configured from
/// the environment on first use.
///
/// Every shortcut call gets its own builder, so concurrent calls share only
/// the configuration and the transport.
pub fn default_client() -> &'static Client {
    &DEFAULT_CLIENT
}

/// GET `url` with the default client.
pub async fn get(url: &str) -> Result<Response> {
    default_client().get(url).await
}

/// HEAD `url` with the default client.
pub async fn head(url: &str) -> Result<Response> {
    default_client().head(url).await
}

/// DELETE `url` with the default client.
pub async fn delete(url: &str) -> Result<Response> {
    default_client().delete(url).await
}

/// OPTIONS `url` with the default client.
pub async fn options(url: &str) -> Result<Response> {
    default_client().options(url).await
}

/// POST `body` to `url` with the default client.
pub async fn post(url: &str, body: impl Into<Bytes>) -> Result<Response> {
    default_client().post(url, body).await
}

/// PUT `body` to `url` with the default client.
pub async fn put(url: &str, body: impl Into<Bytes>) -> Result<Response> {
    default_client().put(url, body).await
}

/// PATCH `body` to `url` with the default client.
pub async fn patch(url: &str, body: impl Into<Bytes>) -> Result<Response> {
    default_client().patch(url, body).await
}
