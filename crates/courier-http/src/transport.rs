//! Shared transport.
//!
//! `reqwest::Client` settings such as the proxy or the connect timeout are
//! fixed when the client is built, while builders may change them per
//! request. A [`Transport`] therefore caches one client per distinct
//! [`TransportSettings`] and hands out cheap clones of it.
//!
//! The cache holds at most [`MAX_CACHED_CLIENTS`] clients. Building one more
//! evicts an existing entry; requests already holding the evicted client
//! finish on it unaffected.

use parking_lot::Mutex;
use reqwest::{Client, ClientBuilder, Proxy};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};

/// Upper bound on distinct clients kept by one [`Transport`].
pub const MAX_CACHED_CLIENTS: usize = 16;

/// Connection-level settings that require a dedicated `reqwest::Client`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TransportSettings {
    /// Proxy for all schemes. `None` lets reqwest read the system proxy
    /// variables.
    pub proxy: Option<String>,
    /// Limit on establishing the connection, TLS handshake included.
    pub connect_timeout: Option<Duration>,
}

/// A cache of configured HTTP clients, shared by every builder derived from
/// the same origin.
#[derive(Debug, Clone)]
pub struct Transport {
    inner: Arc<TransportInner>,
}

#[derive(Debug)]
struct TransportInner {
    user_agent: String,
    clients: Mutex<HashMap<TransportSettings, Client>>,
}

impl Transport {
    /// Create an empty transport. Clients are built on first use.
    pub fn new(user_agent: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(TransportInner {
                user_agent: user_agent.into(),
                clients: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Get or build the client for the given settings.
    pub fn client(&self, settings: &TransportSettings) -> Result<Client> {
        if let Some(client) = self.inner.clients.lock().get(settings) {
            return Ok(client.clone());
        }

        let client = build_client(&self.inner.user_agent, settings)?;
        tracing::debug!(?settings, "built HTTP client");

        let mut clients = self.inner.clients.lock();
        if clients.len() >= MAX_CACHED_CLIENTS && !clients.contains_key(settings) {
            if let Some(evicted) = clients.keys().next().cloned() {
                tracing::debug!(settings = ?evicted, "evicting cached HTTP client");
                clients.remove(&evicted);
            }
        }
        Ok(clients.entry(settings.clone()).or_insert(client).clone())
    }

    /// Whether two handles point at the same client cache.
    pub fn ptr_eq(&self, other: &Transport) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of distinct clients built so far.
    pub fn cached_clients(&self) -> usize {
        self.inner.clients.lock().len()
    }

    pub(crate) fn user_agent(&self) -> &str {
        &self.inner.user_agent
    }
}

fn build_client(user_agent: &str, settings: &TransportSettings) -> Result<Client> {
    let mut builder = ClientBuilder::new().user_agent(user_agent).gzip(true);

    if let Some(proxy) = &settings.proxy {
        let parsed = url::Url::parse(proxy)
            .map_err(|e| Error::config(format!("invalid proxy url {proxy:?}: {e}")))?;
        let proxy = Proxy::all(parsed)
            .map_err(|e| Error::config(format!("invalid proxy url {proxy:?}: {e}")))?;
        builder = builder.proxy(proxy);
    }

    if let Some(timeout) = settings.connect_timeout {
        builder = builder.connect_timeout(timeout);
    }

    builder
        .build()
        .map_err(|e| Error::config(format!("failed to build HTTP client: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_is_cached_per_settings() {
        let transport = Transport::new("test-agent");
        let defaults = TransportSettings::default();

        transport.client(&defaults).unwrap();
        transport.client(&defaults).unwrap();
        assert_eq!(transport.cached_clients(), 1);

        let tls = TransportSettings {
            proxy: None,
            connect_timeout: Some(Duration::from_secs(1)),
        };
        transport.client(&tls).unwrap();
        assert_eq!(transport.cached_clients(), 2);
    }

    #[test]
    fn test_cache_is_bounded() {
        let transport = Transport::new("test-agent");
        let settings = |ms: u64| TransportSettings {
            proxy: None,
            connect_timeout: Some(Duration::from_millis(ms)),
        };

        for ms in 1..=MAX_CACHED_CLIENTS as u64 + 4 {
            transport.client(&settings(ms)).unwrap();
        }
        assert_eq!(transport.cached_clients(), MAX_CACHED_CLIENTS);

        // A cached entry is reused without evicting anything.
        let newest = settings(MAX_CACHED_CLIENTS as u64 + 4);
        transport.client(&newest).unwrap();
        assert_eq!(transport.cached_clients(), MAX_CACHED_CLIENTS);
    }

    #[test]
    fn test_malformed_proxy_is_config_error() {
        let transport = Transport::new("test-agent");
        let settings = TransportSettings {
            proxy: Some("::not a url::".to_string()),
            connect_timeout: None,
        };

        let err = transport.client(&settings).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
        assert_eq!(transport.cached_clients(), 0);
    }

    #[test]
    fn test_clones_share_cache() {
        let transport = Transport::new("test-agent");
        let other = transport.clone();
        assert!(transport.ptr_eq(&other));
        assert!(!transport.ptr_eq(&Transport::new("test-agent")));
    }
}
