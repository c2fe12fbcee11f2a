//! Client configuration.
//!
//! A [`ClientConfig`] is built once, usually at process start, and seeds every
//! [`RequestBuilder`](crate::RequestBuilder) created from a
//! [`Client`](crate::Client). The environment is only consulted by
//! [`ClientConfig::from_env`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::time::Duration;

/// Default per-request deadline, so an unresponsive server cannot hang a caller.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// Environment variable names.
pub mod vars {
    /// `1`, `true` or `yes` turns on request/response dumps by default.
    pub const COURIER_DEBUG: &str = "COURIER_DEBUG";
    /// Default request timeout in milliseconds.
    pub const COURIER_TIMEOUT_MS: &str = "COURIER_TIMEOUT_MS";
    /// Default number of attempts on transport errors.
    pub const COURIER_RETRIES: &str = "COURIER_RETRIES";
    /// Default proxy URL.
    pub const COURIER_PROXY: &str = "COURIER_PROXY";
}

/// Settings shared by every request built from one client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Request deadline in milliseconds. Zero disables the deadline.
    pub timeout_ms: u64,
    /// Connect and TLS handshake limit in milliseconds.
    pub tls_handshake_timeout_ms: Option<u64>,
    /// Attempts on transport errors. Values of 0 or 1 send once.
    pub retries: u32,
    /// Dump every request and response through the diagnostic sink.
    pub debug: bool,
    /// Proxy URL for every request.
    pub proxy: Option<String>,
    /// User agent sent by the transport.
    pub user_agent: String,
    /// Base URL for every request.
    pub base_url: Option<String>,
    /// Headers added to every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            tls_handshake_timeout_ms: None,
            retries: 0,
            debug: false,
            proxy: None,
            user_agent: format!("courier/{}", env!("CARGO_PKG_VERSION")),
            base_url: None,
            headers: BTreeMap::new(),
        }
    }
}

impl ClientConfig {
    /// Build the configuration from environment variables, falling back to
    /// defaults for anything unset or unparsable.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(debug) = env_bool(vars::COURIER_DEBUG) {
            config.debug = debug;
        }

        if let Some(timeout) = env_parse::<u64>(vars::COURIER_TIMEOUT_MS) {
            config.timeout_ms = timeout;
        }

        if let Some(retries) = env_parse::<u32>(vars::COURIER_RETRIES) {
            config.retries = retries;
        }

        if let Ok(proxy) = env::var(vars::COURIER_PROXY) {
            if !proxy.is_empty() {
                config.proxy = Some(proxy);
            }
        }

        config
    }

    /// Request deadline as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// TLS handshake limit as a [`Duration`].
    pub fn tls_handshake_timeout(&self) -> Option<Duration> {
        self.tls_handshake_timeout_ms.map(Duration::from_millis)
    }
}

fn env_bool(var: &str) -> Option<bool> {
    env::var(var)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    env::var(var).ok().and_then(|v| v.trim().parse().ok())
}
