//! Fluent HTTP requests.
//!
//! Build a request with chained calls on a [`RequestBuilder`], send it with a
//! verb method, and read the [`Response`] as text, bytes or JSON:
//!
//! ```no_run
//! # async fn run() -> courier_http::Result<()> {
//! use courier_http::Client;
//! use std::time::Duration;
//!
//! let client = Client::from_env();
//! let resp = client
//!     .request()
//!     .url("https://httpbin.org")
//!     .path("anything")
//!     .query("q", "rust")
//!     .json(r#"{"name":"courier"}"#)
//!     .timeout(Duration::from_secs(5))
//!     .retries(3)
//!     .post(None)
//!     .await?;
//!
//! let echoed: serde_json::Value = resp.into_json().await?;
//! # let _ = echoed;
//! # Ok(())
//! # }
//! ```

pub mod body;
pub mod builder;
pub mod client;
pub mod config;
pub mod dump;
pub mod encoding;
pub mod error;
pub mod executor;
pub mod request;
pub mod response;
pub mod transport;

pub use body::{BodyContent, FilePart, FileSource, MultipartWriter};
pub use builder::RequestBuilder;
pub use client::{default_client, delete, get, head, options, patch, post, put, Client};
pub use config::{ClientConfig, DEFAULT_TIMEOUT};
pub use dump::{format_response_head, DumpKind, DumpSink, TracingSink};
pub use error::{Error, Result};
pub use executor::Executor;
pub use request::{Cookie, ResolvedRequest};
pub use response::Response;
pub use transport::{Transport, TransportSettings, MAX_CACHED_CLIENTS};

pub use reqwest::{Method, StatusCode};
