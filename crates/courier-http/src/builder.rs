//! Fluent request builder.
//!
//! A [`RequestBuilder`] accumulates configuration through chained calls and
//! turns it into one [`ResolvedRequest`] when a verb such as
//! [`get`](RequestBuilder::get) is awaited:
//!
//! ```no_run
//! # async fn run() -> courier_http::Result<()> {
//! use courier_http::RequestBuilder;
//!
//! let api = RequestBuilder::new()
//!     .url("https://api.github.com")
//!     .basic_auth("octocat", "secret");
//!
//! let user = api.derive_sharing_transport().path("users/octocat").get(None).await?;
//! let repos = api.derive_sharing_transport().path("/repos/").get(None).await?;
//! # let _ = (user, repos);
//! # Ok(())
//! # }
//! ```
//!
//! # Copying builders
//!
//! `RequestBuilder` does not implement `Clone`. Pick one of:
//!
//! * [`derive_sharing_transport`](RequestBuilder::derive_sharing_transport):
//!   URL, path, query map, headers, auth, body and every scalar policy are
//!   copied. The structured query list, the cookie list, the file list, the
//!   transport and the dump sink are shared: a file added through either
//!   builder is seen by both.
//! * [`independent_copy`](RequestBuilder::independent_copy): everything is
//!   copied, including a fresh transport. Nothing is shared.

use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::header::{HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::body::{encode_multipart, BodyContent, FilePart, FileSource, CONTENT_TYPE_FORM, CONTENT_TYPE_JSON};
use crate::config::ClientConfig;
use crate::dump::{DumpSink, TracingSink};
use crate::encoding::{encode_canonical, encode_pairs, is_absent, join_path, Pairs};
use crate::error::{Error, Result};
use crate::executor::Executor;
use crate::request::{Cookie, ResolvedRequest};
use crate::response::Response;
use crate::transport::{Transport, TransportSettings};

type Shared<T> = Arc<Mutex<T>>;

/// An encoded structured query value, or the encoder's complaint about it.
type QueryStruct = std::result::Result<Pairs, String>;

const CONTENT_TYPE_KEY: &str = "content-type";

/// Chainable request configuration.
pub struct RequestBuilder {
    transport: Transport,
    sink: Arc<dyn DumpSink>,
    url: String,
    path: Vec<String>,
    query: BTreeMap<String, String>,
    query_structs: Shared<Vec<QueryStruct>>,
    /// Keyed by lower-cased header name.
    headers: BTreeMap<String, String>,
    cookies: Shared<Vec<Cookie>>,
    auth: Option<(String, String)>,
    body: BodyContent,
    files: Shared<Vec<FilePart>>,
    proxy: Option<String>,
    timeout: Duration,
    tls_handshake_timeout: Option<Duration>,
    retries: u32,
    debug: bool,
}

impl RequestBuilder {
    /// A builder with default settings and its own transport.
    ///
    /// The environment is not consulted; use
    /// [`Client::from_env`](crate::Client::from_env) for that.
    pub fn new() -> Self {
        let config = ClientConfig::default();
        Self::from_config(&config, Transport::new(config.user_agent.clone()))
    }

    /// A builder seeded from a client configuration.
    pub fn from_config(config: &ClientConfig, transport: Transport) -> Self {
        Self {
            transport,
            sink: Arc::new(TracingSink),
            url: config.base_url.clone().unwrap_or_default(),
            path: Vec::new(),
            query: BTreeMap::new(),
            query_structs: Arc::default(),
            headers: config
                .headers
                .iter()
                .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
                .collect(),
            cookies: Arc::default(),
            auth: None,
            body: BodyContent::Empty,
            files: Arc::default(),
            proxy: config.proxy.clone().filter(|p| !p.is_empty()),
            timeout: config.timeout(),
            tls_handshake_timeout: config.tls_handshake_timeout(),
            retries: config.retries,
            debug: config.debug,
        }
    }

    /// A builder sharing this one's transport, sink, structured queries,
    /// cookies and files. Everything else is copied.
    pub fn derive_sharing_transport(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            sink: Arc::clone(&self.sink),
            url: self.url.clone(),
            path: self.path.clone(),
            query: self.query.clone(),
            query_structs: Arc::clone(&self.query_structs),
            headers: self.headers.clone(),
            cookies: Arc::clone(&self.cookies),
            auth: self.auth.clone(),
            body: self.body.clone(),
            files: Arc::clone(&self.files),
            proxy: self.proxy.clone(),
            timeout: self.timeout,
            tls_handshake_timeout: self.tls_handshake_timeout,
            retries: self.retries,
            debug: self.debug,
        }
    }

    /// A builder that shares nothing mutable with this one, transport
    /// included.
    pub fn independent_copy(&self) -> Self {
        Self {
            transport: Transport::new(self.transport.user_agent()),
            query_structs: Arc::new(Mutex::new(self.query_structs.lock().clone())),
            cookies: Arc::new(Mutex::new(self.cookies.lock().clone())),
            files: Arc::new(Mutex::new(self.files.lock().clone())),
            ..self.derive_sharing_transport()
        }
    }

    /// Set the base URL. An empty string leaves the current one in place.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() {
            self.url = url;
        }
        self
    }

    /// Append a path segment. Empty segments are ignored.
    pub fn path(mut self, segment: impl AsRef<str>) -> Self {
        let segment = segment.as_ref();
        if !segment.is_empty() {
            self.path.push(segment.to_string());
        }
        self
    }

    /// Append several path segments in order.
    pub fn paths<I, S>(self, segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        segments.into_iter().fold(self, |builder, s| builder.path(s))
    }

    /// Set one query parameter, replacing an earlier value for the same key.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(key.into(), value.into());
        self
    }

    /// Add every field of a struct (or entry of a map) as query parameters.
    ///
    /// Keys are added, never replaced, so they may repeat keys set by
    /// [`query`](Self::query). A value the encoder cannot handle makes the
    /// request fail when it is sent.
    pub fn query_struct<T: Serialize + ?Sized>(self, value: &T) -> Self {
        self.query_structs.lock().push(encode_pairs(value));
        self
    }

    /// Set one header, replacing an earlier value for the same name.
    pub fn header(mut self, key: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(key.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    /// Send a cookie. `None` is ignored.
    pub fn cookie(self, cookie: impl Into<Option<Cookie>>) -> Self {
        if let Some(cookie) = cookie.into() {
            self.cookies.lock().push(cookie);
        }
        self
    }

    /// Use HTTP basic authentication. Applied only when both parts are
    /// non-empty.
    pub fn basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.auth = Some((username.into(), password.into()));
        self
    }

    /// Add bearer token authorization.
    pub fn bearer_auth(self, token: impl AsRef<str>) -> Self {
        let value = format!("Bearer {}", token.as_ref());
        self.header("authorization", value)
    }

    /// Send `text` verbatim as an `application/json` body. Empty text is
    /// ignored.
    pub fn json(mut self, text: impl Into<String>) -> Self {
        let text = text.into();
        if !text.is_empty() {
            self.body = BodyContent::Json(text);
            self = self.header(CONTENT_TYPE_KEY, CONTENT_TYPE_JSON);
        }
        self
    }

    /// Send `value` encoded as JSON. A value that serializes to `null` is
    /// ignored.
    pub fn json_struct<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        let body = match serde_json::to_string(value) {
            Ok(text) if text == "null" => return self,
            Ok(text) => BodyContent::Json(text),
            Err(e) => BodyContent::Unencodable(format!("json: {e}")),
        };
        self.body = body;
        self.header(CONTENT_TYPE_KEY, CONTENT_TYPE_JSON)
    }

    /// Send the fields of `value` as an `application/x-www-form-urlencoded`
    /// body, sorted by key. A value that serializes to `null` is ignored.
    pub fn form<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        if is_absent(value) {
            return self;
        }
        self.body = match encode_pairs(value) {
            Ok(pairs) => BodyContent::Form(encode_canonical(
                pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            )),
            Err(e) => BodyContent::Unencodable(format!("form: {e}")),
        };
        self.header(CONTENT_TYPE_KEY, CONTENT_TYPE_FORM)
    }

    /// Send raw bytes. No content type is set. An empty body is ignored.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        if !body.is_empty() {
            self.body = BodyContent::Raw(body);
        }
        self
    }

    /// Upload a file as one part of a `multipart/form-data` body. Repeated
    /// calls add parts in order.
    pub fn file(
        mut self,
        source: impl Into<FileSource>,
        filename: impl Into<String>,
        field_name: impl Into<String>,
    ) -> Self {
        self.files.lock().push(FilePart {
            field_name: field_name.into(),
            filename: filename.into(),
            source: source.into(),
        });
        self.body = BodyContent::Multipart;
        self
    }

    /// Route requests through a proxy. An empty string keeps the current one.
    pub fn proxy(mut self, proxy: impl Into<String>) -> Self {
        let proxy = proxy.into();
        if !proxy.is_empty() {
            self.proxy = Some(proxy);
        }
        self
    }

    /// Deadline for each attempt, covering connect, send and body read.
    /// Zero disables it.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Limit on the connect and TLS handshake phase.
    pub fn tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = Some(timeout);
        self
    }

    /// Attempts on transport errors. 0 and 1 both send once.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Dump requests and responses through the diagnostic sink.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the diagnostic sink.
    pub fn sink(mut self, sink: Arc<dyn DumpSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The base URL as last set.
    pub fn base_url(&self) -> &str {
        &self.url
    }

    /// Path segments appended so far, in order.
    pub fn path_segments(&self) -> &[String] {
        &self.path
    }

    /// The value set for a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// The body as currently configured.
    pub fn body_content(&self) -> &BodyContent {
        &self.body
    }

    /// Number of files queued for the multipart body.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }

    /// Number of cookies queued.
    pub fn cookie_count(&self) -> usize {
        self.cookies.lock().len()
    }

    /// Attempt limit on transport errors.
    pub fn retry_limit(&self) -> u32 {
        self.retries
    }

    /// Overall per-attempt timeout.
    pub fn request_timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether request and response dumps are enabled.
    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// The client cache this builder sends through.
    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Turn the accumulated configuration into a concrete request without
    /// sending it.
    pub async fn resolve(&self, method: Method) -> Result<ResolvedRequest> {
        let (multipart_type, body) = self.resolve_body().await?;

        let mut request = ResolvedRequest::new(method, self.parse_url()?, body);

        if !self.path.is_empty() {
            let joined = join_path(
                request.url().path(),
                self.path.iter().map(String::as_str),
            );
            request.url_mut().set_path(&joined);
        }

        self.merge_query(&mut request)?;

        request.apply_headers(&self.headers)?;
        if let Some(content_type) = multipart_type {
            let value = HeaderValue::from_str(&content_type)
                .map_err(|e| Error::encoding(format!("multipart content type: {e}")))?;
            request.set_header(CONTENT_TYPE, value);
        }

        let cookies = self.cookies.lock().clone();
        request.apply_cookies(&cookies)?;

        if let Some((username, password)) = &self.auth {
            request.apply_basic_auth(username, password)?;
        }

        request.set_timeout((!self.timeout.is_zero()).then_some(self.timeout));
        Ok(request)
    }

    async fn resolve_body(&self) -> Result<(Option<String>, Option<Bytes>)> {
        match &self.body {
            BodyContent::Empty => Ok((None, None)),
            BodyContent::Raw(bytes) => Ok((None, Some(bytes.clone()))),
            BodyContent::Json(text) | BodyContent::Form(text) => {
                Ok((None, Some(Bytes::from(text.clone()))))
            }
            BodyContent::Multipart => {
                let files = self.files.lock().clone();
                if files.is_empty() {
                    return Ok((None, None));
                }
                let (content_type, body) = encode_multipart(&files).await?;
                Ok((Some(content_type), Some(body)))
            }
            BodyContent::Unencodable(message) => Err(Error::encoding(message.clone())),
        }
    }

    fn parse_url(&self) -> Result<Url> {
        if self.url.is_empty() {
            return Err(Error::config("no URL set"));
        }

        let url = Url::parse(&self.url)
            .map_err(|e| Error::config(format!("invalid url {:?}: {e}", self.url)))?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            scheme => Err(Error::config(format!(
                "unsupported url scheme {scheme:?} in {:?}",
                self.url
            ))),
        }
    }

    /// Merge the URL's own query, the simple map and every structured value,
    /// then write them back in canonical order.
    fn merge_query(&self, request: &mut ResolvedRequest) -> Result<()> {
        let structs = self.query_structs.lock().clone();
        if self.query.is_empty() && structs.is_empty() {
            return Ok(());
        }

        let mut pairs: Pairs = request.url().query_pairs().into_owned().collect();
        pairs.extend(self.query.iter().map(|(k, v)| (k.clone(), v.clone())));

        for encoded in structs {
            let encoded = encoded
                .map_err(|e| Error::config(format!("cannot encode query struct: {e}")))?;
            pairs.extend(encoded);
        }

        let query = encode_canonical(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        request
            .url_mut()
            .set_query((!query.is_empty()).then_some(query.as_str()));
        Ok(())
    }

    fn transport_settings(&self) -> TransportSettings {
        TransportSettings {
            proxy: self.proxy.clone(),
            connect_timeout: self.tls_handshake_timeout,
        }
    }

    /// Send the request with `method`.
    ///
    /// A non-empty `url` replaces the builder's base URL, for this call and
    /// every later one.
    pub async fn execute<'u>(
        &mut self,
        method: Method,
        url: impl Into<Option<&'u str>>,
    ) -> Result<Response> {
        if let Some(url) = url.into().filter(|u| !u.is_empty()) {
            self.url = url.to_string();
        }

        let client = self.transport.client(&self.transport_settings())?;
        let request = self.resolve(method).await?;

        Executor::new(client)
            .retries(self.retries)
            .debug(self.debug)
            .sink(Arc::clone(&self.sink))
            .execute(&request)
            .await
    }

    /// Send a GET request.
    pub async fn get<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::GET, url).await
    }

    /// Send a POST request.
    pub async fn post<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::POST, url).await
    }

    /// Send a PUT request.
    pub async fn put<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::PUT, url).await
    }

    /// Send a PATCH request.
    pub async fn patch<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::PATCH, url).await
    }

    /// Send a DELETE request.
    pub async fn delete<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::DELETE, url).await
    }

    /// Like GET, but the server sends no body.
    pub async fn head<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::HEAD, url).await
    }

    /// Send an OPTIONS request.
    pub async fn options<'u>(&mut self, url: impl Into<Option<&'u str>>) -> Result<Response> {
        self.execute(Method::OPTIONS, url).await
    }
}

impl Default for RequestBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("query", &self.query)
            .field("headers", &self.headers.keys().collect::<Vec<_>>())
            .field("body", &self.body)
            .field("files", &self.file_count())
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("retries", &self.retries)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
