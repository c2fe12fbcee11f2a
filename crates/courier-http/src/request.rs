//! Resolved requests and the request-side value types.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, COOKIE};
use reqwest::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

/// A cookie to send with a request.
///
/// Only the name and value travel in the `Cookie` header; the attributes are
/// kept so callers can pass cookies they received without stripping them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub max_age: Option<Duration>,
    pub secure: bool,
    pub http_only: bool,
}

impl Cookie {
    /// Create a cookie with no attributes.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Set the `Path` attribute.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the `Domain` attribute.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Set the `Max-Age` attribute.
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    /// Mark the cookie `Secure`.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Mark the cookie `HttpOnly`.
    pub fn http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    /// The `name=value` form used in a `Cookie` request header.
    ///
    /// Bytes that cannot appear in a cookie are dropped, so a value such as
    /// `abc;admin=true` can never smuggle a second cookie into the header.
    pub fn pair(&self) -> String {
        let name = sanitize_cookie_name(&self.name);
        let value = sanitize_cookie_value(&self.value);
        if value.contains([' ', ',']) {
            format!("{name}=\"{value}\"")
        } else {
            format!("{name}={value}")
        }
    }
}

/// Keep only RFC 7230 token characters; CR and LF become `-`.
fn sanitize_cookie_name(name: &str) -> String {
    name.chars()
        .filter_map(|c| match c {
            '\r' | '\n' => Some('-'),
            c if c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c) => Some(c),
            _ => None,
        })
        .collect()
}

/// Drop control characters, non-ASCII, `"`, `;` and `\`.
fn sanitize_cookie_value(value: &str) -> String {
    value
        .chars()
        .filter(|&c| (' '..='~').contains(&c) && !matches!(c, '"' | ';' | '\\'))
        .collect()
}

/// One concrete outbound request, ready to be sent as many times as the
/// retry policy needs.
#[derive(Debug, Clone)]
pub struct ResolvedRequest {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Bytes>,
    timeout: Option<Duration>,
}

impl ResolvedRequest {
    pub(crate) fn new(method: Method, url: Url, body: Option<Bytes>) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body,
            timeout: None,
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The full URL, query included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub(crate) fn url_mut(&mut self) -> &mut Url {
        &mut self.url
    }

    /// Headers to send.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// The body bytes, if any.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Deadline for each attempt.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub(crate) fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    pub(crate) fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Set every header, replacing values already present under the same name.
    pub(crate) fn apply_headers(&mut self, headers: &BTreeMap<String, String>) -> Result<()> {
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::config(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::from_str(value).map_err(|e| {
                Error::config(format!("invalid value for header {name}: {e}"))
            })?;
            self.headers.insert(name, value);
        }
        Ok(())
    }

    /// Add cookies to the `Cookie` header, after any cookie pairs already set.
    pub(crate) fn apply_cookies(&mut self, cookies: &[Cookie]) -> Result<()> {
        if cookies.is_empty() {
            return Ok(());
        }

        let mut pairs: Vec<String> = Vec::with_capacity(cookies.len() + 1);
        if let Some(existing) = self.headers.get(COOKIE).and_then(|v| v.to_str().ok()) {
            pairs.push(existing.to_string());
        }
        pairs.extend(cookies.iter().map(Cookie::pair));

        let value = HeaderValue::from_str(&pairs.join("; "))
            .map_err(|e| Error::config(format!("invalid cookie: {e}")))?;
        self.headers.insert(COOKIE, value);
        Ok(())
    }

    /// Set `Authorization: Basic ...` when both parts are non-empty.
    pub(crate) fn apply_basic_auth(&mut self, username: &str, password: &str) -> Result<()> {
        if username.is_empty() || password.is_empty() {
            return Ok(());
        }

        let encoded = STANDARD.encode(format!("{username}:{password}"));
        let mut value = HeaderValue::from_str(&format!("Basic {encoded}"))
            .map_err(|e| Error::config(format!("invalid basic auth credentials: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(())
    }

    /// Build a fresh `reqwest::Request` for one attempt.
    pub(crate) fn to_reqwest(&self) -> reqwest::Request {
        let mut request = reqwest::Request::new(self.method.clone(), self.url.clone());
        *request.headers_mut() = self.headers.clone();
        *request.body_mut() = self.body.clone().map(reqwest::Body::from);
        *request.timeout_mut() = self.timeout;
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::CONTENT_TYPE;

    fn request() -> ResolvedRequest {
        ResolvedRequest::new(
            Method::GET,
            Url::parse("http://example.com/").unwrap(),
            None,
        )
    }

    #[test]
    fn test_cookie_pair() {
        assert_eq!(Cookie::new("session", "abc").pair(), "session=abc");
        assert_eq!(Cookie::new("greeting", "hi there").pair(), "greeting=\"hi there\"");
    }

    #[test]
    fn test_cookie_pair_drops_invalid_bytes() {
        assert_eq!(
            Cookie::new("session", "abc;admin=true").pair(),
            "session=abcadmin=true"
        );
        assert_eq!(Cookie::new("q", "say \"hi\"\\").pair(), "q=\"say hi\"");
        assert_eq!(Cookie::new("bad;name\r\n", "1").pair(), "badname--=1");
    }

    #[test]
    fn test_injected_cookie_stays_one_pair() {
        let mut req = request();
        req.apply_cookies(&[Cookie::new("session", "abc; admin=true")])
            .unwrap();

        let header = req.headers().get(COOKIE).unwrap().to_str().unwrap();
        assert_eq!(header, "session=\"abc admin=true\"");
        assert_eq!(header.matches(';').count(), 0);
    }

    #[test]
    fn test_cookie_attributes_builder() {
        let cookie = Cookie::new("id", "1")
            .with_path("/")
            .with_domain("example.com")
            .with_max_age(Duration::from_secs(60))
            .secure(true)
            .http_only(true);

        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert!(cookie.secure && cookie.http_only);
        assert_eq!(cookie.pair(), "id=1");
    }

    #[test]
    fn test_apply_headers_rejects_invalid_name() {
        let mut headers = BTreeMap::new();
        headers.insert("bad header".to_string(), "x".to_string());

        let err = request().apply_headers(&headers).unwrap_err();
        assert!(matches!(err, Error::InvalidConfiguration(_)));
    }

    #[test]
    fn test_cookies_append_to_existing_header() {
        let mut headers = BTreeMap::new();
        headers.insert("cookie".to_string(), "theme=dark".to_string());

        let mut req = request();
        req.apply_headers(&headers).unwrap();
        req.apply_cookies(&[Cookie::new("a", "1"), Cookie::new("b", "2")])
            .unwrap();

        assert_eq!(req.headers().get(COOKIE).unwrap(), "theme=dark; a=1; b=2");
    }

    #[test]
    fn test_basic_auth_overrides_authorization_header() {
        let mut headers = BTreeMap::new();
        headers.insert("authorization".to_string(), "Bearer old".to_string());

        let mut req = request();
        req.apply_headers(&headers).unwrap();
        req.apply_basic_auth("user", "pass").unwrap();

        assert_eq!(
            req.headers().get(AUTHORIZATION).unwrap(),
            "Basic dXNlcjpwYXNz"
        );
    }

    #[test]
    fn test_basic_auth_needs_both_parts() {
        let mut req = request();
        req.apply_basic_auth("user", "").unwrap();
        req.apply_basic_auth("", "pass").unwrap();
        assert!(req.headers().get(AUTHORIZATION).is_none());
    }

    #[test]
    fn test_to_reqwest_copies_everything() {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/plain".to_string());

        let mut req = ResolvedRequest::new(
            Method::PUT,
            Url::parse("http://example.com/a?b=c").unwrap(),
            Some(Bytes::from_static(b"payload")),
        );
        req.apply_headers(&headers).unwrap();
        req.set_timeout(Some(Duration::from_millis(500)));

        let built = req.to_reqwest();
        assert_eq!(built.method(), &Method::PUT);
        assert_eq!(built.url().as_str(), "http://example.com/a?b=c");
        assert_eq!(built.headers().get(CONTENT_TYPE).unwrap(), "text/plain");
        assert_eq!(built.timeout(), Some(&Duration::from_millis(500)));
        assert_eq!(
            built.body().and_then(|b| b.as_bytes()),
            Some(&b"payload"[..])
        );
    }
}
