//! Response wrapper with one-shot body extraction.

use bytes::Bytes;
use futures_util::stream::{self, BoxStream};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{Error, Result};

/// A received response.
///
/// The extraction methods take `self`: the body can be consumed once.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    version: Version,
    url: Url,
    headers: HeaderMap,
    attempts: u32,
    body: ResponseBody,
}

#[derive(Debug)]
enum ResponseBody {
    Streaming(reqwest::Response),
    Buffered(Bytes),
}

impl Response {
    pub(crate) fn streaming(response: reqwest::Response, attempts: u32) -> Self {
        Self {
            status: response.status(),
            version: response.version(),
            url: response.url().clone(),
            headers: response.headers().clone(),
            attempts,
            body: ResponseBody::Streaming(response),
        }
    }

    /// Read the whole body now so it can be inspected and still served to
    /// the caller later.
    pub(crate) async fn buffer(response: reqwest::Response, attempts: u32) -> Result<Self> {
        let status = response.status();
        let version = response.version();
        let url = response.url().clone();
        let headers = response.headers().clone();
        let body = response.bytes().await.map_err(Error::Read)?;

        Ok(Self {
            status,
            version,
            url,
            headers,
            attempts,
            body: ResponseBody::Buffered(body),
        })
    }

    /// Get the status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Get the HTTP version.
    pub fn version(&self) -> Version {
        self.version
    }

    /// Final URL, after redirects.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Get the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A header value as text, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// How many attempts it took to get this response.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The announced body length, if any.
    pub fn content_length(&self) -> Option<u64> {
        match &self.body {
            ResponseBody::Streaming(response) => response.content_length(),
            ResponseBody::Buffered(body) => Some(body.len() as u64),
        }
    }

    /// The buffered body, when the response was read up front.
    pub(crate) fn buffered_body(&self) -> Option<&Bytes> {
        match &self.body {
            ResponseBody::Buffered(body) => Some(body),
            ResponseBody::Streaming(_) => None,
        }
    }

    /// Read the whole body as raw bytes.
    pub async fn into_bytes(self) -> Result<Bytes> {
        match self.body {
            ResponseBody::Streaming(response) => response.bytes().await.map_err(Error::Read),
            ResponseBody::Buffered(body) => Ok(body),
        }
    }

    /// Read the whole body as text. Invalid UTF-8 is replaced.
    pub async fn into_string(self) -> Result<String> {
        let bytes = self.into_bytes().await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Read the whole body and decode it as JSON.
    ///
    /// A body that cannot be read is [`Error::Read`]; a body that is not valid
    /// JSON for `T` is [`Error::Decode`].
    pub async fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        let status = self.status;
        let bytes = self.into_bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| Error::decode(status, &bytes, e))
    }

    /// Stream the body chunk by chunk.
    pub fn into_stream(self) -> BoxStream<'static, Result<Bytes>> {
        match self.body {
            ResponseBody::Streaming(response) => {
                response.bytes_stream().map_err(Error::Read).boxed()
            }
            ResponseBody::Buffered(body) => stream::once(async move { Ok(body) }).boxed(),
        }
    }
}
