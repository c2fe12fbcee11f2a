//! Diagnostic dumps of requests and responses.

use reqwest::header::HeaderMap;
use reqwest::{StatusCode, Version};
use std::fmt::Write;

use crate::request::ResolvedRequest;

/// What a dump describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DumpKind {
    Request,
    Response,
}

/// Receives pre-formatted dumps when debug mode is on.
pub trait DumpSink: Send + Sync {
    fn dump(&self, kind: DumpKind, text: &str);
}

/// Default sink: logs every dump through `tracing` at `INFO`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DumpSink for TracingSink {
    fn dump(&self, kind: DumpKind, text: &str) {
        match kind {
            DumpKind::Request => tracing::info!(target: "courier::dump", "request:\n{text}"),
            DumpKind::Response => tracing::info!(target: "courier::dump", "response:\n{text}"),
        }
    }
}

/// Render a request the way it goes out on an HTTP/1.1 connection.
pub fn format_request(request: &ResolvedRequest) -> String {
    let url = request.url();
    let mut target = url.path().to_string();
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut out = format!("{} {} HTTP/1.1\r\n", request.method(), target);
    if let Some(host) = url.host_str() {
        match url.port() {
            Some(port) => {
                let _ = write!(out, "Host: {host}:{port}\r\n");
            }
            None => {
                let _ = write!(out, "Host: {host}\r\n");
            }
        }
    }
    write_headers(&mut out, request.headers());
    out.push_str("\r\n");
    if let Some(body) = request.body() {
        out.push_str(&String::from_utf8_lossy(body));
    }
    out
}

/// Render a response status line, headers and body.
pub fn format_response(
    version: Version,
    status: StatusCode,
    headers: &HeaderMap,
    body: &[u8],
) -> String {
    let mut out = format_response_head(version, status, headers);
    out.push_str(&String::from_utf8_lossy(body));
    out
}

/// Render a response status line and headers, ending with the blank line
/// that precedes the body.
pub fn format_response_head(version: Version, status: StatusCode, headers: &HeaderMap) -> String {
    let mut out = format!(
        "{:?} {} {}\r\n",
        version,
        status.as_u16(),
        status.canonical_reason().unwrap_or("")
    );
    write_headers(&mut out, headers);
    out.push_str("\r\n");
    out
}

fn write_headers(out: &mut String, headers: &HeaderMap) {
    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes());
        let _ = write!(out, "{name}: {value}\r\n");
    }
}
