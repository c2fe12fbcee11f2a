//! Sends resolved requests with bounded retries.

use std::sync::Arc;

use crate::dump::{format_request, format_response, DumpKind, DumpSink, TracingSink};
use crate::error::{Error, Result};
use crate::request::ResolvedRequest;
use crate::response::Response;

/// Transmits one [`ResolvedRequest`].
///
/// Transport errors (connect, DNS, TLS, timeout) are retried immediately
/// until `retries` attempts have been made. Any HTTP status, 4xx and 5xx
/// included, is a successful exchange.
#[derive(Clone)]
pub struct Executor {
    client: reqwest::Client,
    retries: u32,
    debug: bool,
    sink: Arc<dyn DumpSink>,
}

impl Executor {
    /// Create an executor sending through `client`, one attempt, no dumps.
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            retries: 0,
            debug: false,
            sink: Arc::new(TracingSink),
        }
    }

    /// Total attempts on transport errors; 0 and 1 both mean a single attempt.
    pub fn retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Dump each request and response to the sink.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the diagnostic sink.
    pub fn sink(mut self, sink: Arc<dyn DumpSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Send `request`, retrying transport errors up to the attempt limit.
    pub async fn execute(&self, request: &ResolvedRequest) -> Result<Response> {
        if self.debug {
            self.sink.dump(DumpKind::Request, &format_request(request));
        }

        let max_attempts = self.retries.max(1);
        let mut attempts = 0;

        let response = loop {
            attempts += 1;
            tracing::debug!(
                method = %request.method(),
                url = %request.url(),
                attempt = attempts,
                "sending request"
            );

            match self.client.execute(request.to_reqwest()).await {
                Ok(response) => break response,
                Err(e) if attempts < max_attempts => {
                    tracing::warn!("request [{attempts}/{max_attempts}] failed: {e}, retrying");
                }
                Err(source) => {
                    tracing::error!("request failed after {attempts} attempt(s): {source}");
                    return Err(Error::Transport { attempts, source });
                }
            }
        };

        tracing::debug!(status = %response.status(), url = %request.url(), "received response");

        if !self.debug {
            return Ok(Response::streaming(response, attempts));
        }

        let response = Response::buffer(response, attempts).await?;
        let body = response.buffered_body().map(|b| &b[..]).unwrap_or_default();
        self.sink.dump(
            DumpKind::Response,
            &format_response(response.version(), response.status(), response.headers(), body),
        );
        Ok(response)
    }
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("retries", &self.retries)
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
