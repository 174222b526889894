//! Live adapter for the `Transport` port using a blocking `reqwest` client.

use reqwest::blocking::Client;

use crate::error::ReplayError;
use crate::message::{Headers, Request, Response};
use crate::ports::Transport;

/// Sends requests over the network.
#[derive(Debug, Clone)]
pub struct LiveTransport {
    client: Client,
}

impl LiveTransport {
    /// Creates a live transport with a default client.
    #[must_use]
    pub fn new() -> Self {
        Self { client: Client::new() }
    }

    /// Uses a preconfigured client (timeouts, proxies, TLS roots).
    #[must_use]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Default for LiveTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LiveTransport {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        let body = request.body.buffer().map_err(ReplayError::Body)?;
        let mut builder = self
            .client
            .request(request.method.clone(), request.uri.to_string())
            .headers(request.headers.to_header_map());
        if !body.is_empty() {
            builder = builder.body(body.to_vec());
        }

        let response = builder.send()?;
        let status = response.status();
        let version = response.version();
        let headers = Headers::from(response.headers());
        let body = response.bytes()?;
        tracing::debug!(uri = %request.uri, status = %status, bytes = body.len(), "live response");

        Ok(Response {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            version,
            headers,
            body,
        })
    }
}
