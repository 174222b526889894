//! Recorded interactions: validated request/response templates built from HAR entries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use http::header::{HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri, Version};

use super::format::{Entry, NameValue};
use crate::error::ReplayError;
use crate::message::{parse_version, Headers, Request, Response};

/// Request half of a recording. Turned into a fresh [`Request`] whenever it is hashed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestTemplate {
    /// Request method.
    pub method: Method,
    /// Absolute URI including the query string.
    pub uri: Uri,
    /// Protocol version.
    pub version: Version,
    /// Headers in recorded order.
    pub headers: Headers,
    /// Request body.
    pub body: Bytes,
}

impl RequestTemplate {
    /// Creates an HTTP/1.1 template with no headers and no body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, version: Version::HTTP_11, headers: Headers::new(), body: Bytes::new() }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Builds a request equivalent to the recorded one.
    #[must_use]
    pub fn to_request(&self) -> Request {
        Request {
            method: self.method.clone(),
            uri: self.uri.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: self.body.clone().into(),
        }
    }
}

/// Response half of a recording, with its body already decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseTemplate {
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase as recorded.
    pub status_text: String,
    /// Protocol version.
    pub version: Version,
    /// Headers in recorded order.
    pub headers: Headers,
    /// Decoded body.
    pub body: Bytes,
}

impl ResponseTemplate {
    /// Creates an HTTP/1.1 template with the canonical reason phrase and no body.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        let Response { status, status_text, version, headers, body } = Response::new(status);
        Self { status, status_text, version, headers, body }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Synthesizes a response. The template itself is never modified, so it can
    /// be served any number of times.
    #[must_use]
    pub fn to_response(&self) -> Response {
        Response {
            status: self.status,
            status_text: self.status_text.clone(),
            version: self.version,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

/// Data about a recording that plays no part in matching.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionMetadata {
    /// Where the recording came from, e.g. `fixtures/api.har#3`.
    pub source: String,
    /// When the original request started.
    pub started: Option<DateTime<FixedOffset>>,
    /// Total elapsed time of the original exchange, in milliseconds.
    pub elapsed_ms: f64,
    /// Free-form comment carried over from the recording.
    pub comment: Option<String>,
}

/// An immutable recorded request/response pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedInteraction {
    /// What was sent.
    pub request: RequestTemplate,
    /// What came back.
    pub response: ResponseTemplate,
    /// Timing and provenance.
    pub metadata: InteractionMetadata,
}

impl RecordedInteraction {
    /// Pairs a request and a response recorded in memory.
    #[must_use]
    pub fn new(request: RequestTemplate, response: ResponseTemplate) -> Self {
        Self { request, response, metadata: InteractionMetadata::default() }
    }

    /// Labels where this interaction came from.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = source.into();
        self
    }

    /// Validates a HAR entry and decodes its bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ReplayError::InvalidEntry`] for an invalid method, URL, status,
    /// header, or body encoding.
    pub fn from_har_entry(
        entry: &Entry,
        source_label: &str,
        index: usize,
    ) -> Result<Self, ReplayError> {
        let invalid = |message: String| ReplayError::InvalidEntry {
            source_label: source_label.to_string(),
            index,
            message,
        };

        let har_request = &entry.request;
        let method = Method::from_bytes(har_request.method.as_bytes())
            .map_err(|e| invalid(format!("method {:?}: {e}", har_request.method)))?;
        let uri: Uri =
            har_request.url.parse().map_err(|e| invalid(format!("url {:?}: {e}", har_request.url)))?;
        let request = RequestTemplate {
            method,
            uri,
            version: har_version(&har_request.http_version),
            headers: har_headers(&har_request.headers).map_err(&invalid)?,
            body: match &har_request.post_data {
                Some(data) => decode_body(&data.text, data.encoding.as_deref())
                    .map_err(|e| invalid(format!("request body: {e}")))?,
                None => Bytes::new(),
            },
        };

        let har_response = &entry.response;
        let status = StatusCode::from_u16(har_response.status)
            .map_err(|e| invalid(format!("status {}: {e}", har_response.status)))?;
        let content = &har_response.content;
        let body = decode_body(content.text.as_deref().unwrap_or_default(), content.encoding.as_deref())
            .map_err(|e| invalid(format!("response body: {e}")))?;
        let response = ResponseTemplate {
            status,
            status_text: har_response.status_text.clone(),
            version: har_version(&har_response.http_version),
            headers: har_headers(&har_response.headers).map_err(&invalid)?,
            body,
        };

        Ok(Self {
            request,
            response,
            metadata: InteractionMetadata {
                source: format!("{source_label}#{index}"),
                started: entry.started_date_time,
                elapsed_ms: entry.time,
                comment: entry.comment.clone(),
            },
        })
    }
}

fn decode_body(text: &str, encoding: Option<&str>) -> Result<Bytes, String> {
    match encoding {
        None | Some("") => Ok(Bytes::from(text.to_string())),
        Some("base64") => STANDARD.decode(text).map(Bytes::from).map_err(|e| e.to_string()),
        Some(other) => Err(format!("unsupported encoding {other:?}")),
    }
}

fn har_version(label: &str) -> Version {
    if label.is_empty() {
        return Version::HTTP_11;
    }
    parse_version(label).unwrap_or_else(|| {
        tracing::warn!(version = label, "unrecognized HTTP version in recording, using HTTP/1.1");
        Version::HTTP_11
    })
}

/// HTTP/2 pseudo-headers (`:authority`, `:path`, ...) are skipped; they restate
/// the method and URL.
fn har_headers(pairs: &[NameValue]) -> Result<Headers, String> {
    pairs
        .iter()
        .filter(|pair| !pair.name.starts_with(':'))
        .map(|pair| {
            let name = HeaderName::from_bytes(pair.name.as_bytes())
                .map_err(|e| format!("header name {:?}: {e}", pair.name))?;
            let value = HeaderValue::from_str(&pair.value)
                .map_err(|e| format!("header {:?} value: {e}", pair.name))?;
            Ok((name, value))
        })
        .collect()
}
