//! HTTP request and response model used by the replay engine.
//!
//! Headers are kept as an ordered list rather than a `HeaderMap` because header
//! order is part of a request's canonical form, and removing a header must not
//! reshuffle the ones that remain.

use std::borrow::Cow;
use std::fmt;
use std::io::{self, Read};

use bytes::Bytes;
use http::header::{HeaderMap, HeaderName, HeaderValue};
use http::{Method, StatusCode, Uri, Version};

use crate::error::ReplayError;

/// Ordered header multimap.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(HeaderName, HeaderValue)>,
}

impl Headers {
    /// Creates an empty header list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header after all existing ones.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.entries.push((name, value));
    }

    /// Sets a header, replacing the first occurrence in place and dropping any later ones.
    /// Appends when the header is absent.
    pub fn insert(&mut self, name: HeaderName, value: HeaderValue) {
        let mut replaced = false;
        self.entries.retain_mut(|(existing, slot)| {
            if *existing != name {
                return true;
            }
            if replaced {
                return false;
            }
            replaced = true;
            slot.clone_from(&value);
            true
        });
        if !replaced {
            self.entries.push((name, value));
        }
    }

    /// Removes every header with the given (case-insensitive) name, keeping the
    /// relative order of the rest. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(existing, _)| !existing.as_str().eq_ignore_ascii_case(name));
        self.entries.len() != before
    }

    /// First value for the given (case-insensitive) name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&HeaderValue> {
        self.entries
            .iter()
            .find(|(existing, _)| existing.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// All values for the given (case-insensitive) name, in order.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a HeaderValue> + 'a {
        self.entries
            .iter()
            .filter(move |(existing, _)| existing.as_str().eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    }

    /// Whether a header with the given name is present.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterates headers in order.
    pub fn iter(&self) -> impl Iterator<Item = (&HeaderName, &HeaderValue)> {
        self.entries.iter().map(|(name, value)| (name, value))
    }

    /// Number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Converts into an `http` header map. Order across different names is not kept.
    #[must_use]
    pub fn to_header_map(&self) -> HeaderMap {
        let mut map = HeaderMap::with_capacity(self.entries.len());
        for (name, value) in &self.entries {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

impl From<&HeaderMap> for Headers {
    fn from(map: &HeaderMap) -> Self {
        map.iter().map(|(name, value)| (name.clone(), value.clone())).collect()
    }
}

impl FromIterator<(HeaderName, HeaderValue)> for Headers {
    fn from_iter<T: IntoIterator<Item = (HeaderName, HeaderValue)>>(iter: T) -> Self {
        Self { entries: iter.into_iter().collect() }
    }
}

/// A request or recorded body.
///
/// `Stream` bodies can only be read once; [`Body::buffer`] turns them into
/// `Full` so they can be read any number of times.
#[derive(Default)]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// Body held in memory.
    Full(Bytes),
    /// Body not yet read.
    Stream(Box<dyn Read + Send>),
}

impl Body {
    /// Wraps a reader as a not-yet-read body.
    pub fn from_reader(reader: impl Read + Send + 'static) -> Self {
        Self::Stream(Box::new(reader))
    }

    /// The body bytes when already in memory, `None` for an unread stream.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Empty => Some(&[]),
            Self::Full(bytes) => Some(bytes),
            Self::Stream(_) => None,
        }
    }

    /// Reads a streaming body into memory and returns a handle to the bytes.
    ///
    /// After success the body is `Full` and stays readable. On a read error the
    /// bytes already consumed are put back in front of the unread remainder, so
    /// the body still yields everything it would have before the call.
    ///
    /// # Errors
    ///
    /// Returns the reader's I/O error.
    pub fn buffer(&mut self) -> io::Result<Bytes> {
        match std::mem::take(self) {
            Self::Empty => Ok(Bytes::new()),
            Self::Full(bytes) => {
                *self = Self::Full(bytes.clone());
                Ok(bytes)
            }
            Self::Stream(mut reader) => {
                let mut consumed = Vec::new();
                match reader.read_to_end(&mut consumed) {
                    Ok(_) => {
                        let bytes = Bytes::from(consumed);
                        *self = Self::Full(bytes.clone());
                        Ok(bytes)
                    }
                    Err(err) => {
                        *self = Self::Stream(Box::new(io::Cursor::new(consumed).chain(reader)));
                        Err(err)
                    }
                }
            }
        }
    }

    /// Consumes the body, reading it fully.
    ///
    /// # Errors
    ///
    /// Returns the reader's I/O error for streaming bodies.
    pub fn into_bytes(mut self) -> io::Result<Bytes> {
        self.buffer()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Full(bytes) => f.debug_tuple("Full").field(&bytes.len()).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        if bytes.is_empty() {
            Self::Empty
        } else {
            Self::Full(bytes)
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

impl From<&'static [u8]> for Body {
    fn from(bytes: &'static [u8]) -> Self {
        Bytes::from_static(bytes).into()
    }
}

/// An outgoing HTTP request as seen by a transport.
#[derive(Debug)]
pub struct Request {
    /// Request method.
    pub method: Method,
    /// Absolute request URI, including the query string.
    pub uri: Uri,
    /// Protocol version.
    pub version: Version,
    /// Headers in the order they were set.
    pub headers: Headers,
    /// Request body.
    pub body: Body,
}

impl Request {
    /// Creates an HTTP/1.1 request with no headers and no body.
    #[must_use]
    pub fn new(method: Method, uri: Uri) -> Self {
        Self { method, uri, version: Version::HTTP_11, headers: Headers::new(), body: Body::Empty }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Body>) -> Self {
        self.body = body.into();
        self
    }

    /// Replaces the protocol version.
    #[must_use]
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Converts an `http` request.
    pub fn from_http<B: Into<Body>>(request: http::Request<B>) -> Self {
        let (parts, body) = request.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            version: parts.version,
            headers: Headers::from(&parts.headers),
            body: body.into(),
        }
    }

    /// Converts a `reqwest` request, copying its body.
    ///
    /// # Errors
    ///
    /// Returns an error when the URL is not a valid URI or the body is a stream,
    /// which `reqwest` cannot clone.
    pub fn from_reqwest(request: &reqwest::Request) -> Result<Self, ReplayError> {
        let uri: Uri = request
            .url()
            .as_str()
            .parse()
            .map_err(|e| ReplayError::invalid_request(format!("{}: {e}", request.url())))?;
        let body = match request.body() {
            None => Body::Empty,
            Some(body) => match body.as_bytes() {
                Some(bytes) => Bytes::copy_from_slice(bytes).into(),
                None => {
                    return Err(ReplayError::invalid_request(
                        "streaming request bodies cannot be fingerprinted",
                    ))
                }
            },
        };
        Ok(Self {
            method: request.method().clone(),
            uri,
            version: request.version(),
            headers: Headers::from(request.headers()),
            body,
        })
    }
}

/// A response produced by a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code.
    pub status: StatusCode,
    /// Reason phrase as recorded (e.g. `"OK"`).
    pub status_text: String,
    /// Protocol version.
    pub version: Version,
    /// Headers in recorded order.
    pub headers: Headers,
    /// Fully materialized body.
    pub body: Bytes,
}

impl Response {
    /// Creates an HTTP/1.1 response with the canonical reason phrase and no body.
    #[must_use]
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            version: Version::HTTP_11,
            headers: Headers::new(),
            body: Bytes::new(),
        }
    }

    /// A fresh reader over the body.
    #[must_use]
    pub fn body_reader(&self) -> io::Cursor<Bytes> {
        io::Cursor::new(self.body.clone())
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Converts into an `http` response. The reason phrase is not carried over.
    #[must_use]
    pub fn into_http(self) -> http::Response<Bytes> {
        let mut response = http::Response::new(self.body);
        *response.status_mut() = self.status;
        *response.version_mut() = self.version;
        *response.headers_mut() = self.headers.to_header_map();
        response
    }

    /// Converts into a `reqwest` response, for callers that drive `reqwest` themselves.
    #[must_use]
    pub fn into_reqwest(self) -> reqwest::Response {
        reqwest::Response::from(self.into_http())
    }
}

/// Wire label for a protocol version (`"HTTP/1.1"`).
#[must_use]
pub fn version_label(version: Version) -> &'static str {
    match version {
        Version::HTTP_09 => "HTTP/0.9",
        Version::HTTP_10 => "HTTP/1.0",
        Version::HTTP_2 => "HTTP/2.0",
        Version::HTTP_3 => "HTTP/3.0",
        _ => "HTTP/1.1",
    }
}

/// Parses the version strings found in HAR files and configs.
#[must_use]
pub fn parse_version(label: &str) -> Option<Version> {
    match label.trim().to_ascii_uppercase().as_str() {
        "HTTP/0.9" => Some(Version::HTTP_09),
        "HTTP/1.0" => Some(Version::HTTP_10),
        "HTTP/1.1" => Some(Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" | "H2" => Some(Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" | "H3" => Some(Version::HTTP_3),
        _ => None,
    }
}
