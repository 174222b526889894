//! Request filters applied before fingerprinting.
//!
//! A filter mutates a single request. It must not keep state between calls:
//! the same input has to produce the same output no matter which requests
//! were filtered before it, or fingerprints stop being reproducible.

use std::fmt;
use std::sync::Arc;

use http::header::{HeaderName, HeaderValue};
use http::uri::{PathAndQuery, Uri};
use http::Version;

use crate::message::Request;

/// A pure, single-request mutation used for redaction or normalization.
pub trait RequestFilter: Send + Sync {
    /// Rewrites the request in place.
    fn apply(&self, request: &mut Request);
}

impl<F> RequestFilter for F
where
    F: Fn(&mut Request) + Send + Sync,
{
    fn apply(&self, request: &mut Request) {
        self(request);
    }
}

/// Ordered list of filters, applied in registration order.
#[derive(Clone, Default)]
pub struct FilterChain {
    filters: Vec<Arc<dyn RequestFilter>>,
}

impl FilterChain {
    /// Creates an empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a filter.
    pub fn push(&mut self, filter: impl RequestFilter + 'static) {
        self.filters.push(Arc::new(filter));
    }

    /// Appends every filter in `other`, after the ones already here.
    pub fn extend(&mut self, other: &FilterChain) {
        self.filters.extend(other.filters.iter().cloned());
    }

    /// Appends a filter, builder style.
    #[must_use]
    pub fn with(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.push(filter);
        self
    }

    /// Runs every filter over the request.
    pub fn apply(&self, request: &mut Request) {
        for filter in &self.filters {
            filter.apply(request);
        }
    }

    /// Number of filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether the chain has no filters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterChain").field("len", &self.filters.len()).finish()
    }
}

/// Removes every header with a given name.
#[derive(Debug, Clone)]
pub struct DeleteHeader(pub HeaderName);

impl RequestFilter for DeleteHeader {
    fn apply(&self, request: &mut Request) {
        request.headers.remove(self.0.as_str());
    }
}

/// Sets a header to a fixed value, replacing any existing one in place.
#[derive(Debug, Clone)]
pub struct SetHeader {
    /// Header name.
    pub name: HeaderName,
    /// Value to set.
    pub value: HeaderValue,
}

impl RequestFilter for SetHeader {
    fn apply(&self, request: &mut Request) {
        request.headers.insert(self.name.clone(), self.value.clone());
    }
}

/// Drops a query parameter (every occurrence), keeping the others in order.
#[derive(Debug, Clone)]
pub struct RemoveQueryParam(pub String);

impl RequestFilter for RemoveQueryParam {
    fn apply(&self, request: &mut Request) {
        let Some(query) = request.uri.query() else { return };
        let kept: Vec<&str> = query
            .split('&')
            .filter(|pair| pair.split('=').next() != Some(self.0.as_str()))
            .collect();
        let path_and_query = if kept.is_empty() {
            request.uri.path().to_string()
        } else {
            format!("{}?{}", request.uri.path(), kept.join("&"))
        };
        // Both pieces came out of a valid URI, so rebuilding only fails on
        // exotic inputs; those keep their original URI.
        if let Some(uri) = rebuild_uri(&request.uri, &path_and_query) {
            request.uri = uri;
        }
    }
}

fn rebuild_uri(uri: &Uri, path_and_query: &str) -> Option<Uri> {
    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(PathAndQuery::try_from(path_and_query).ok()?);
    Uri::from_parts(parts).ok()
}

/// Forces the protocol version, for recordings captured over a different HTTP version.
#[derive(Debug, Clone, Copy)]
pub struct SetVersion(pub Version);

impl RequestFilter for SetVersion {
    fn apply(&self, request: &mut Request) {
        request.version = self.0;
    }
}
