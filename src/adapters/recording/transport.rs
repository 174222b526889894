//! Recording adapter for the `Transport` port.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use chrono::Utc;

use crate::canonical;
use crate::cassette::capture::RequestObserver;
use crate::cassette::recorder::HarRecorder;
use crate::error::ReplayError;
use crate::filter::FilterChain;
use crate::fingerprint::Fingerprint;
use crate::message::{Request, Response};
use crate::ports::Transport;

/// Records exchanges while delegating to an inner transport.
///
/// The inner transport receives the request exactly as the caller built it.
/// Filters only shape the copy that ends up in the recording, so secrets can
/// be redacted from fixtures without changing what goes over the wire.
pub struct RecordingTransport {
    inner: Box<dyn Transport>,
    recorder: Mutex<HarRecorder>,
    filters: FilterChain,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl RecordingTransport {
    /// Creates a new recording transport wrapping the given implementation.
    pub fn new(inner: impl Transport + 'static, recorder: HarRecorder) -> Self {
        Self { inner: Box::new(inner), recorder: Mutex::new(recorder), filters: FilterChain::new(), observers: Vec::new() }
    }

    /// Filters applied to the recorded copy of each request.
    #[must_use]
    pub fn with_filters(mut self, filters: FilterChain) -> Self {
        self.filters = filters;
        self
    }

    /// Notifies `observer` of every recorded request.
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of exchanges recorded so far.
    #[must_use]
    pub fn recorded(&self) -> usize {
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Writes the recording and returns its path.
    ///
    /// # Errors
    ///
    /// Returns an error if the HAR file cannot be written.
    pub fn finish(self) -> Result<PathBuf, ReplayError> {
        self.recorder.into_inner().unwrap_or_else(PoisonError::into_inner).finish()
    }
}

impl Transport for RecordingTransport {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        let mut recorded = canonical::clone_with_body(request)?;
        self.filters.apply(&mut recorded);
        recorded.body.buffer().map_err(ReplayError::Body)?;

        if !self.observers.is_empty() {
            let canonical = canonical::render(&mut recorded, &FilterChain::new())?;
            let key = Fingerprint::of_bytes(&canonical);
            for observer in &self.observers {
                observer.observe(&key, &canonical);
            }
        }

        let started = Utc::now();
        let timer = Instant::now();
        let response = self.inner.round_trip(request)?;
        let elapsed = timer.elapsed();

        tracing::debug!(method = %recorded.method, uri = %recorded.uri, status = %response.status, "recorded exchange");
        self.recorder.lock().unwrap_or_else(PoisonError::into_inner).record(&recorded, &response, started, elapsed);
        Ok(response)
    }
}

impl fmt::Debug for RecordingTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingTransport")
            .field("recorded", &self.recorded())
            .field("filters", &self.filters)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::capture::RequestLog;
    use crate::cassette::source::Source;
    use crate::error::CacheMiss;
    use crate::filter::DeleteHeader;
    use crate::message::Body;
    use http::header::{HeaderName, HeaderValue};
    use http::{Method, StatusCode};
    use std::io::Cursor;

    /// Echoes the request body back and remembers the last authorization header.
    #[derive(Default)]
    struct Echo {
        seen_auth: Mutex<Option<HeaderValue>>,
    }

    impl Transport for Echo {
        fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
            *self.seen_auth.lock().unwrap() = request.headers.get("authorization").cloned();
            let mut response = Response::new(StatusCode::OK);
            response.body = request.body.buffer().map_err(ReplayError::Body)?;
            Ok(response)
        }
    }

    struct AlwaysMiss;

    impl Transport for AlwaysMiss {
        fn round_trip(&self, _request: &mut Request) -> Result<Response, ReplayError> {
            Err(CacheMiss { fingerprint: Fingerprint::of_bytes(b""), report: None }.into())
        }
    }

    fn authorized_post() -> Request {
        Request::new(Method::POST, "https://example.com/v1/resource/new".parse().unwrap())
            .with_header(HeaderName::from_static("authorization"), HeaderValue::from_static("Bearer secret"))
            .with_body(Body::from_reader(Cursor::new(br#"{"name":"test"}"#.to_vec())))
    }

    #[test]
    fn records_redacted_copy_and_sends_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.har");
        let inner = Arc::new(Echo::default());
        let transport = RecordingTransport::new(Arc::clone(&inner), HarRecorder::new(&path, "test"))
            .with_filters(FilterChain::new().with(DeleteHeader(HeaderName::from_static("authorization"))));

        let mut request = authorized_post();
        let response = transport.round_trip(&mut request).unwrap();

        assert_eq!(response.body.as_ref(), br#"{"name":"test"}"#);
        assert_eq!(inner.seen_auth.lock().unwrap().as_ref().unwrap(), "Bearer secret");
        assert_eq!(request.body.as_bytes(), Some(&br#"{"name":"test"}"#[..]));
        assert_eq!(transport.recorded(), 1);

        transport.finish().unwrap();
        let loaded = Source::HarFile(path).load().unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(!loaded[0].request.headers.contains("authorization"));
        assert_eq!(loaded[0].response.body.as_ref(), br#"{"name":"test"}"#);
    }

    #[test]
    fn failed_exchanges_are_not_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let transport = RecordingTransport::new(AlwaysMiss, HarRecorder::new(dir.path().join("x.har"), "test"));

        assert!(transport.round_trip(&mut authorized_post()).is_err());
        assert_eq!(transport.recorded(), 0);
    }

    #[test]
    fn observers_see_the_recorded_form() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(RequestLog::new());
        let transport = RecordingTransport::new(Echo::default(), HarRecorder::new(dir.path().join("x.har"), "test"))
            .with_filters(FilterChain::new().with(DeleteHeader(HeaderName::from_static("authorization"))))
            .with_observer(log.clone());

        transport.round_trip(&mut authorized_post()).unwrap();

        let records = log.records();
        assert_eq!(records.len(), 1);
        let text = String::from_utf8_lossy(&records[0].canonical);
        assert!(!text.contains("authorization"), "{text}");
        assert!(text.ends_with(r#"{"name":"test"}"#));
    }
}
