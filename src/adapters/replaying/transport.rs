//! Replaying adapter for the `Transport` port.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use http::header::HeaderName;

use crate::canonical;
use crate::cassette::cache::{CollisionPolicy, ReplayCache};
use crate::cassette::capture::RequestObserver;
use crate::cassette::interaction::{RecordedInteraction, ResponseTemplate};
use crate::cassette::source::Source;
use crate::diagnostic::DiagnosticReporter;
use crate::error::{CacheMiss, ReplayError};
use crate::filter::{DeleteHeader, FilterChain, RequestFilter};
use crate::fingerprint::Fingerprint;
use crate::message::{Request, Response};
use crate::ports::Transport;

/// Serves recorded responses instead of touching the network.
#[derive(Debug)]
pub enum ReplayTransport {
    /// Looks each request up by fingerprint.
    Matching(MatchingReplay),
    /// Answers every request with the same response.
    Fixed(ResponseTemplate),
}

impl ReplayTransport {
    /// Starts configuring a matching transport.
    #[must_use]
    pub fn builder() -> ReplayBuilder {
        ReplayBuilder::default()
    }

    /// A transport that ignores the request and always returns `response`.
    #[must_use]
    pub fn single(response: ResponseTemplate) -> Self {
        Self::Fixed(response)
    }

    /// The cache behind a matching transport.
    #[must_use]
    pub fn cache(&self) -> Option<&ReplayCache> {
        match self {
            Self::Matching(replay) => Some(&replay.cache),
            Self::Fixed(_) => None,
        }
    }
}

impl Transport for ReplayTransport {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        match self {
            Self::Matching(replay) => replay.round_trip(request),
            Self::Fixed(response) => Ok(response.to_response()),
        }
    }
}

/// Fingerprint matching against a shared, immutable cache.
pub struct MatchingReplay {
    cache: Arc<ReplayCache>,
    diagnostics: Option<DiagnosticReporter>,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl MatchingReplay {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        self.cache.filters().apply(request);
        let canonical = canonical::render(request, &FilterChain::new())?;
        let key = Fingerprint::of_bytes(&canonical);
        for observer in &self.observers {
            observer.observe(&key, &canonical);
        }

        if let Some(interaction) = self.cache.lookup(&key) {
            tracing::debug!(fingerprint = %key, source = %interaction.metadata.source, "replaying recorded response");
            return Ok(interaction.response.to_response());
        }

        tracing::warn!(fingerprint = %key, method = %request.method, uri = %request.uri, "no recorded response for request");
        let report = self.diagnostics.and_then(|reporter| {
            reporter
                .report(&key, &canonical, &self.cache)
                .map_err(|err| tracing::warn!(fingerprint = %key, error = %err, "failed to build miss diagnostics"))
                .ok()
        });
        Err(CacheMiss { fingerprint: key, report }.into())
    }
}

impl fmt::Debug for MatchingReplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatchingReplay")
            .field("entries", &self.cache.len())
            .field("diagnostics", &self.diagnostics.is_some())
            .field("observers", &self.observers.len())
            .finish()
    }
}

/// Collects sources and options for a [`ReplayTransport::Matching`].
#[derive(Default)]
pub struct ReplayBuilder {
    sources: Vec<Source>,
    filters: FilterChain,
    diagnostics: Option<DiagnosticReporter>,
    policy: CollisionPolicy,
    observers: Vec<Arc<dyn RequestObserver>>,
}

impl ReplayBuilder {
    /// Adds one HAR file.
    #[must_use]
    pub fn har_file(self, path: impl Into<PathBuf>) -> Self {
        self.source(Source::HarFile(path.into()))
    }

    /// Adds every HAR file under a directory.
    #[must_use]
    pub fn har_dir(self, path: impl Into<PathBuf>) -> Self {
        self.source(Source::HarDir(path.into()))
    }

    /// Adds interactions built in memory.
    #[must_use]
    pub fn interactions(self, interactions: impl IntoIterator<Item = RecordedInteraction>) -> Self {
        self.source(Source::Interactions(interactions.into_iter().collect()))
    }

    /// Adds a source. Sources load in the order added.
    #[must_use]
    pub fn source(mut self, source: Source) -> Self {
        self.sources.push(source);
        self
    }

    /// Appends a filter, run on both recorded and live requests before hashing.
    #[must_use]
    pub fn filter(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filters.push(filter);
        self
    }

    /// Appends every filter in `chain`.
    #[must_use]
    pub fn filters(mut self, chain: &FilterChain) -> Self {
        self.filters.extend(chain);
        self
    }

    /// Shorthand for a [`DeleteHeader`] filter.
    #[must_use]
    pub fn delete_header(self, name: HeaderName) -> Self {
        self.filter(DeleteHeader(name))
    }

    /// Attaches a diff against every recording to cache misses.
    #[must_use]
    pub fn diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled.then(DiagnosticReporter::default);
        self
    }

    /// Enables diagnostics with a specific reporter.
    #[must_use]
    pub fn reporter(mut self, reporter: DiagnosticReporter) -> Self {
        self.diagnostics = Some(reporter);
        self
    }

    /// How to treat recordings that share a fingerprint.
    #[must_use]
    pub fn collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Notifies `observer` of every request, hit or miss, after filtering.
    #[must_use]
    pub fn observer(mut self, observer: Arc<dyn RequestObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Loads every source and builds the cache.
    ///
    /// # Errors
    ///
    /// Fails if any source fails to load or on a collision under
    /// [`CollisionPolicy::Reject`].
    pub fn build(self) -> Result<ReplayTransport, ReplayError> {
        let cache = ReplayCache::from_sources(&self.sources, self.filters, self.policy)?;
        Ok(ReplayTransport::Matching(MatchingReplay {
            cache: Arc::new(cache),
            diagnostics: self.diagnostics,
            observers: self.observers,
        }))
    }
}

impl fmt::Debug for ReplayBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayBuilder")
            .field("sources", &self.sources.len())
            .field("filters", &self.filters)
            .field("diagnostics", &self.diagnostics.is_some())
            .field("policy", &self.policy)
            .field("observers", &self.observers.len())
            .finish()
    }
}
