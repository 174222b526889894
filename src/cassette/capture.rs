//! Side channel for requests seen by a transport.
//!
//! Observers receive the fingerprint and canonical form of every request a
//! transport handles, so new fixtures can be written for exactly the requests
//! a test makes.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use bytes::Bytes;

use crate::error::ReplayError;
use crate::fingerprint::Fingerprint;

/// Receives every request a transport handles. Called from whichever thread
/// issued the request, so implementations synchronize their own state.
pub trait RequestObserver: Send + Sync {
    /// Called once per request with its fingerprint and canonical bytes.
    fn observe(&self, fingerprint: &Fingerprint, canonical: &[u8]);
}

/// One observed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Fingerprint of the filtered request.
    pub fingerprint: Fingerprint,
    /// Canonical form that was hashed.
    pub canonical: Bytes,
}

/// In-memory list of observed requests, in arrival order.
#[derive(Debug, Default)]
pub struct RequestLog {
    records: Mutex<Vec<RequestRecord>>,
}

impl RequestLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every record so far.
    #[must_use]
    pub fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Fingerprints observed so far.
    #[must_use]
    pub fn fingerprints(&self) -> Vec<Fingerprint> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|record| record.fingerprint.clone())
            .collect()
    }

    /// Number of observed requests.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been observed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RequestObserver for RequestLog {
    fn observe(&self, fingerprint: &Fingerprint, canonical: &[u8]) {
        let record =
            RequestRecord { fingerprint: fingerprint.clone(), canonical: Bytes::copy_from_slice(canonical) };
        self.records.lock().unwrap_or_else(PoisonError::into_inner).push(record);
    }
}

/// Writes each observed request to `<dir>/<fingerprint>.req`.
///
/// Write failures are logged and otherwise ignored; they never fail the
/// request being observed.
#[derive(Debug, Clone)]
pub struct RequestDumper {
    dir: PathBuf,
}

impl RequestDumper {
    /// Creates the dump directory if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ReplayError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ReplayError::Io { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    /// Dumps into `$TMPDIR/harplay/requests`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn in_temp_dir() -> Result<Self, ReplayError> {
        Self::new(std::env::temp_dir().join("harplay").join("requests"))
    }

    /// Directory the dumps go to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path a request with this fingerprint is dumped to.
    #[must_use]
    pub fn path_for(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.dir.join(format!("{fingerprint}.req"))
    }
}

impl RequestObserver for RequestDumper {
    fn observe(&self, fingerprint: &Fingerprint, canonical: &[u8]) {
        let path = self.path_for(fingerprint);
        if let Err(err) = std::fs::write(&path, canonical) {
            tracing::error!(error = %err, file = %path.display(), "failed to write request dump");
        }
    }
}
