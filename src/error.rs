//! Error types for loading recordings and replaying requests.

use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::diagnostic::DiagnosticReport;
use crate::fingerprint::Fingerprint;

/// Errors produced while building a replay cache or serving a request.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// A recording or config file could not be read or written.
    #[error("failed to access {}: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// A HAR file is not valid JSON or does not have the HAR shape.
    #[error("failed to parse HAR file {}: {source}", path.display())]
    Parse {
        /// File that failed.
        path: PathBuf,
        /// Underlying decode error.
        source: serde_json::Error,
    },

    /// A recorded entry decoded but cannot be turned into a request/response pair.
    #[error("invalid recorded entry {index} in {source_label}: {message}")]
    InvalidEntry {
        /// Where the entry came from (file path or in-memory label).
        source_label: String,
        /// Position of the entry in its source.
        index: usize,
        /// What was wrong with it.
        message: String,
    },

    /// The request body could not be read while cloning it.
    #[error("failed to read request body: {0}")]
    Body(#[source] io::Error),

    /// Two recorded interactions produced the same fingerprint under the reject policy.
    #[error("recorded interactions {first} and {second} share fingerprint {fingerprint}")]
    Collision {
        /// The shared fingerprint.
        fingerprint: Fingerprint,
        /// Source of the interaction loaded first.
        first: String,
        /// Source of the interaction loaded second.
        second: String,
    },

    /// No recorded interaction matches the request.
    #[error("{0}")]
    Miss(Box<CacheMiss>),

    /// The replay configuration is invalid.
    #[error("invalid replay configuration: {message}")]
    Config {
        /// What was wrong with it.
        message: String,
    },

    /// A request could not be converted into the replay model.
    #[error("invalid request: {message}")]
    InvalidRequest {
        /// What was wrong with it.
        message: String,
    },

    /// The live HTTP client failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl ReplayError {
    /// The fingerprint of the unmatched request, if this is a cache miss.
    #[must_use]
    pub fn fingerprint(&self) -> Option<&Fingerprint> {
        match self {
            Self::Miss(miss) => Some(&miss.fingerprint),
            _ => None,
        }
    }

    /// The diagnostic report attached to a cache miss, if one was produced.
    #[must_use]
    pub fn report(&self) -> Option<&DiagnosticReport> {
        match self {
            Self::Miss(miss) => miss.report.as_ref(),
            _ => None,
        }
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub(crate) fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest { message: message.into() }
    }
}

impl From<CacheMiss> for ReplayError {
    fn from(miss: CacheMiss) -> Self {
        Self::Miss(Box::new(miss))
    }
}

/// A request whose fingerprint is not in the replay cache.
#[derive(Debug, Clone)]
pub struct CacheMiss {
    /// Fingerprint computed for the unmatched request.
    pub fingerprint: Fingerprint,
    /// The diff against every cached request, when diagnostics are enabled and succeeded.
    pub report: Option<DiagnosticReport>,
}

impl fmt::Display for CacheMiss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no recorded response for request {}", self.fingerprint)?;
        match &self.report {
            Some(report) => write!(f, "\n{report}"),
            None => write!(
                f,
                " (enable diagnostics to diff it against every recorded request)"
            ),
        }
    }
}
