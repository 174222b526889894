//! Deterministic HTTP replay for tests.
//!
//! Recorded HAR interactions are indexed by a SHA-256 fingerprint of each
//! request's canonical wire form. A [`ReplayTransport`] fingerprints every
//! outgoing request the same way and answers from the recording, or fails with
//! the fingerprint and, optionally, a diff against every recorded request.
//!
//! ```no_run
//! use harplay::{ReplayTransport, Request, Transport};
//!
//! # fn main() -> Result<(), harplay::ReplayError> {
//! let transport = ReplayTransport::builder()
//!     .har_file("tests/fixtures/example.har")
//!     .delete_header(http::header::AUTHORIZATION)
//!     .diagnostics(true)
//!     .build()?;
//!
//! let mut request = Request::new(http::Method::GET, "https://example.com/v1/resource".parse().unwrap());
//! let response = transport.round_trip(&mut request)?;
//! assert_eq!(response.status, http::StatusCode::OK);
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod canonical;
pub mod cassette;
pub mod cli;
pub mod commands;
pub mod diagnostic;
pub mod error;
pub mod filter;
pub mod fingerprint;
pub mod message;
pub mod ports;

#[cfg(test)]
mod testing;

pub use adapters::{LiveTransport, RecordingTransport, ReplayBuilder, ReplayTransport};
pub use cassette::cache::{CollisionPolicy, ReplayCache};
pub use cassette::capture::{RequestDumper, RequestLog, RequestObserver};
pub use cassette::config::ReplayConfig;
pub use cassette::interaction::{RecordedInteraction, RequestTemplate, ResponseTemplate};
pub use cassette::recorder::HarRecorder;
pub use cassette::source::Source;
pub use diagnostic::{DiagnosticReport, DiagnosticReporter};
pub use error::{CacheMiss, ReplayError};
pub use filter::{FilterChain, RequestFilter};
pub use fingerprint::{fingerprint, Fingerprint};
pub use message::{Body, Headers, Request, Response};
pub use ports::Transport;

use clap::error::ErrorKind;
use clap::Parser;

/// Run the CLI with the provided arguments.
///
/// # Errors
///
/// Returns an error string when argument parsing fails or command execution fails.
pub fn run<I, T>(args: I) -> Result<(), String>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let cli = match cli::Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            print!("{err}");
            return Ok(());
        }
        Err(err) => return Err(err.to_string()),
    };
    commands::dispatch(&cli.command)
}

#[cfg(test)]
mod tests {
    use super::run;

    #[test]
    fn run_errors_on_unknown_subcommand() {
        let result = run(["harplay", "unknown"]);
        assert!(result.is_err());
    }

    #[test]
    fn run_errors_without_sources() {
        let err = run(["harplay", "keys"]).unwrap_err();
        assert!(err.contains("no sources"), "{err}");
    }
}
