//! Command dispatch and handlers.

pub mod check;
pub mod keys;
pub mod record;
pub mod show;

use http::header::HeaderName;

use crate::cli::Command;
use crate::filter::{DeleteHeader, FilterChain};

/// Dispatch a parsed command to its handler.
///
/// # Errors
///
/// Returns an error string if the selected command handler fails.
pub fn dispatch(command: &Command) -> Result<(), String> {
    match command {
        Command::Keys { config, delete_headers, sources } => {
            keys::run(config.as_deref(), delete_headers, sources)
        }
        Command::Show { source, entry, delete_headers } => show::run(source, *entry, delete_headers),
        Command::Check { config, strict } => check::run(config, *strict),
        Command::Record(args) => record::run(args),
    }
}

/// Appends a [`DeleteHeader`] filter for each `-d NAME` flag.
fn push_header_deletions(chain: &mut FilterChain, names: &[String]) -> Result<(), String> {
    for name in names {
        let header = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("Invalid header name {name:?}: {e}"))?;
        chain.push(DeleteHeader(header));
    }
    Ok(())
}
