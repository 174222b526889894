//! `harplay keys` command.

use std::path::{Path, PathBuf};

use super::push_header_deletions;
use crate::cassette::config::ReplayConfig;
use crate::cassette::source::Source;
use crate::filter::FilterChain;
use crate::fingerprint::fingerprint;

/// Execute the `keys` command.
///
/// Prints `<fingerprint>  <METHOD> <URL>  <source>` for every recorded entry,
/// including entries that collide with an earlier one.
///
/// # Errors
///
/// Returns an error string if the config or a source fails to load.
pub fn run(config: Option<&Path>, delete_headers: &[String], sources: &[PathBuf]) -> Result<(), String> {
    let (mut filters, mut all_sources) = match config {
        Some(path) => {
            let config = ReplayConfig::load(path).map_err(|e| e.to_string())?;
            (config.filter_chain().map_err(|e| e.to_string())?, config.sources())
        }
        None => (FilterChain::new(), Vec::new()),
    };
    push_header_deletions(&mut filters, delete_headers)?;
    all_sources.extend(sources.iter().map(Source::path));

    if all_sources.is_empty() {
        return Err("no sources given; pass HAR files or directories, or --config".to_string());
    }

    for source in &all_sources {
        for interaction in source.load().map_err(|e| e.to_string())? {
            let key = fingerprint(&mut interaction.request.to_request(), &filters).map_err(|e| e.to_string())?;
            println!(
                "{key}  {} {}  {}",
                interaction.request.method, interaction.request.uri, interaction.metadata.source
            );
        }
    }
    Ok(())
}
