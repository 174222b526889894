//! `harplay check` command.

use std::path::Path;

use crate::cassette::cache::CollisionPolicy;
use crate::cassette::config::ReplayConfig;

/// Execute the `check` command.
///
/// Builds the transport exactly as a test would, so broken fixtures and
/// filters show up before any test runs.
///
/// # Errors
///
/// Returns an error string if the config is invalid or the transport fails to build.
pub fn run(config_path: &Path, strict: bool) -> Result<(), String> {
    let mut config = ReplayConfig::load(config_path).map_err(|e| e.to_string())?;
    if strict {
        config.on_collision = CollisionPolicy::Reject;
    }
    let transport = config.build().map_err(|e| e.to_string())?;

    match transport.cache() {
        Some(cache) => println!(
            "{}: {} recorded interaction(s), {} filter(s), diagnostics {}",
            config_path.display(),
            cache.len(),
            cache.filters().len(),
            if config.diagnostics { "on" } else { "off" }
        ),
        None => println!("{}: single response mode", config_path.display()),
    }
    Ok(())
}
