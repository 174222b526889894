//! `harplay show` command.

use std::path::Path;

use super::push_header_deletions;
use crate::canonical;
use crate::cassette::source::Source;
use crate::filter::FilterChain;
use crate::fingerprint::Fingerprint;

/// Execute the `show` command.
///
/// Prints the fingerprint, recorded status, and canonical form of one entry,
/// which is the text a cache-miss report diffs against.
///
/// # Errors
///
/// Returns an error string if the source fails to load or `entry` is out of range.
pub fn run(source: &Path, entry: usize, delete_headers: &[String]) -> Result<(), String> {
    let mut filters = FilterChain::new();
    push_header_deletions(&mut filters, delete_headers)?;

    let interactions = Source::path(source).load().map_err(|e| e.to_string())?;
    let Some(interaction) = interactions.get(entry) else {
        return Err(format!(
            "Entry {entry} out of range: {} has {} entries",
            source.display(),
            interactions.len()
        ));
    };

    let rendered =
        canonical::render(&mut interaction.request.to_request(), &filters).map_err(|e| e.to_string())?;
    let response = &interaction.response;

    println!("Source: {}", interaction.metadata.source);
    println!("Fingerprint: {}", Fingerprint::of_bytes(&rendered));
    println!("Response: {} {} ({} bytes)", response.status.as_u16(), response.status_text, response.body.len());
    if let Some(comment) = &interaction.metadata.comment {
        println!("Comment: {comment}");
    }
    println!();
    println!("{}", canonical::to_display(&rendered).trim_end());
    Ok(())
}
