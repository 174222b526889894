//! Sources of recorded interactions.

use std::path::{Path, PathBuf};

use super::format::load_har;
use super::interaction::RecordedInteraction;
use crate::error::ReplayError;

/// Where recorded interactions come from. Sources are loaded in the order given;
/// later ones win fingerprint collisions under the overwrite and warn policies.
#[derive(Debug, Clone)]
pub enum Source {
    /// A single HAR file.
    HarFile(PathBuf),
    /// Every `*.har` file under a directory, recursively, in sorted path order.
    HarDir(PathBuf),
    /// Interactions built in memory.
    Interactions(Vec<RecordedInteraction>),
}

impl Source {
    /// A HAR file or directory, depending on what is at `path`.
    pub fn path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if path.is_dir() {
            Self::HarDir(path)
        } else {
            Self::HarFile(path)
        }
    }

    /// Loads every interaction from this source.
    ///
    /// # Errors
    ///
    /// Fails on the first unreadable file or invalid entry; nothing is returned
    /// from a partially valid source.
    pub fn load(&self) -> Result<Vec<RecordedInteraction>, ReplayError> {
        match self {
            Self::HarFile(path) => load_har_file(path),
            Self::HarDir(dir) => {
                let mut files = Vec::new();
                collect_har_files(dir, &mut files)?;
                files.sort();
                let mut interactions = Vec::new();
                for file in &files {
                    interactions.extend(load_har_file(file)?);
                }
                Ok(interactions)
            }
            Self::Interactions(interactions) => Ok(interactions
                .iter()
                .enumerate()
                .map(|(index, interaction)| {
                    let mut interaction = interaction.clone();
                    if interaction.metadata.source.is_empty() {
                        interaction.metadata.source = format!("memory#{index}");
                    }
                    interaction
                })
                .collect()),
        }
    }
}

fn load_har_file(path: &Path) -> Result<Vec<RecordedInteraction>, ReplayError> {
    let har = load_har(path)?;
    let label = path.display().to_string();
    tracing::debug!(path = %label, entries = har.log.entries.len(), "loaded HAR file");
    har.log
        .entries
        .iter()
        .enumerate()
        .map(|(index, entry)| RecordedInteraction::from_har_entry(entry, &label, index))
        .collect()
}

fn collect_har_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), ReplayError> {
    let io_error = |source| ReplayError::Io { path: dir.to_path_buf(), source };
    for entry in std::fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_dir() {
            collect_har_files(&path, files)?;
        } else if path.extension().is_some_and(|ext| ext == "har") {
            files.push(path);
        }
    }
    Ok(())
}
