//! Fingerprint-indexed cache of recorded interactions.

use std::collections::btree_map::{self, BTreeMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::interaction::RecordedInteraction;
use super::source::Source;
use crate::error::ReplayError;
use crate::filter::FilterChain;
use crate::fingerprint::{fingerprint, Fingerprint};

/// What to do when two recordings produce the same fingerprint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Keeps the later recording without saying anything.
    Overwrite,
    /// Keeps the later recording and logs a warning naming both.
    #[default]
    Warn,
    /// Fails the build.
    Reject,
}

/// Immutable map from fingerprint to recorded interaction.
///
/// Built once, then shared read-only; lookups need no locking.
#[derive(Debug, Clone)]
pub struct ReplayCache {
    entries: BTreeMap<Fingerprint, Arc<RecordedInteraction>>,
    filters: FilterChain,
}

impl ReplayCache {
    /// Loads every source, in order, and indexes the interactions by the
    /// fingerprint of their request under `filters`.
    ///
    /// # Errors
    ///
    /// Fails if any source fails to load, or on a collision under
    /// [`CollisionPolicy::Reject`]. No partial cache is returned.
    pub fn from_sources(
        sources: &[Source],
        filters: FilterChain,
        policy: CollisionPolicy,
    ) -> Result<Self, ReplayError> {
        let mut interactions = Vec::new();
        for source in sources {
            interactions.extend(source.load()?);
        }
        Self::build(interactions, filters, policy)
    }

    /// Indexes already loaded interactions.
    ///
    /// # Errors
    ///
    /// Fails on a collision under [`CollisionPolicy::Reject`].
    pub fn build(
        interactions: impl IntoIterator<Item = RecordedInteraction>,
        filters: FilterChain,
        policy: CollisionPolicy,
    ) -> Result<Self, ReplayError> {
        let mut entries: BTreeMap<Fingerprint, Arc<RecordedInteraction>> = BTreeMap::new();
        for interaction in interactions {
            let key = fingerprint(&mut interaction.request.to_request(), &filters)?;
            match entries.entry(key) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(Arc::new(interaction));
                }
                btree_map::Entry::Occupied(mut slot) => {
                    let first = slot.get().metadata.source.clone();
                    let second = interaction.metadata.source.clone();
                    match policy {
                        CollisionPolicy::Reject => {
                            return Err(ReplayError::Collision {
                                fingerprint: slot.key().clone(),
                                first,
                                second,
                            });
                        }
                        CollisionPolicy::Warn => tracing::warn!(
                            fingerprint = %slot.key(),
                            replaced = %first,
                            by = %second,
                            "recorded interactions share a fingerprint, keeping the later one"
                        ),
                        CollisionPolicy::Overwrite => {}
                    }
                    slot.insert(Arc::new(interaction));
                }
            }
        }
        tracing::info!(entries = entries.len(), filters = filters.len(), "built replay cache");
        Ok(Self { entries, filters })
    }

    /// The interaction recorded under `fingerprint`.
    #[must_use]
    pub fn lookup(&self, fingerprint: &Fingerprint) -> Option<&Arc<RecordedInteraction>> {
        self.entries.get(fingerprint)
    }

    /// The filter chain used to compute every key in this cache.
    #[must_use]
    pub fn filters(&self) -> &FilterChain {
        &self.filters
    }

    /// Entries in fingerprint order.
    pub fn iter(&self) -> impl Iterator<Item = (&Fingerprint, &RecordedInteraction)> {
        self.entries.iter().map(|(key, interaction)| (key, interaction.as_ref()))
    }

    /// Number of distinct fingerprints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
