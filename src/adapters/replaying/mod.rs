//! Replaying adapters that serve recorded interactions.

pub mod transport;

pub use transport::{MatchingReplay, ReplayBuilder, ReplayTransport};
