//! Adapters implementing the `Transport` port.
//!
//! `live` talks to the network, `recording` wraps another transport and writes
//! what it sees to a HAR file, and `replaying` answers from recordings.

pub mod live;
pub mod recording;
pub mod replaying;

pub use live::LiveTransport;
pub use recording::RecordingTransport;
pub use replaying::{ReplayBuilder, ReplayTransport};
