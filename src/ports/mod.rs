//! Port traits defining external boundaries.
//!
//! The only boundary is the HTTP transport. Live, recording, and replaying
//! implementations live in `src/adapters/`.

pub mod transport;

pub use transport::Transport;
