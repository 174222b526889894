//! Recording adapters that capture interactions while delegating.

pub mod transport;

pub use transport::RecordingTransport;
