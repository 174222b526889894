//! Live adapters for real network interactions.

pub mod transport;

pub use transport::LiveTransport;
