//! Recorded interactions: HAR format, loading, indexing, and capture.

pub mod cache;
pub mod capture;
pub mod config;
pub mod format;
pub mod interaction;
pub mod recorder;
pub mod source;
