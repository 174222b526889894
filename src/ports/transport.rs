//! HTTP transport port: turn one request into one response.

use std::sync::Arc;

use crate::error::ReplayError;
use crate::message::{Request, Response};

/// Performs a single request/response exchange.
///
/// Shared by reference across threads; implementations keep any mutable state
/// behind their own locks.
pub trait Transport: Send + Sync {
    /// Sends `request` and returns the response.
    ///
    /// The request is taken by mutable reference so a transport can buffer a
    /// streaming body or apply filters in place. Callers must be able to read
    /// the body again afterwards, whether the call succeeds or fails.
    ///
    /// # Errors
    ///
    /// Returns an error if no response can be produced.
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError>;
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        (**self).round_trip(request)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn round_trip(&self, request: &mut Request) -> Result<Response, ReplayError> {
        (**self).round_trip(request)
    }
}
