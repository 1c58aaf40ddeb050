//! Middleware layer.
//!
//! Middleware runs around resource handlers and is the place for
//! cross-cutting concerns: authentication checks, request tracing, header
//! inspection. It is attached either to the whole [`Api`](crate::Api) or to
//! one verb of one [`Endpoint`](crate::Endpoint):
//!
//! ```rust
//! use astor_restful::{ApiError, Request, middleware::Trace};
//! use http::StatusCode;
//!
//! fn require_token(req: &Request) -> Result<(), ApiError> {
//!     match req.header("authorization") {
//!         Some(_) => Ok(()),
//!         None => Err(ApiError::status(StatusCode::UNAUTHORIZED)),
//!     }
//! }
//! # let _ = (require_token, Trace);
//! ```
//!
//! `before` hooks run in order, API-wide middleware first, then the verb's
//! own list in registration order. The first error short-circuits the chain
//! and is rendered like a handler error. `after` hooks of every middleware
//! whose `before` succeeded run in reverse order once the response exists.

mod trace;

use std::time::Duration;

use crate::api_error::ApiError;
use crate::request::Request;
use crate::response::Response;

pub use trace::Trace;

pub trait Middleware: Send + Sync + 'static {
    fn before(&self, _req: &Request) -> Result<(), ApiError> {
        Ok(())
    }

    fn after(&self, _req: &Request, _res: &Response, _latency: Duration) {}
}

/// Plain functions work as `before`-only middleware.
impl<F> Middleware for F
where
    F: Fn(&Request) -> Result<(), ApiError> + Send + Sync + 'static,
{
    fn before(&self, req: &Request) -> Result<(), ApiError> {
        self(req)
    }
}
