use std::time::Duration;

use tracing::{debug, info};

use super::Middleware;
use crate::request::Request;
use crate::response::Response;

/// Logs one line per request with method, path, status and latency.
#[derive(Clone, Copy, Debug, Default)]
pub struct Trace;

impl Middleware for Trace {
    fn before(&self, req: &Request) -> Result<(), crate::ApiError> {
        debug!(method = %req.method(), path = req.path(), "request started");
        Ok(())
    }

    fn after(&self, req: &Request, res: &Response, latency: Duration) {
        info!(
            method = %req.method(),
            path = req.path(),
            status = res.status_code().as_u16(),
            latency_ms = latency.as_millis() as u64,
            "request finished"
        );
    }
}
