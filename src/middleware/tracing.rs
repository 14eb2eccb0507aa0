use std::time::Duration;

use tracing::info;

use super::Middleware;
use crate::dispatcher::InvocationRequest;
use crate::response::Response;

/// Emits one structured event per completed invocation.
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn before(&self, req: &InvocationRequest) -> Option<Response> {
        tracing::debug!(
            request_id = %req.request_id,
            controller = %req.controller,
            action = %req.action,
            "invocation started"
        );
        None
    }

    fn after(&self, req: &InvocationRequest, res: &mut Response, latency: Duration) {
        info!(
            request_id = %req.request_id,
            path = %req.path,
            controller = %req.controller,
            action = %req.action,
            status = res.status.as_u16(),
            latency_ms = latency.as_millis() as u64,
            "invocation finished"
        );
    }
}
