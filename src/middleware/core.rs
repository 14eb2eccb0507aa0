use std::time::Duration;

use crate::dispatcher::InvocationRequest;
use crate::response::Response;

/// Hooks run by the router around every resolved invocation.
///
/// `before` may short-circuit the request by returning a response; the
/// action is then not invoked. `after` sees the final response, whichever
/// path produced it.
pub trait Middleware: Send + Sync {
    fn before(&self, _req: &InvocationRequest) -> Option<Response> {
        None
    }
    fn after(&self, _req: &InvocationRequest, _res: &mut Response, _latency: Duration) {}
}
