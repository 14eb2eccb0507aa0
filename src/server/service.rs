use tracing::{debug, warn};

use crate::ids::RequestId;
use crate::response::Response;
use crate::router::Router;

use super::ServerContext;

/// Header carrying the response's status description.
pub const STATUS_DESCRIPTION_HEADER: &str = "X-Status-Description";

/// Route one accepted request and write the response back.
///
/// A request the router ignores gets no reply at all: not even a status line
/// is written before the connection moves on.
pub fn handle_request(router: &Router, ctx: &ServerContext, request: tiny_http::Request) {
    let request_id = RequestId::new();
    let target = request.url().to_string();
    let Some(response) = router.handle(ctx, request_id, &target) else {
        // Dropping a `Request` makes tiny_http answer 500; dropping its writer does not.
        drop(request.into_writer());
        debug!(request_id = %request_id, target = %target, "request ignored");
        return;
    };
    let status = response.status.as_u16();
    if let Err(e) = request.respond(to_wire(&response)) {
        warn!(request_id = %request_id, target = %target, error = %e, "failed to write response");
    } else {
        debug!(request_id = %request_id, target = %target, status, "response written");
    }
}

fn header(name: &str, value: &str) -> Option<tiny_http::Header> {
    tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()).ok()
}

/// Convert a framework response into its HTTP form.
pub fn to_wire(response: &Response) -> tiny_http::Response<std::io::Cursor<Vec<u8>>> {
    let mut wire = tiny_http::Response::from_data(response.payload())
        .with_status_code(tiny_http::StatusCode(response.status.as_u16()));
    if let Some(h) = header("Content-Type", "text/plain; charset=utf-8") {
        wire.add_header(h);
    }
    if let Some(h) = header(STATUS_DESCRIPTION_HEADER, &response.status_description) {
        wire.add_header(h);
    }
    wire
}
