use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;

use crate::dispatcher::{InvocationPipeline, InvocationRequest};
use crate::ids::RequestId;
use crate::logging::{log_message, LogLevel};
use crate::middleware::Middleware;
use crate::params::Parameters;
use crate::registry::{ControllerRegistry, RouteError};
use crate::response::Response;
use crate::server::ServerContext;

pub const BLOCKED_MESSAGE: &str = "Server is currently blocking all inbound requests.";

const ASSET_PROBE: &str = "favicon";

/// Split a request target into its path and (possibly empty) query string.
#[must_use]
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// Split `/{controller}/{action}` into its two segments.
///
/// Either segment may be empty; `/example/` still names a controller and
/// resolves to a missing action.
#[must_use]
pub fn split_route(path: &str) -> Option<(&str, &str)> {
    let mut segments = path.strip_prefix('/')?.split('/');
    let controller = segments.next()?;
    let action = segments.next()?;
    if segments.next().is_some() {
        return None;
    }
    Some((controller, action))
}

/// Percent-decode one path segment. Undecodable input is matched as sent.
#[must_use]
pub fn decode_segment(segment: &str) -> Cow<'_, str> {
    urlencoding::decode(segment).unwrap_or(Cow::Borrowed(segment))
}

/// Maps request targets onto controller actions.
pub struct Router {
    registry: Arc<ControllerRegistry>,
    pipeline: InvocationPipeline,
    middlewares: Vec<Arc<dyn Middleware>>,
}

impl Router {
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self::with_pipeline(registry, InvocationPipeline::default())
    }

    pub fn with_pipeline(registry: Arc<ControllerRegistry>, pipeline: InvocationPipeline) -> Self {
        Self {
            registry,
            pipeline,
            middlewares: Vec::new(),
        }
    }

    /// Append a middleware; middlewares run in registration order.
    pub fn add_middleware(&mut self, middleware: Arc<dyn Middleware>) {
        self.middlewares.push(middleware);
    }

    pub fn registry(&self) -> &ControllerRegistry {
        &self.registry
    }

    /// Route one request target such as `/example/echo?name=Ann`.
    ///
    /// Returns `None` only for ignored asset probes.
    pub fn handle(&self, ctx: &ServerContext, request_id: RequestId, target: &str) -> Option<Response> {
        let (path, query) = split_target(target);

        let bound = split_route(path)
            .ok_or(RouteError::ControllerNotFound)
            .and_then(|(controller, action)| {
                self.registry.bind(
                    &decode_segment(controller),
                    &decode_segment(action),
                    Parameters::from_query(query),
                )
            });

        let mut bound = match bound {
            Ok(bound) => bound,
            Err(e) => {
                if target.to_lowercase().contains(ASSET_PROBE) {
                    return None;
                }
                return Some(reject(target, e.to_string()));
            }
        };

        if ctx.is_blocking() {
            return Some(reject(target, BLOCKED_MESSAGE.to_string()));
        }

        let req = InvocationRequest {
            request_id,
            path: path.to_string(),
            controller: bound.controller().to_string(),
            action: bound.meta().name.to_string(),
        };

        let start = Instant::now();
        let mut response = self
            .middlewares
            .iter()
            .find_map(|mw| mw.before(&req))
            .unwrap_or_else(|| self.pipeline.invoke(Some(bound.as_mut()), ctx));
        let latency = start.elapsed();
        for mw in &self.middlewares {
            mw.after(&req, &mut response, latency);
        }

        log_message(
            &format!("Successfully invoked {target}..."),
            LogLevel::Debug,
            None,
        );
        Some(response)
    }
}

fn reject(target: &str, message: String) -> Response {
    log_message(
        &format!("Failed to invoke {target} for the following reason: {message}..."),
        LogLevel::Warning,
        None,
    );
    Response::unavailable(target, message)
}
