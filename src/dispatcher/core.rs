use std::panic::{catch_unwind, AssertUnwindSafe};

use tracing::{debug, error};

use crate::controller::{ActionError, BoundAction};
use crate::escalation::Escalator;
use crate::ids::RequestId;
use crate::middleware::{GateChain, GateOutcome};
use crate::response::Response;
use crate::server::ServerContext;

/// Identity of a resolved invocation, as seen by middleware.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// Request path without the query string
    pub path: String,
    /// Registered controller name
    pub controller: String,
    /// Normalized action name
    pub action: String,
}

/// Runs gates, invokes the action and converts failures into responses.
#[derive(Debug, Clone, Default)]
pub struct InvocationPipeline {
    escalator: Escalator,
}

impl InvocationPipeline {
    pub fn new(escalator: Escalator) -> Self {
        Self { escalator }
    }

    /// Produce exactly one response for `action`.
    ///
    /// `None` stands for a route that resolved to no callable and yields a
    /// conflict before any gate runs.
    pub fn invoke(&self, action: Option<&mut dyn BoundAction>, ctx: &ServerContext) -> Response {
        let Some(action) = action else {
            return Response::conflict(None);
        };

        let meta = action.meta();
        if let GateOutcome::Reject(message) = GateChain::new(&meta.gates).evaluate(action.parameters())
        {
            return Response::conflict(message);
        }

        let outcome = catch_unwind(AssertUnwindSafe(|| action.invoke()));
        let failure = match outcome {
            Ok(Ok(response)) => return response,
            Ok(Err(e)) => ActionError::new(e),
            Err(panic) => ActionError::from_panic(panic),
        };

        debug!(
            controller = %action.controller(),
            action = %action.meta().name,
            error = %failure,
            "action failed, escalating"
        );
        self.escalator
            .escalate(&action.meta().policies, &failure, ctx);

        match catch_unwind(AssertUnwindSafe(|| action.handle_exception(&failure))) {
            Ok(Some(response)) => response,
            Ok(None) => Response::internal_error(failure.root_message()),
            Err(panic) => {
                let handler_failure = ActionError::from_panic(panic);
                error!(
                    controller = %action.controller(),
                    action = %action.meta().name,
                    panic_message = %handler_failure,
                    "exception handler panicked"
                );
                Response::internal_error(failure.root_message())
            }
        }
    }
}
