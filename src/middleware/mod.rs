//! Middleware hooks and validation gates.
//!
//! Two kinds of composition live here:
//!
//! - [`ValidationGate`]s are declared per action and evaluated in declaration
//!   order by the invocation pipeline; the first rejection ends evaluation.
//! - [`Middleware`] is registered on the router and wraps every resolved
//!   invocation with `before`/`after` hooks.

mod core;
mod gates;
mod metrics;
mod tracing;

pub use core::Middleware;
pub use gates::{GateChain, GateOutcome, RequiredParameters, ValidationGate};
pub use metrics::{MetricsMiddleware, MetricsSnapshot};
pub use tracing::TracingMiddleware;
