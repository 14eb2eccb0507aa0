//! # Dispatcher Module
//!
//! The invocation pipeline: the single point where an action's outcome, good
//! or bad, becomes a [`Response`](crate::response::Response).
//!
//! ## Request Flow
//!
//! 1. Validation gates declared on the action run in declaration order; the
//!    first rejection produces a `409 Conflict`.
//! 2. The action is invoked. Its own response is returned unchanged.
//! 3. If the action returns an error or panics, the failure is escalated
//!    through the action's exception policies, then handed to the action's
//!    `{action}_exceptionhandler` when one is registered. Without a handler
//!    the client receives a `500` carrying the root-cause message.
//!
//! Failures never cross the pipeline boundary: panics are caught with
//! `catch_unwind`, including panics raised by exception handlers.

mod core;

pub use core::{InvocationPipeline, InvocationRequest};
