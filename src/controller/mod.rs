//! # Controller Module
//!
//! Controllers are named groups of actions. Instead of discovering actions at
//! runtime, every controller type is described once at startup by a
//! [`ControllerDefinition`]: an explicit table mapping each action name to its
//! handler function, its ordered validation gates and its ordered exception
//! policies.
//!
//! ## Lifecycle
//!
//! - Definitions are registered into the [`crate::registry::ControllerRegistry`]
//!   before the server starts and are immutable afterwards.
//! - For every request the registry builds a fresh controller instance from the
//!   request's parameters and pairs it with the resolved action, producing a
//!   [`BoundAction`] for the invocation pipeline.
//!
//! ## Exception handlers
//!
//! An action may register a dedicated exception handler. It is stored under
//! the sibling name `{action}_exceptionhandler` and is consulted by the
//! pipeline only after the action fails and escalation has run.

mod builtin;
mod core;
mod ping;

pub use builtin::ServerController;

pub use core::{
    normalize, ActionBuilder, ActionDescriptor, ActionError, ActionFn, ActionMeta, BoundAction,
    Controller, ControllerDefinition, ExceptionHandlerFn, EXCEPTION_HANDLER_SUFFIX, PING_ACTION,
};
pub(crate) use core::Bound;
pub use ping::{ping, PING_MESSAGE};
