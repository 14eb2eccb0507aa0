//! # Router Module
//!
//! Resolves `/{controller}/{action}` request targets against the
//! [`ControllerRegistry`](crate::registry::ControllerRegistry) and hands the
//! bound action to the invocation pipeline.
//!
//! ## Resolution
//!
//! - The path must be exactly two segments. Anything else is reported as a
//!   missing controller; an empty action segment is a missing action.
//! - Each segment is percent-decoded before lookup.
//! - The controller segment is looked up as `{segment}controller`, lowercase.
//! - The action segment is matched case-insensitively against the
//!   controller's registered actions.
//! - The query string becomes the controller's [`Parameters`](crate::params::Parameters).
//!
//! ## Outcomes
//!
//! | Situation                 | Status | Message                                              |
//! |---------------------------|--------|------------------------------------------------------|
//! | unknown controller        | 503    | `Controller does not exist.`                         |
//! | unknown action            | 503    | `Action does not exist.`                             |
//! | server blocking requests  | 503    | `Server is currently blocking all inbound requests.` |
//! | resolved                  | *      | whatever the pipeline produced                       |
//!
//! Unresolved targets mentioning `favicon` are browser asset probes; they are
//! ignored without a response or a log entry.

mod core;

pub use core::{decode_segment, split_route, split_target, Router, BLOCKED_MESSAGE};
