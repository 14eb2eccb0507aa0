//! # Server Module
//!
//! The lifecycle manager and its acceptor loop.
//!
//! A [`Server`] owns one listener and exactly one acceptor thread. The
//! acceptor blocks on the listener and hands every accepted request to a
//! [`TaskSpawner`](crate::worker_pool::TaskSpawner) so accept throughput does
//! not depend on handler latency. `start()` and `stop()` block the calling
//! thread, polling every 100 ms for up to 10 s.
//!
//! The [`ServerContext`] carries the server id and the process-wide
//! `BlockRequests` flag; it is shared with the router and the pipeline by
//! reference rather than through global state.

mod context;
mod http_server;
mod service;

pub use context::ServerContext;
pub use http_server::{Server, ServerError, State, LIFECYCLE_TIMEOUT, POLL_INTERVAL};
pub use service::{handle_request, to_wire, STATUS_DESCRIPTION_HEADER};
