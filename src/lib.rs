//! # actionserver
//!
//! A minimal controller/action HTTP service framework.
//!
//! Requests of the form `/{controller}/{action}?k=v` are routed to handler
//! functions registered on controllers. Each action declares, at registration
//! time, the parameters it requires and what should happen when it fails.
//!
//! ## Architecture
//!
//! - **[`server`]** - Lifecycle manager: listener, single acceptor thread,
//!   bounded start/stop, shared [`server::ServerContext`]
//! - **[`router`]** - Resolves `/{controller}/{action}` and checks the block flag
//! - **[`dispatcher`]** - Invocation pipeline: gates, invocation, failure handling
//! - **[`escalation`]** - Exception policies, mail transport, process-wide blocking
//! - **[`registry`]** - Immutable controller registry built at startup
//! - **[`controller`]** - Controller trait and the action registration builder
//! - **[`middleware`]** - Validation gates and `before`/`after` middleware hooks
//! - **[`worker_pool`]** - Task submission (coroutine per request or worker pool)
//! - **[`config`]**, **[`runtime_config`]**, **[`logging`]** - Ambient setup
//!
//! ## Request Flow
//!
//! ```text
//! acceptor thread ──submit──▶ TaskSpawner ──▶ Router ──▶ InvocationPipeline
//!                                               │              │
//!                                   503 unresolved/blocked     ├─ gates  ──▶ 409
//!                                                              ├─ action ──▶ response
//!                                                              └─ failure ─▶ escalate ─▶ handler / 500
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use actionserver::controller::{Controller, ControllerDefinition};
//! use actionserver::escalation::{Behavior, ExceptionPolicy};
//! use actionserver::middleware::RequiredParameters;
//! use actionserver::params::Parameters;
//! use actionserver::registry::RegistryBuilder;
//! use actionserver::response::Response;
//! use actionserver::router::Router;
//! use actionserver::runtime_config::RuntimeConfig;
//! use actionserver::server::Server;
//!
//! struct Example { params: Parameters }
//!
//! impl Controller for Example {
//!     fn from_parameters(params: Parameters) -> Self { Self { params } }
//!     fn parameters(&self) -> &Parameters { &self.params }
//! }
//!
//! # fn main() -> anyhow::Result<()> {
//! let mut registry = RegistryBuilder::new();
//! registry.register(
//!     ControllerDefinition::<Example>::new("Example")
//!         .action("echo", |c: &mut Example| {
//!             let name = c.parameters().get("name").unwrap_or_default().to_string();
//!             Ok(Response::ok("Echo", name))
//!         })
//!         .require(RequiredParameters::parse("name"))
//!         .on_error(ExceptionPolicy::log(Behavior::RemainActive))
//!         .finish(),
//! )?;
//!
//! let spawner = RuntimeConfig::from_env().spawner()?;
//! let mut server = Server::new("127.0.0.1:8080", Router::new(registry.build()), spawner);
//! server.start()?;
//! # server.shutdown()?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod escalation;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod params;
pub mod registry;
pub mod response;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod worker_pool;

pub use controller::{Controller, ControllerDefinition};
pub use params::Parameters;
pub use response::Response;
pub use server::{Server, ServerContext, ServerError};
