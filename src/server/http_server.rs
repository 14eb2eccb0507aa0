use std::fmt;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use super::service::handle_request;
use super::ServerContext;
use crate::router::Router;
use crate::runtime_config::DEFAULT_SHUTDOWN_GRACE;
use crate::worker_pool::{InFlight, Task, TaskSpawner};

/// How often `start`/`stop` re-check the lifecycle state.
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Upper bound on how long `start`/`stop` block.
pub const LIFECYCLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Lifecycle state of the listener.
///
/// Transitions are strictly `Stopped → Starting → Started → Stopping → Stopped`;
/// the acceptor thread always leaves the state `Stopped` when it exits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum State {
    Stopped = 0,
    Starting = 1,
    Started = 2,
    Stopping = 3,
}

impl State {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => State::Starting,
            2 => State::Started,
            3 => State::Stopping,
            _ => State::Stopped,
        }
    }
}

/// Error raised by lifecycle operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerError {
    /// An acceptor thread is already running
    AlreadyRunning,
    /// The listener has not been bound yet
    NotInitialized,
    /// The listener did not reach `Started` in time
    StartupTimeout,
    /// The acceptor did not reach `Stopped` in time
    ShutdownTimeout,
    /// The listener could not be created or the acceptor died during startup
    Listener(String),
    /// The server has been shut down and cannot be restarted
    Disposed,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerError::AlreadyRunning => write!(f, "server is already running"),
            ServerError::NotInitialized => write!(f, "server listener is not initialized"),
            ServerError::StartupTimeout => {
                write!(f, "server did not start within {LIFECYCLE_TIMEOUT:?}")
            }
            ServerError::ShutdownTimeout => {
                write!(f, "server did not stop within {LIFECYCLE_TIMEOUT:?}")
            }
            ServerError::Listener(msg) => write!(f, "listener failed: {msg}"),
            ServerError::Disposed => write!(f, "server has been shut down"),
        }
    }
}

impl std::error::Error for ServerError {}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between the controlling thread and the acceptor thread.
#[derive(Default)]
struct Shared {
    state: AtomicU8,
    listener: Mutex<Option<Arc<tiny_http::Server>>>,
    local_addr: Mutex<Option<SocketAddr>>,
    startup_error: Mutex<Option<String>>,
}

impl Shared {
    fn state(&self) -> State {
        State::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set(&self, state: State) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn transition(&self, from: State, to: State) -> Result<(), State> {
        self.state
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(State::from_u8)
    }
}

/// Marks the lifecycle `Stopped` however the acceptor loop exits.
struct StoppedOnExit<'a>(&'a Shared);

impl Drop for StoppedOnExit<'_> {
    fn drop(&mut self) {
        lock(&self.0.listener).take();
        self.0.set(State::Stopped);
    }
}

/// Everything the acceptor thread needs.
struct Acceptor {
    endpoint: String,
    shared: Arc<Shared>,
    router: Arc<Router>,
    context: Arc<ServerContext>,
    spawner: Arc<dyn TaskSpawner>,
    in_flight: InFlight,
}

impl Acceptor {
    fn run(self) {
        let _stopped = StoppedOnExit(&self.shared);
        self.shared.set(State::Starting);

        let listener = match tiny_http::Server::http(self.endpoint.as_str()) {
            Ok(listener) => Arc::new(listener),
            Err(e) => {
                error!(endpoint = %self.endpoint, error = %e, "failed to bind listener");
                *lock(&self.shared.startup_error) = Some(e.to_string());
                return;
            }
        };
        let local_addr = listener.server_addr().to_ip();
        *lock(&self.shared.local_addr) = local_addr;
        *lock(&self.shared.listener) = Some(Arc::clone(&listener));

        if let Err(current) = self.shared.transition(State::Starting, State::Started) {
            warn!(state = ?current, "lifecycle changed during startup");
            return;
        }
        info!(
            server_id = %self.context.id,
            endpoint = %self.endpoint,
            local_addr = ?local_addr,
            "server listening"
        );

        loop {
            match listener.recv() {
                Ok(request) => self.dispatch(request),
                Err(e) => {
                    if self.shared.state() == State::Stopping {
                        debug!(error = %e, "listener stopped");
                    } else {
                        error!(error = %e, "accept failed, acceptor exiting");
                    }
                    break;
                }
            }
        }
        info!(server_id = %self.context.id, "acceptor exited");
    }

    /// Hand the request off without waiting for it to be handled.
    fn dispatch(&self, request: tiny_http::Request) {
        let guard = self.in_flight.enter();
        let router = Arc::clone(&self.router);
        let context = Arc::clone(&self.context);
        let task: Task = Box::new(move || {
            let _guard = guard;
            handle_request(&router, &context, request);
        });
        if let Err(e) = self.spawner.submit(task) {
            error!(error = %e, "failed to schedule request");
        }
    }
}

/// Lifecycle manager: owns the listener and its single acceptor thread.
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use actionserver::registry::RegistryBuilder;
/// use actionserver::router::Router;
/// use actionserver::runtime_config::RuntimeConfig;
/// use actionserver::server::Server;
///
/// # fn main() -> anyhow::Result<()> {
/// let registry = RegistryBuilder::new().build();
/// let spawner = RuntimeConfig::from_env().spawner()?;
/// let mut server = Server::new("127.0.0.1:8080", Router::new(registry), spawner);
/// server.start()?;
/// // ...
/// server.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct Server {
    endpoint: String,
    router: Arc<Router>,
    spawner: Arc<dyn TaskSpawner>,
    context: Arc<ServerContext>,
    shared: Arc<Shared>,
    in_flight: InFlight,
    acceptor: Option<JoinHandle<()>>,
    shutdown_grace: Duration,
    disposed: bool,
}

impl Server {
    pub fn new(endpoint: impl Into<String>, router: Router, spawner: Arc<dyn TaskSpawner>) -> Self {
        Self {
            endpoint: endpoint.into(),
            router: Arc::new(router),
            spawner,
            context: Arc::new(ServerContext::new()),
            shared: Arc::new(Shared::default()),
            in_flight: InFlight::new(),
            acceptor: None,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
            disposed: false,
        }
    }

    /// How long `stop()` waits for in-flight requests.
    #[must_use]
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    pub fn state(&self) -> State {
        self.shared.state()
    }

    pub fn context(&self) -> &Arc<ServerContext> {
        &self.context
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Address the listener is bound to; resolves port `0` to the real port.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        lock(&self.shared.local_addr).ok_or(ServerError::NotInitialized)
    }

    /// Requests accepted but not yet answered.
    pub fn in_flight(&self) -> usize {
        self.in_flight.count()
    }

    /// Whether an acceptor thread exists and has not exited.
    pub fn is_running(&self) -> bool {
        self.acceptor.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start the acceptor thread and block until the listener is accepting.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.disposed {
            return Err(ServerError::Disposed);
        }
        if self.is_running() {
            return Err(ServerError::AlreadyRunning);
        }
        self.reap();
        lock(&self.shared.startup_error).take();
        lock(&self.shared.local_addr).take();

        let acceptor = Acceptor {
            endpoint: self.endpoint.clone(),
            shared: Arc::clone(&self.shared),
            router: Arc::clone(&self.router),
            context: Arc::clone(&self.context),
            spawner: Arc::clone(&self.spawner),
            in_flight: self.in_flight.clone(),
        };
        let handle = thread::Builder::new()
            .name(format!("acceptor_{}", self.context.id))
            .spawn(move || acceptor.run())
            .map_err(|e| ServerError::Listener(e.to_string()))?;
        self.acceptor = Some(handle);

        let deadline = Instant::now() + LIFECYCLE_TIMEOUT;
        loop {
            if self.shared.state() == State::Started {
                return Ok(());
            }
            if !self.is_running() {
                self.reap();
                let reason = lock(&self.shared.startup_error)
                    .take()
                    .unwrap_or_else(|| "acceptor exited during startup".to_string());
                return Err(ServerError::Listener(reason));
            }
            if Instant::now() >= deadline {
                return Err(ServerError::StartupTimeout);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Stop accepting connections and wait for the acceptor to exit.
    ///
    /// A no-op when nothing is running. After the acceptor exits, waits up
    /// to the shutdown grace period for in-flight requests to finish.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        if self.acceptor.is_none() {
            return Ok(());
        }

        if self.shared.state() != State::Stopped {
            if let Err(current) = self.shared.transition(State::Started, State::Stopping) {
                debug!(state = ?current, "stop requested outside Started");
            }
            if let Some(listener) = lock(&self.shared.listener).take() {
                listener.unblock();
            }

            let deadline = Instant::now() + LIFECYCLE_TIMEOUT;
            while self.shared.state() != State::Stopped {
                if Instant::now() >= deadline {
                    return Err(ServerError::ShutdownTimeout);
                }
                thread::sleep(POLL_INTERVAL);
            }
        }
        self.reap();
        lock(&self.shared.local_addr).take();

        if !self.in_flight.wait_idle(self.shutdown_grace) {
            warn!(
                remaining = self.in_flight.count(),
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "in-flight requests still running after shutdown grace"
            );
        }
        info!(server_id = %self.context.id, "server stopped");
        Ok(())
    }

    /// Stop if needed and release the acceptor. Idempotent; the server
    /// cannot be started again afterwards.
    pub fn shutdown(&mut self) -> Result<(), ServerError> {
        if self.disposed {
            return Ok(());
        }
        let result = self.stop();
        self.acceptor = None;
        self.disposed = true;
        result
    }

    /// Join a finished acceptor thread and clear the reference.
    fn reap(&mut self) {
        if let Some(handle) = self.acceptor.take() {
            if handle.join().is_err() {
                error!(server_id = %self.context.id, "acceptor thread panicked");
            }
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "server shutdown on drop failed");
        }
    }
}

impl fmt::Debug for Server {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Server")
            .field("id", &self.context.id)
            .field("endpoint", &self.endpoint)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
