//! # Worker Pool Module
//!
//! Task submission for accepted connections.
//!
//! The acceptor loop never runs request handling itself: every accepted
//! request becomes a [`Task`] handed to a [`TaskSpawner`]. Two spawners ship:
//!
//! - [`CoroutineSpawner`]: one `may` coroutine per task, no upper bound on
//!   concurrency. This is the default.
//! - [`WorkerPool`]: a fixed number of worker coroutines sharing an unbounded
//!   `may` MPSC queue, with dispatch/completion metrics.
//!
//! Admission control or a bounded queue can be added as another
//! `TaskSpawner` without touching the router or the pipeline.
//!
//! [`InFlight`] counts tasks that have been accepted but not yet finished so
//! shutdown can wait for them.

use may::sync::mpsc;
use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Unit of work submitted by the acceptor loop.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Error raised when a task cannot be scheduled
#[derive(Debug)]
pub enum SubmitError {
    /// The runtime refused to create a coroutine
    Spawn(std::io::Error),
    /// The pool's workers have all exited
    Closed,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::Spawn(e) => write!(f, "failed to spawn coroutine: {e}"),
            SubmitError::Closed => write!(f, "worker pool is closed"),
        }
    }
}

impl std::error::Error for SubmitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SubmitError::Spawn(e) => Some(e),
            SubmitError::Closed => None,
        }
    }
}

/// Single extension point for scheduling request handling.
pub trait TaskSpawner: Send + Sync {
    /// Schedule `task` without waiting for it to run.
    fn submit(&self, task: Task) -> Result<(), SubmitError>;
}

/// Spawns one detached coroutine per task.
#[derive(Debug, Clone, Copy)]
pub struct CoroutineSpawner {
    stack_size: usize,
}

impl CoroutineSpawner {
    pub fn new(stack_size: usize) -> Self {
        Self { stack_size }
    }
}

impl TaskSpawner for CoroutineSpawner {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        // SAFETY: `Builder::spawn` is unsafe because a coroutine must not block
        // on thread-local state owned by another coroutine. Tasks only use
        // their own captured values and may-aware synchronization.
        #[allow(unsafe_code)]
        let spawned = unsafe {
            may::coroutine::Builder::new()
                .stack_size(self.stack_size)
                .spawn(task)
        };
        // Dropping the join handle detaches the coroutine.
        spawned.map(drop).map_err(SubmitError::Spawn)
    }
}

/// Configuration for a worker pool
#[derive(Debug, Clone)]
pub struct WorkerPoolConfig {
    /// Number of worker coroutines
    pub num_workers: usize,
    /// Stack size for worker coroutines
    pub stack_size: usize,
}

impl WorkerPoolConfig {
    pub fn new(num_workers: usize, stack_size: usize) -> Self {
        Self {
            num_workers,
            stack_size,
        }
    }
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 4,
            stack_size: crate::runtime_config::DEFAULT_STACK_SIZE,
        }
    }
}

/// Metrics for a worker pool
#[derive(Debug, Default)]
pub struct WorkerPoolMetrics {
    /// Current queue depth (approximate)
    pub queue_depth: AtomicUsize,
    /// Total tasks dispatched
    pub dispatched_count: AtomicU64,
    /// Total tasks completed
    pub completed_count: AtomicU64,
    /// Tasks that panicked
    pub panicked_count: AtomicU64,
}

impl WorkerPoolMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_dispatch(&self) {
        self.dispatched_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_completion(&self) {
        self.completed_count.fetch_add(1, Ordering::Relaxed);
        self.queue_depth.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn record_panic(&self) {
        self.panicked_count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_queue_depth(&self) -> usize {
        self.queue_depth.load(Ordering::Relaxed)
    }

    pub fn get_dispatched_count(&self) -> u64 {
        self.dispatched_count.load(Ordering::Relaxed)
    }

    pub fn get_completed_count(&self) -> u64 {
        self.completed_count.load(Ordering::Relaxed)
    }

    pub fn get_panicked_count(&self) -> u64 {
        self.panicked_count.load(Ordering::Relaxed)
    }
}

/// Fixed set of worker coroutines draining a shared queue.
///
/// Workers exit once the pool is dropped and the queue is empty.
pub struct WorkerPool {
    config: WorkerPoolConfig,
    sender: mpsc::Sender<Task>,
    metrics: Arc<WorkerPoolMetrics>,
}

impl WorkerPool {
    /// Spawn the workers.
    ///
    /// Fails if the runtime refuses to create the first worker; later spawn
    /// failures are logged and the pool runs with fewer workers.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, SubmitError> {
        let (tx, rx) = mpsc::channel::<Task>();
        let rx = Arc::new(may::sync::Mutex::new(rx));
        let metrics = Arc::new(WorkerPoolMetrics::new());

        info!(
            num_workers = config.num_workers,
            stack_size = config.stack_size,
            "Creating worker pool"
        );

        let mut spawned = 0;
        for worker_id in 0..config.num_workers.max(1) {
            let rx = Arc::clone(&rx);
            let metrics = Arc::clone(&metrics);
            // SAFETY: workers only touch the shared queue and the task they
            // pulled from it; both are may-aware.
            #[allow(unsafe_code)]
            let result = unsafe {
                may::coroutine::Builder::new()
                    .stack_size(config.stack_size)
                    .spawn(move || worker_loop(worker_id, &rx, &metrics))
            };
            match result {
                Ok(_) => spawned += 1,
                Err(e) if spawned == 0 => return Err(SubmitError::Spawn(e)),
                Err(e) => error!(worker_id, error = %e, "Failed to spawn worker coroutine"),
            }
        }

        Ok(Self {
            config,
            sender: tx,
            metrics,
        })
    }

    pub fn metrics(&self) -> &Arc<WorkerPoolMetrics> {
        &self.metrics
    }

    pub fn config(&self) -> &WorkerPoolConfig {
        &self.config
    }
}

fn worker_loop(
    worker_id: usize,
    rx: &may::sync::Mutex<mpsc::Receiver<Task>>,
    metrics: &WorkerPoolMetrics,
) {
    debug!(worker_id, "Worker coroutine started");
    loop {
        let next = match rx.lock() {
            Ok(queue) => queue.recv(),
            Err(_) => break,
        };
        let Ok(task) = next else {
            // Channel closed
            break;
        };
        if let Err(panic) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
            metrics.record_panic();
            error!(worker_id, panic_message = ?panic, "Task panicked");
        }
        metrics.record_completion();
    }
    debug!(worker_id, "Worker coroutine exiting");
}

impl TaskSpawner for WorkerPool {
    fn submit(&self, task: Task) -> Result<(), SubmitError> {
        self.metrics.record_dispatch();
        if self.sender.send(task).is_err() {
            self.metrics.record_completion();
            error!("Worker pool channel disconnected");
            return Err(SubmitError::Closed);
        }
        Ok(())
    }
}

/// Counter of accepted requests whose handling has not finished.
#[derive(Debug, Clone, Default)]
pub struct InFlight(Arc<AtomicUsize>);

/// Decrements the owning [`InFlight`] counter when dropped.
#[derive(Debug)]
pub struct InFlightGuard(Arc<AtomicUsize>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn enter(&self) -> InFlightGuard {
        self.0.fetch_add(1, Ordering::AcqRel);
        InFlightGuard(Arc::clone(&self.0))
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::Acquire)
    }

    /// Wait until no task is in flight. Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.count() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_pool_config_default() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.num_workers, 4);
        assert_eq!(config.stack_size, crate::runtime_config::DEFAULT_STACK_SIZE);
    }

    #[test]
    fn test_worker_pool_metrics() {
        let metrics = WorkerPoolMetrics::new();
        assert_eq!(metrics.get_queue_depth(), 0);

        metrics.record_dispatch();
        assert_eq!(metrics.get_dispatched_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 1);

        metrics.record_completion();
        assert_eq!(metrics.get_completed_count(), 1);
        assert_eq!(metrics.get_queue_depth(), 0);

        metrics.record_panic();
        assert_eq!(metrics.get_panicked_count(), 1);
    }

    #[test]
    fn test_in_flight_guard_decrements_on_drop() {
        let in_flight = InFlight::new();
        let a = in_flight.enter();
        let b = in_flight.enter();
        assert_eq!(in_flight.count(), 2);
        drop(a);
        assert!(!in_flight.wait_idle(Duration::from_millis(20)));
        drop(b);
        assert!(in_flight.wait_idle(Duration::from_millis(20)));
    }
}
