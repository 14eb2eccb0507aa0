//! # Runtime Configuration Module
//!
//! Environment-driven tuning of how request handling is scheduled.
//!
//! ## Environment Variables
//!
//! ### `ACTIONSERVER_STACK_SIZE`
//!
//! Stack size for request coroutines. Accepts decimal (`131072`) or
//! hexadecimal (`0x20000`). Default: `0x20000` (128 KB).
//!
//! ### `ACTIONSERVER_WORKERS`
//!
//! `0` (default) spawns one coroutine per accepted request. Any other value
//! runs request handling on a fixed pool of that many worker coroutines.
//!
//! ### `ACTIONSERVER_SHUTDOWN_GRACE_MS`
//!
//! How long `stop()` waits for in-flight requests after the listener closes.
//! Default: `2000`.
//!
//! ## Usage
//!
//! ```rust
//! use actionserver::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;
use std::sync::Arc;
use std::time::Duration;

use crate::worker_pool::{CoroutineSpawner, SubmitError, TaskSpawner, WorkerPool, WorkerPoolConfig};

pub const DEFAULT_STACK_SIZE: usize = 0x20000;
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_millis(2000);

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Worker coroutines; `0` means one coroutine per request
    pub workers: usize,
    /// Wait for in-flight requests during `stop()`
    pub shutdown_grace: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: 0,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x").or_else(|| val.strip_prefix("0X")) {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let stack_size = env::var("ACTIONSERVER_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(defaults.stack_size);
        let workers = env::var("ACTIONSERVER_WORKERS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(defaults.workers);
        let shutdown_grace = env::var("ACTIONSERVER_SHUTDOWN_GRACE_MS")
            .ok()
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.shutdown_grace);
        RuntimeConfig {
            stack_size,
            workers,
            shutdown_grace,
        }
    }

    /// Build the configured task spawner.
    pub fn spawner(&self) -> Result<Arc<dyn TaskSpawner>, SubmitError> {
        if self.workers == 0 {
            Ok(Arc::new(CoroutineSpawner::new(self.stack_size)))
        } else {
            let pool = WorkerPool::new(WorkerPoolConfig::new(self.workers, self.stack_size))?;
            Ok(Arc::new(pool))
        }
    }
}
