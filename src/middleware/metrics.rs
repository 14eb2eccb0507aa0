use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use super::Middleware;
use crate::dispatcher::InvocationRequest;
use crate::response::Response;

/// Counts invocations and their outcomes.
///
/// All counters are atomics updated with `Ordering::Relaxed`; readings are
/// eventually consistent.
#[derive(Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
    total_latency_ns: AtomicU64,
}

/// Point-in-time copy of the counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub requests: usize,
    /// Responses with a 4xx status
    pub client_errors: usize,
    /// Responses with a 5xx status
    pub server_errors: usize,
    pub average_latency: Duration,
}

impl MetricsMiddleware {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Mean latency across completed invocations, zero before the first one.
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.request_count(),
            client_errors: self.client_errors.load(Ordering::Relaxed),
            server_errors: self.server_errors.load(Ordering::Relaxed),
            average_latency: self.average_latency(),
        }
    }
}

impl Middleware for MetricsMiddleware {
    fn after(&self, _req: &InvocationRequest, res: &mut Response, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.total_latency_ns
            .fetch_add(latency.as_nanos() as u64, Ordering::Relaxed);
        if res.status.is_client_error() {
            self.client_errors.fetch_add(1, Ordering::Relaxed);
        } else if res.status.is_server_error() {
            self.server_errors.fetch_add(1, Ordering::Relaxed);
        }
    }
}
