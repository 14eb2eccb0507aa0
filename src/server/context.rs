use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

use crate::ids::ServerId;

/// State shared by the lifecycle manager, the router and the pipeline.
///
/// Holds the server identity and the `BlockRequests` flag. Once set, the flag
/// stays set until [`ServerContext::reset_block`] is called.
#[derive(Debug, Default)]
pub struct ServerContext {
    pub id: ServerId,
    block: AtomicBool,
}

impl ServerContext {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_blocking(&self) -> bool {
        self.block.load(Ordering::Acquire)
    }

    /// Reject every subsequent request.
    pub fn block_requests(&self) {
        self.block.store(true, Ordering::Release);
    }

    /// Operator action: accept requests again.
    pub fn reset_block(&self) {
        if self.block.swap(false, Ordering::AcqRel) {
            info!(server_id = %self.id, "request blocking cleared");
        }
    }
}
