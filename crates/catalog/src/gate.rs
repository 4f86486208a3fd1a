//! Bounded concurrency for outstanding catalog fetches.

use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A semaphore wrapper capping in-flight fetches. Permits are RAII: a
/// fetch that times out, errors, or is aborted releases its slot on
/// drop, so the budget can never leak.
pub struct FetchGate {
    permits: Arc<Semaphore>,
    ceiling: usize,
}

impl FetchGate {
    pub const DEFAULT_CEILING: usize = 5;

    #[must_use]
    pub fn new(ceiling: usize) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            permits: Arc::new(Semaphore::new(ceiling)),
            ceiling,
        }
    }

    /// Wait for a free slot. Excess callers queue in arrival order.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.permits
            .clone()
            .acquire_owned()
            .await
            .expect("gate semaphore closed")
    }

    #[must_use]
    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

impl Default for FetchGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CEILING)
    }
}
