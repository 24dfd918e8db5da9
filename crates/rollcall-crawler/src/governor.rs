//! Rate governor.
//!
//! A single permit pool shared by every search call of a crawl, recursive
//! children included. The recursion can queue far more calls than there are
//! permits; only `capacity` of them talk to the platform at any instant.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Semaphore, SemaphorePermit};

/// Shared concurrency limiter and flood-wait handler.
#[derive(Debug, Clone)]
pub struct RateGovernor {
    permits: Arc<Semaphore>,
    capacity: usize,
    grace: Duration,
}

impl RateGovernor {
    /// Create a governor allowing `capacity` calls in flight, sleeping
    /// `grace` beyond every platform-requested wait.
    #[must_use]
    pub fn new(capacity: usize, grace: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
            grace,
        }
    }

    /// Wait for a permit. Dropping the permit releases it.
    ///
    /// Returns `None` only if the pool was closed.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.permits.acquire().await.ok()
    }

    /// Sleep out a flood wait requested by the platform.
    pub async fn back_off(&self, retry_after: Duration) {
        let wait = retry_after + self.grace;
        tracing::warn!("Flood wait: sleeping {:?}", wait);
        tokio::time::sleep(wait).await;
    }

    /// Maximum calls in flight.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}
