//! Crawl progress reporting.
//!
//! The crawler emits [`ProgressEvent`]s to a [`ProgressSink`] owned by the
//! presentation layer. Emissions are throttled and sink failures never
//! affect the crawl.

use crate::error::CrawlError;
use async_trait::async_trait;
use rollcall_core::GroupId;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Highest percentage shown before a crawl completes.
const MAX_RUNNING_PERCENTAGE: f64 = 99.9;

/// Label of the final event of a completed crawl.
pub const COMPLETE_LABEL: &str = "Indexed";

/// Snapshot of a running crawl.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Group being crawled
    pub group_id: GroupId,
    /// Found members relative to the estimate, capped below 100 while running
    pub percentage: f64,
    /// Current phase and query
    pub phase_label: String,
    /// Members on record for the group, including earlier runs
    pub found: u64,
    /// Estimated group size
    pub total_estimate: u64,
}

/// Receiver of progress events.
#[async_trait]
pub trait ProgressSink: Send + Sync {
    /// Deliver one event.
    async fn report(&self, event: &ProgressEvent) -> Result<(), CrawlError>;
}

/// Sink that discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

#[async_trait]
impl ProgressSink for NoopSink {
    async fn report(&self, _event: &ProgressEvent) -> Result<(), CrawlError> {
        Ok(())
    }
}

/// Percentage shown for `found` out of `total`, capped while running.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn running_percentage(found: u64, total: u64) -> f64 {
    let pct = found as f64 / total.max(1) as f64 * 100.0;
    pct.min(MAX_RUNNING_PERCENTAGE)
}

/// Throttled progress emitter for one crawl.
pub struct ProgressReporter {
    group_id: GroupId,
    sink: Arc<dyn ProgressSink>,
    interval: Duration,
    total_estimate: AtomicU64,
    last_emit: Mutex<Instant>,
    last_event: Mutex<Option<ProgressEvent>>,
}

impl ProgressReporter {
    /// Create a reporter. The first throttled emission happens no sooner
    /// than `interval` after creation.
    #[must_use]
    pub fn new(group_id: GroupId, sink: Arc<dyn ProgressSink>, interval: Duration) -> Self {
        Self {
            group_id,
            sink,
            interval,
            total_estimate: AtomicU64::new(0),
            last_emit: Mutex::new(Instant::now()),
            last_event: Mutex::new(None),
        }
    }

    /// Set the group size percentages are computed against.
    pub fn set_total_estimate(&self, total: u64) {
        self.total_estimate.store(total, Ordering::Relaxed);
    }

    /// Current group size estimate.
    #[must_use]
    pub fn total_estimate(&self) -> u64 {
        self.total_estimate.load(Ordering::Relaxed)
    }

    /// Emit an event unless one was emitted within the throttle interval.
    ///
    /// Returns whether an event was sent.
    pub async fn maybe_emit(&self, found: u64, label: &str) -> bool {
        {
            let mut last = self
                .last_emit
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            if last.elapsed() < self.interval {
                return false;
            }
            *last = Instant::now();
        }

        let total = self.total_estimate();
        let event = self.event(running_percentage(found, total), label, found, total);
        self.send(event).await;
        true
    }

    /// Emit the final 100% event, bypassing the throttle.
    pub async fn finish(&self, found: u64) {
        let event = self.event(100.0, COMPLETE_LABEL, found, self.total_estimate());
        self.send(event).await;
    }

    /// Re-send the latest event, or a starting event if none was sent yet.
    pub async fn refresh(&self) {
        let event = self
            .last_event()
            .unwrap_or_else(|| self.event(0.0, "Starting", 0, self.total_estimate()));
        self.deliver(&event).await;
    }

    /// Latest event sent, if any.
    #[must_use]
    pub fn last_event(&self) -> Option<ProgressEvent> {
        self.last_event
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    fn event(&self, percentage: f64, label: &str, found: u64, total: u64) -> ProgressEvent {
        ProgressEvent {
            group_id: self.group_id,
            percentage,
            phase_label: label.to_string(),
            found,
            total_estimate: total,
        }
    }

    async fn send(&self, event: ProgressEvent) {
        *self
            .last_event
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(event.clone());
        self.deliver(&event).await;
    }

    async fn deliver(&self, event: &ProgressEvent) {
        if let Err(e) = self.sink.report(event).await {
            tracing::debug!("Dropping progress event for group {}: {}", self.group_id, e);
        }
    }
}
