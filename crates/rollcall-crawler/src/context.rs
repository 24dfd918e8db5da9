//! Per-run crawl state.
//!
//! One [`CrawlContext`] exists per running crawl. It owns the visited-id set,
//! the found counter and the rate governor, and is shared by reference with
//! every query of the run.

use crate::directory::{Directory, MemberSignal};
use crate::governor::RateGovernor;
use crate::progress::ProgressReporter;
use rollcall_core::{CrawlerConfig, GroupId, MemberId, TierFilter};
use rollcall_db::{members, Database, MemberRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

/// State shared by every query of one crawl.
pub struct CrawlContext {
    group_id: GroupId,
    directory: Arc<dyn Directory>,
    db: Arc<Database>,
    governor: RateGovernor,
    config: CrawlerConfig,
    progress: Arc<ProgressReporter>,
    visited: Mutex<HashSet<MemberId>>,
    found: AtomicU64,
}

impl CrawlContext {
    /// Create the state for a crawl of `group_id`.
    ///
    /// `visited` should hold every member id already on record for the group;
    /// those members are never written again during this run.
    #[must_use]
    pub fn new(
        group_id: GroupId,
        directory: Arc<dyn Directory>,
        db: Arc<Database>,
        config: CrawlerConfig,
        progress: Arc<ProgressReporter>,
        visited: HashSet<MemberId>,
    ) -> Self {
        let governor = RateGovernor::new(
            config.max_in_flight_queries,
            Duration::from_secs(config.rate_limit_grace_secs),
        );
        let found = visited.len() as u64;

        Self {
            group_id,
            directory,
            db,
            governor,
            config,
            progress,
            visited: Mutex::new(visited),
            found: AtomicU64::new(found),
        }
    }

    /// Group being crawled.
    #[must_use]
    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    /// Remote directory.
    #[must_use]
    pub fn directory(&self) -> &dyn Directory {
        self.directory.as_ref()
    }

    /// Member database.
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Shared permit pool of this crawl.
    #[must_use]
    pub fn governor(&self) -> &RateGovernor {
        &self.governor
    }

    /// Crawl tuning.
    #[must_use]
    pub fn config(&self) -> &CrawlerConfig {
        &self.config
    }

    /// Progress reporter of this crawl.
    #[must_use]
    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    /// Members on record, including those found before this run.
    #[must_use]
    pub fn found(&self) -> u64 {
        self.found.load(Ordering::Relaxed)
    }

    /// Whether `id` was already written for this group.
    #[must_use]
    pub fn is_visited(&self, id: MemberId) -> bool {
        self.visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&id)
    }

    /// Turn an observation into a record to write, if it is new and passes
    /// `filter`.
    ///
    /// Members rejected by the filter stay unvisited so a later phase can
    /// still pick them up.
    pub fn admit(&self, signal: &MemberSignal, filter: TierFilter) -> Option<MemberRecord> {
        if self.is_visited(signal.id) {
            return None;
        }

        let tier = signal.tier();
        if !filter.allows(tier) {
            return None;
        }

        let newly_visited = self
            .visited
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(signal.id);
        if !newly_visited {
            return None;
        }

        self.found.fetch_add(1, Ordering::Relaxed);
        Some(signal.to_record(self.group_id, tier))
    }

    /// Write and clear `batch`, then offer a progress update labelled `label`.
    ///
    /// A failed write is logged and the batch dropped; the members stay
    /// marked visited for the rest of the run.
    pub async fn flush(&self, batch: &mut Vec<MemberRecord>, label: &str) {
        if batch.is_empty() {
            return;
        }

        let records = std::mem::take(batch);
        if let Err(e) = members::upsert_batch(self.db.pool(), self.group_id, &records).await {
            tracing::error!(
                "Dropping batch of {} members for group {}: {}",
                records.len(),
                self.group_id,
                e
            );
        }

        self.progress.maybe_emit(self.found(), label).await;
    }
}
