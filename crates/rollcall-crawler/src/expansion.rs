//! Query expansion engine.
//!
//! The platform's member search returns a capped result set per prefix. A
//! prefix that comes back "full" is assumed truncated and is expanded into
//! one child prefix per character of the matching alphabet, down to a fixed
//! depth. Each `(prefix, depth)` pair is a unit of work in a queue; units run
//! concurrently and are throttled only by the crawl's shared permit pool.

use crate::alphabet;
use crate::context::CrawlContext;
use crate::error::DirectoryError;
use futures::stream::{FuturesUnordered, StreamExt};
use rollcall_core::{CrawlerConfig, TierFilter};
use serde::Serialize;

/// How a single search call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QueryStatus {
    /// The result stream was exhausted
    Completed,
    /// The platform asked us to wait; the rest of the query was abandoned
    RateLimited,
    /// The call failed; the rest of the query was abandoned
    Failed,
}

/// Result of one search call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryOutcome {
    /// Prefix searched
    pub prefix: String,
    /// Recursion depth (0 for top-level queries)
    pub depth: usize,
    /// Raw matches streamed, before dedup and filtering
    pub matched: usize,
    /// New members accepted for writing
    pub accepted: usize,
    /// How the call ended
    pub status: QueryStatus,
}

/// Totals over a query tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpansionStats {
    /// Search calls issued
    pub queries: usize,
    /// New members accepted for writing
    pub accepted: usize,
    /// Calls abandoned after a flood wait
    pub rate_limited: usize,
    /// Calls abandoned after an error
    pub failed: usize,
    /// Deepest recursion level reached
    pub max_depth: usize,
}

impl ExpansionStats {
    fn record(&mut self, outcome: &QueryOutcome) {
        self.queries += 1;
        self.accepted += outcome.accepted;
        self.max_depth = self.max_depth.max(outcome.depth);
        match outcome.status {
            QueryStatus::Completed => {}
            QueryStatus::RateLimited => self.rate_limited += 1,
            QueryStatus::Failed => self.failed += 1,
        }
    }

    /// Add another tree's totals to these.
    pub fn merge(&mut self, other: &ExpansionStats) {
        self.queries += other.queries;
        self.accepted += other.accepted;
        self.rate_limited += other.rate_limited;
        self.failed += other.failed;
        self.max_depth = self.max_depth.max(other.max_depth);
    }
}

/// Whether a query with `matched` raw results at `depth` gets child queries.
#[must_use]
pub fn should_expand(matched: usize, depth: usize, config: &CrawlerConfig) -> bool {
    matched >= config.recursion_threshold && depth < config.max_depth
}

/// Recursive prefix search over one crawl.
pub struct QueryExpansionEngine<'a> {
    ctx: &'a CrawlContext,
    phase_label: &'a str,
}

impl<'a> QueryExpansionEngine<'a> {
    /// Create an engine whose progress events carry `phase_label`.
    #[must_use]
    pub fn new(ctx: &'a CrawlContext, phase_label: &'a str) -> Self {
        Self { ctx, phase_label }
    }

    fn progress_label(&self, prefix: &str) -> String {
        if self.phase_label.is_empty() {
            prefix.to_string()
        } else {
            format!("{prefix} ({})", self.phase_label)
        }
    }

    /// Exhaustively search `prefix` from depth 0.
    pub async fn scan(&self, prefix: &str, filter: TierFilter) -> ExpansionStats {
        self.scan_from(prefix, filter, 0).await
    }

    /// Exhaustively search `prefix`, treating it as sitting at `depth`.
    ///
    /// Returns once the whole query tree below `prefix` has finished.
    /// Failures of individual queries are counted, never propagated.
    pub async fn scan_from(&self, prefix: &str, filter: TierFilter, depth: usize) -> ExpansionStats {
        let mut stats = ExpansionStats::default();
        let mut pending = FuturesUnordered::new();
        pending.push(self.run_query(prefix.to_string(), depth, filter));

        while let Some(outcome) = pending.next().await {
            stats.record(&outcome);

            if should_expand(outcome.matched, outcome.depth, self.ctx.config()) {
                let children = alphabet::child_alphabet(&outcome.prefix);
                tracing::debug!(
                    "Prefix '{}' returned {} matches, expanding into {} children",
                    outcome.prefix,
                    outcome.matched,
                    children.len()
                );
                for ch in children {
                    let mut child = outcome.prefix.clone();
                    child.push(ch);
                    pending.push(self.run_query(child, outcome.depth + 1, filter));
                }
            }
        }

        stats
    }

    /// Issue one search call for `prefix` under a governor permit.
    async fn run_query(&self, prefix: String, depth: usize, filter: TierFilter) -> QueryOutcome {
        let ctx = self.ctx;
        let config = ctx.config();
        let mut outcome = QueryOutcome {
            prefix,
            depth,
            matched: 0,
            accepted: 0,
            status: QueryStatus::Completed,
        };
        let mut batch = Vec::with_capacity(config.write_batch_size);
        let mut attempts = 0;

        loop {
            let Some(permit) = ctx.governor().acquire().await else {
                tracing::warn!("Rate governor closed, skipping '{}'", outcome.prefix);
                outcome.status = QueryStatus::Failed;
                return outcome;
            };

            tracing::debug!("Scanning '{}' (depth {})", outcome.prefix, depth);

            let mut matched = 0;
            let mut failure = None;
            let mut stream = ctx.directory().search_members(ctx.group_id(), &outcome.prefix);
            while let Some(item) = stream.next().await {
                match item {
                    Ok(signal) => {
                        matched += 1;
                        if let Some(record) = ctx.admit(&signal, filter) {
                            batch.push(record);
                            outcome.accepted += 1;
                            if batch.len() >= config.write_batch_size {
                                ctx.flush(&mut batch, &self.progress_label(&outcome.prefix))
                                    .await;
                            }
                        }
                    }
                    Err(e) => {
                        failure = Some(e);
                        break;
                    }
                }
            }
            drop(stream);
            outcome.matched = outcome.matched.max(matched);

            match failure {
                None => outcome.status = QueryStatus::Completed,
                Some(DirectoryError::RateLimited { retry_after }) => {
                    // The permit is held through the wait so siblings slow down too.
                    ctx.governor().back_off(retry_after).await;
                    if attempts < config.rate_limit_retries {
                        attempts += 1;
                        tracing::info!(
                            "Retrying '{}' after flood wait ({}/{})",
                            outcome.prefix,
                            attempts,
                            config.rate_limit_retries
                        );
                        drop(permit);
                        continue;
                    }
                    tracing::warn!(
                        "Abandoning '{}' after flood wait with {} matches streamed",
                        outcome.prefix,
                        matched
                    );
                    outcome.status = QueryStatus::RateLimited;
                }
                Some(e) => {
                    tracing::warn!("Error scanning '{}': {}", outcome.prefix, e);
                    outcome.status = QueryStatus::Failed;
                }
            }

            drop(permit);
            break;
        }

        ctx.flush(&mut batch, &self.progress_label(&outcome.prefix)).await;
        outcome
    }
}
