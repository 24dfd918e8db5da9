//! Fast-path selector.
//!
//! For small groups a single direct listing is far cheaper than a prefix
//! search. The platform truncates that listing without saying so, so the
//! result is checked against the size estimate before it is trusted.

use crate::context::CrawlContext;
use futures::StreamExt;
use rollcall_core::ScanMode;
use serde::Serialize;

/// Progress label used while the direct listing runs.
const LISTING_LABEL: &str = "Direct listing";

/// What the direct listing achieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FastPathOutcome {
    /// The listing returned the whole group
    Complete { direct_count: u64 },
    /// The listing was silently capped
    Truncated { direct_count: u64, estimate: u64 },
    /// The listing errored part way through
    Failed { direct_count: u64, reason: String },
    /// The group was too large to try
    Skipped,
}

impl FastPathOutcome {
    /// Whether the phased search still has to run.
    #[must_use]
    pub fn requires_phases(&self) -> bool {
        !matches!(self, Self::Complete { .. })
    }
}

/// Whether a direct listing of `direct_count` members was capped, given the
/// group is believed to hold `estimate`.
#[must_use]
pub fn is_truncated(direct_count: u64, estimate: u64, cutoff: u64) -> bool {
    direct_count <= cutoff && estimate > cutoff
}

/// Single-pass listing for small groups.
pub struct FastPathSelector<'a> {
    ctx: &'a CrawlContext,
}

impl<'a> FastPathSelector<'a> {
    /// Create a selector over `ctx`.
    #[must_use]
    pub fn new(ctx: &'a CrawlContext) -> Self {
        Self { ctx }
    }

    /// Try the direct listing for a group believed to hold `estimate` members.
    pub async fn run(&self, estimate: u64, mode: ScanMode) -> FastPathOutcome {
        let ctx = self.ctx;
        let config = ctx.config();

        if estimate >= config.fast_path_threshold {
            tracing::info!(
                "Group {} estimated at {} members, skipping direct listing",
                ctx.group_id(),
                estimate
            );
            return FastPathOutcome::Skipped;
        }

        let Some(permit) = ctx.governor().acquire().await else {
            return FastPathOutcome::Failed {
                direct_count: 0,
                reason: "rate governor closed".to_string(),
            };
        };

        let filter = mode.overall_filter();
        let mut direct_count = 0u64;
        let mut batch = Vec::with_capacity(config.write_batch_size);
        let mut failure = None;

        let mut stream = ctx.directory().list_members(ctx.group_id());
        while let Some(item) = stream.next().await {
            match item {
                Ok(signal) => {
                    direct_count += 1;
                    if let Some(record) = ctx.admit(&signal, filter) {
                        batch.push(record);
                        if batch.len() >= config.write_batch_size {
                            ctx.flush(&mut batch, LISTING_LABEL).await;
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
        drop(permit);

        ctx.flush(&mut batch, LISTING_LABEL).await;

        if let Some(e) = failure {
            tracing::warn!(
                "Direct listing of group {} failed after {} members: {}",
                ctx.group_id(),
                direct_count,
                e
            );
            return FastPathOutcome::Failed {
                direct_count,
                reason: e.to_string(),
            };
        }

        if is_truncated(direct_count, estimate, config.truncation_cutoff) {
            tracing::info!(
                "Direct listing of group {} looks truncated ({} of ~{}), falling back to search",
                ctx.group_id(),
                direct_count,
                estimate
            );
            return FastPathOutcome::Truncated {
                direct_count,
                estimate,
            };
        }

        tracing::info!(
            "Direct listing of group {} returned {} members",
            ctx.group_id(),
            direct_count
        );
        FastPathOutcome::Complete { direct_count }
    }
}
