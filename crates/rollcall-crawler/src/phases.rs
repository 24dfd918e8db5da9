//! Phase orchestrator.
//!
//! A scan mode is a list of phases; each phase walks the whole top-level
//! alphabet under its own tier filter. Before every top-level query the
//! position is checkpointed so an interrupted crawl resumes where it stopped.

use crate::alphabet;
use crate::context::CrawlContext;
use crate::expansion::{ExpansionStats, QueryExpansionEngine};
use futures::stream::{FuturesUnordered, StreamExt};
use rollcall_core::{RecencyTier, ScanMode, TierFilter, RECENT_TIERS};
use rollcall_db::{checkpoints, Checkpoint};
use serde::Serialize;
use std::time::Duration;

/// One pass over the top-level alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phase {
    /// Phase number, starting at 1
    pub number: u32,
    /// Tiers written during this phase
    pub filter: TierFilter,
    /// Human-readable label used in progress events
    pub label: String,
}

impl Phase {
    fn new(number: u32, filter: TierFilter, label: impl Into<String>) -> Self {
        Self {
            number,
            filter,
            label: label.into(),
        }
    }
}

/// Phases run by `mode`, in order.
#[must_use]
pub fn phases_for(mode: ScanMode) -> Vec<Phase> {
    match mode {
        ScanMode::SmartTiered => vec![
            Phase::new(1, TierFilter::Only(RECENT_TIERS), "Phase 1: Online & Recent"),
            Phase::new(2, TierFilter::Only(&[RecencyTier::Week]), "Phase 2: Last Week"),
            Phase::new(3, TierFilter::Only(&[RecencyTier::Month]), "Phase 3: Last Month"),
            Phase::new(
                4,
                TierFilter::Only(&[RecencyTier::Long]),
                "Phase 4: Older Than Month",
            ),
        ],
        ScanMode::Recent | ScanMode::Week | ScanMode::All => {
            vec![Phase::new(1, mode.overall_filter(), format!("Phase 1: {mode}"))]
        }
    }
}

/// What one phased run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PhaseSummary {
    /// Numbers of the phases that launched at least one query
    pub phases_run: Vec<u32>,
    /// Top-level queries launched
    pub top_level_queries: usize,
    /// Totals over every query tree
    pub stats: ExpansionStats,
}

/// Runs the phases of a scan mode from a checkpoint.
pub struct PhaseOrchestrator<'a> {
    ctx: &'a CrawlContext,
}

impl<'a> PhaseOrchestrator<'a> {
    /// Create an orchestrator over `ctx`.
    #[must_use]
    pub fn new(ctx: &'a CrawlContext) -> Self {
        Self { ctx }
    }

    /// Run every phase of `mode`, resuming from `start`.
    ///
    /// The checkpoint is reset to [`Checkpoint::CLEAN`] once all phases have
    /// finished.
    pub async fn run(&self, mode: ScanMode, start: Checkpoint) -> PhaseSummary {
        let ctx = self.ctx;
        let config = ctx.config();
        let phases = phases_for(mode);
        let top_level = alphabet::base_alphabet();
        let batch_size = config.admission_batch_size.max(1);
        let pause = Duration::from_millis(config.admission_pause_ms);

        let last_phase = phases.last().map_or(1, |p| p.number);
        let start = if start.phase > last_phase {
            tracing::warn!(
                "Checkpoint phase {} is beyond the {} phases of mode {}, starting over",
                start.phase,
                last_phase,
                mode
            );
            Checkpoint::CLEAN
        } else {
            start
        };
        if start != Checkpoint::CLEAN {
            tracing::info!(
                "Resuming group {} at phase {} index {}",
                ctx.group_id(),
                start.phase,
                start.index
            );
        }

        let mut summary = PhaseSummary::default();

        for phase in phases.iter().filter(|p| p.number >= start.phase) {
            let first = if phase.number == start.phase {
                start.index.min(top_level.len())
            } else {
                0
            };
            if first >= top_level.len() {
                continue;
            }

            tracing::info!("Group {}: {}", ctx.group_id(), phase.label);
            summary.phases_run.push(phase.number);
            let engine = QueryExpansionEngine::new(ctx, &phase.label);

            let positions: Vec<(usize, char)> =
                top_level.iter().copied().enumerate().skip(first).collect();
            let mut chunks = positions.chunks(batch_size).peekable();

            while let Some(chunk) = chunks.next() {
                let mut running = FuturesUnordered::new();
                for &(index, ch) in chunk {
                    self.save_checkpoint(Checkpoint::new(phase.number, index)).await;
                    ctx.progress()
                        .maybe_emit(ctx.found(), &format!("{ch} ({})", phase.label))
                        .await;
                    let prefix = ch.to_string();
                    let scanner = &engine;
                    running.push(async move { scanner.scan(&prefix, phase.filter).await });
                    summary.top_level_queries += 1;
                }

                while let Some(stats) = running.next().await {
                    summary.stats.merge(&stats);
                }

                if chunks.peek().is_some() && !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
            }
        }

        if let Err(e) = checkpoints::reset(ctx.db().pool(), ctx.group_id()).await {
            tracing::error!("Failed to reset checkpoint for group {}: {}", ctx.group_id(), e);
        }

        tracing::info!(
            "Group {} phases complete: {} top-level queries, {} total, {} new members",
            ctx.group_id(),
            summary.top_level_queries,
            summary.stats.queries,
            summary.stats.accepted
        );
        summary
    }

    async fn save_checkpoint(&self, checkpoint: Checkpoint) {
        let ctx = self.ctx;
        if let Err(e) = checkpoints::set(ctx.db().pool(), ctx.group_id(), checkpoint).await {
            tracing::error!(
                "Failed to save checkpoint {:?} for group {}: {}",
                checkpoint,
                ctx.group_id(),
                e
            );
        }
    }
}
