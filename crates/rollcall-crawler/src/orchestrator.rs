//! Crawl orchestrator.
//!
//! Entry point of the crate. The [`CrawlOrchestrator`] guards against
//! duplicate crawls of the same group, resolves the group's size and scan
//! mode, picks between the direct listing and the phased search, and reports
//! progress while doing so.

use crate::context::CrawlContext;
use crate::directory::{Directory, MemberSignal};
use crate::error::{CrawlError, Result};
use crate::fast_path::{FastPathOutcome, FastPathSelector};
use crate::phases::{PhaseOrchestrator, PhaseSummary};
use crate::progress::{NoopSink, ProgressReporter, ProgressSink};
use chrono::{DateTime, Utc};
use rollcall_core::{CrawlerConfig, GroupId, ScanMode};
use rollcall_db::{checkpoints, members, scan_prefs, Database, MemberRecord};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

type Registry = Arc<Mutex<HashMap<GroupId, Arc<ProgressReporter>>>>;

/// Summary of one finished crawl.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Unique id of this run
    pub run_id: Uuid,
    /// Group crawled
    pub group_id: GroupId,
    /// Group title at crawl start
    pub title: String,
    /// Scan mode used
    pub mode: ScanMode,
    /// Size the crawl was measured against
    pub estimate: u64,
    /// Result of the direct listing attempt
    pub fast_path: FastPathOutcome,
    /// Phased search summary, if it ran
    pub phases: Option<PhaseSummary>,
    /// Members written for the first time during this run
    pub found_this_run: u64,
    /// Members on record for the group after the run
    pub total_on_record: u64,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

/// Result of a crawl request.
#[derive(Debug)]
pub enum CrawlStart {
    /// A new crawl was launched in the background
    Started(JoinHandle<Result<CrawlReport>>),
    /// A crawl of the group was already running; its progress was re-sent
    AlreadyRunning,
}

/// Removes a group from the active registry when the crawl ends, however it
/// ends.
struct ActiveCrawl {
    registry: Registry,
    group_id: GroupId,
}

impl Drop for ActiveCrawl {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.group_id);
    }
}

/// Coordinates member crawls.
#[derive(Clone)]
pub struct CrawlOrchestrator {
    /// Remote member directory
    directory: Arc<dyn Directory>,
    /// Database for members and crawl state
    db: Arc<Database>,
    /// Receiver of progress events
    sink: Arc<dyn ProgressSink>,
    /// Crawl tuning
    config: CrawlerConfig,
    /// Groups currently being crawled
    active: Registry,
}

impl CrawlOrchestrator {
    /// Create an orchestrator with default tuning and no progress output.
    #[must_use]
    pub fn new(directory: Arc<dyn Directory>, db: Arc<Database>) -> Self {
        Self {
            directory,
            db,
            sink: Arc::new(NoopSink),
            config: CrawlerConfig::default(),
            active: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Send progress events to `sink`.
    #[must_use]
    pub fn with_progress_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Use `config` for every crawl started afterwards.
    #[must_use]
    pub fn with_config(mut self, config: CrawlerConfig) -> Self {
        self.config = config;
        self
    }

    /// Whether a crawl of `group_id` is running.
    #[must_use]
    pub fn is_crawling(&self, group_id: GroupId) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&group_id)
    }

    /// Launch a crawl of `group_id` in the background.
    ///
    /// If the group is already being crawled nothing is launched and the
    /// running crawl's latest progress event is sent again.
    pub async fn start_crawl(&self, group_id: GroupId) -> CrawlStart {
        match self.register(group_id) {
            Ok((guard, reporter)) => {
                let orchestrator = self.clone();
                let handle = tokio::spawn(async move {
                    let _guard = guard;
                    let result = orchestrator.execute(group_id, reporter).await;
                    if let Err(e) = &result {
                        tracing::error!("Crawl of group {} failed: {}", group_id, e);
                    }
                    result
                });
                CrawlStart::Started(handle)
            }
            Err(running) => {
                tracing::info!("Group {} is already being crawled", group_id);
                running.refresh().await;
                CrawlStart::AlreadyRunning
            }
        }
    }

    /// Crawl `group_id` to completion.
    ///
    /// Returns `None` without doing anything if the group is already being
    /// crawled.
    pub async fn run_crawl(&self, group_id: GroupId) -> Result<Option<CrawlReport>> {
        match self.register(group_id) {
            Ok((_guard, reporter)) => self.execute(group_id, reporter).await.map(Some),
            Err(running) => {
                tracing::info!("Group {} is already being crawled", group_id);
                running.refresh().await;
                Ok(None)
            }
        }
    }

    /// Store an explicit scan mode for `group_id`.
    pub async fn set_scan_mode(&self, group_id: GroupId, mode: ScanMode) -> Result<()> {
        scan_prefs::set(self.db.pool(), group_id, mode).await?;
        tracing::info!("Scan mode for group {} set to {}", group_id, mode);
        Ok(())
    }

    /// Store a member seen joining `group_id`.
    pub async fn record_join(&self, group_id: GroupId, signal: &MemberSignal) -> Result<MemberRecord> {
        let record = signal.to_record(group_id, signal.tier());
        members::upsert_one(self.db.pool(), &record).await?;
        tracing::debug!("Recorded member {} joining group {}", record.id, group_id);
        Ok(record)
    }

    /// Claim `group_id` in the registry, or hand back the running crawl's
    /// reporter.
    fn register(
        &self,
        group_id: GroupId,
    ) -> std::result::Result<(ActiveCrawl, Arc<ProgressReporter>), Arc<ProgressReporter>> {
        let mut active = self.active.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = active.get(&group_id) {
            return Err(Arc::clone(running));
        }

        let reporter = Arc::new(ProgressReporter::new(
            group_id,
            Arc::clone(&self.sink),
            Duration::from_secs(self.config.progress_interval_secs),
        ));
        active.insert(group_id, Arc::clone(&reporter));

        let guard = ActiveCrawl {
            registry: Arc::clone(&self.active),
            group_id,
        };
        Ok((guard, reporter))
    }

    async fn execute(&self, group_id: GroupId, reporter: Arc<ProgressReporter>) -> Result<CrawlReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("crawl", group = %group_id, run = %run_id);
        self.execute_inner(run_id, group_id, reporter)
            .instrument(span)
            .await
    }

    async fn execute_inner(
        &self,
        run_id: Uuid,
        group_id: GroupId,
        reporter: Arc<ProgressReporter>,
    ) -> Result<CrawlReport> {
        let started_at = Utc::now();
        let pool = self.db.pool();
        let config = &self.config;

        let info = self
            .directory
            .resolve_group(group_id)
            .await
            .map_err(|source| CrawlError::Directory { group_id, source })?;

        let size = self.resolve_size(group_id, info.member_count).await;
        let estimate = size.unwrap_or(config.fallback_member_estimate);
        tracing::info!(
            "Crawling '{}' ({} members{})",
            info.title,
            estimate,
            if size.is_none() { ", size unknown" } else { "" }
        );

        let mode = match scan_prefs::get(pool, group_id).await? {
            Some(mode) => mode,
            None if size.unwrap_or(0) > config.large_group_threshold => {
                tracing::info!("Large group, switching {} to smart_tiered", group_id);
                if let Err(e) = scan_prefs::set(pool, group_id, ScanMode::SmartTiered).await {
                    tracing::error!("Failed to store scan mode for group {}: {}", group_id, e);
                }
                ScanMode::SmartTiered
            }
            None => ScanMode::default(),
        };

        let visited = members::member_ids(pool, group_id).await?;
        let checkpoint = checkpoints::get(pool, group_id).await?;

        reporter.set_total_estimate(estimate);
        let ctx = CrawlContext::new(
            group_id,
            Arc::clone(&self.directory),
            Arc::clone(&self.db),
            config.clone(),
            Arc::clone(&reporter),
            visited,
        );
        let found_before = ctx.found();

        let fast_path = FastPathSelector::new(&ctx).run(estimate, mode).await;
        let phases = if fast_path.requires_phases() {
            Some(PhaseOrchestrator::new(&ctx).run(mode, checkpoint).await)
        } else {
            None
        };

        let found = ctx.found();
        reporter.finish(found).await;

        let total_on_record = match members::count(pool, group_id).await {
            Ok(n) => n,
            Err(e) => {
                tracing::warn!("Failed to count members of group {}: {}", group_id, e);
                found
            }
        };

        let report = CrawlReport {
            run_id,
            group_id,
            title: info.title,
            mode,
            estimate,
            fast_path,
            phases,
            found_this_run: found - found_before,
            total_on_record,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            "Crawl finished: {} new members, {} on record",
            report.found_this_run,
            report.total_on_record
        );
        Ok(report)
    }

    /// Group size from the advertised count, falling back to a count probe.
    ///
    /// `None` means the size could not be determined.
    async fn resolve_size(&self, group_id: GroupId, advertised: Option<u64>) -> Option<u64> {
        if let Some(count) = advertised.filter(|&n| n > 0) {
            return Some(count);
        }

        match self.directory.count_members(group_id).await {
            Ok(count) if count > 0 => Some(count),
            Ok(_) => None,
            Err(e) => {
                tracing::warn!("Count probe for group {} failed: {}", group_id, e);
                None
            }
        }
    }
}
