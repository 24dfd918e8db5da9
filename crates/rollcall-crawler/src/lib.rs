//! Rollcall Crawler - exhaustive group member enumeration.
//!
//! The platform's member search only ever returns a capped slice of a
//! group. This crate recovers the whole membership by recursively expanding
//! search prefixes until every slice is below the cap, while staying under
//! the platform's rate limit and checkpointing progress so an interrupted
//! crawl picks up where it stopped.
//!
//! # Features
//!
//! - Direct listing for small groups, with truncation detection
//! - Recursive prefix search over Latin, digit and Persian alphabets
//! - Activity-tiered phases so recently active members land first
//! - Shared permit pool and flood-wait backoff
//! - Resumable checkpoints and per-run deduplication of writes
//!
//! # Example
//!
//! ```rust,ignore
//! use rollcall_core::{telemetry, AppConfig};
//! use rollcall_crawler::{CrawlOrchestrator, CrawlStart};
//! use rollcall_db::Database;
//! use std::sync::Arc;
//!
//! telemetry::init_tracing();
//! let config = AppConfig::load_with_env()?;
//! let database = Database::open(&config.database).await?;
//!
//! let orchestrator = CrawlOrchestrator::new(Arc::new(directory), Arc::new(database))
//!     .with_config(config.crawler.clone())
//!     .with_progress_sink(Arc::new(dashboard));
//!
//! if let CrawlStart::Started(handle) = orchestrator.start_crawl(group_id).await {
//!     let report = handle.await??;
//!     println!("{} members on record", report.total_on_record);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod alphabet;
pub mod classifier;
pub mod context;
pub mod directory;
#[allow(missing_docs)]
pub mod error;
pub mod expansion;
#[allow(missing_docs)]
pub mod fast_path;
pub mod governor;
pub mod orchestrator;
pub mod phases;
pub mod progress;

// Re-export commonly used types
pub use classifier::{classify, classify_at, PresenceSignal};
pub use directory::{Directory, GroupInfo, MemberSignal, MemberStream};
pub use error::{CrawlError, DirectoryError, Result};
pub use expansion::{ExpansionStats, QueryExpansionEngine};
pub use fast_path::{FastPathOutcome, FastPathSelector};
pub use governor::RateGovernor;
pub use orchestrator::{CrawlOrchestrator, CrawlReport, CrawlStart};
pub use phases::{phases_for, Phase, PhaseOrchestrator, PhaseSummary};
pub use progress::{NoopSink, ProgressEvent, ProgressSink};
