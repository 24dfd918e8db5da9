//! Rollcall Core - Foundation crate for the Rollcall member crawler.
//!
//! This crate provides shared types, error handling, configuration management
//! and logging setup that the storage and crawler crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - Shared newtypes and enums (`GroupId`, `MemberId`, `RecencyTier`, `ScanMode`)
//! - [`telemetry`] - `tracing` subscriber initialisation
//!
//! # Example
//!
//! ```rust
//! use rollcall_core::{AppConfig, RecencyTier, ScanMode};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = AppConfig::default();
//! assert_eq!(config.crawler.max_in_flight_queries, 5);
//!
//! let filter = ScanMode::Recent.overall_filter();
//! assert!(filter.allows(RecencyTier::Online));
//! assert!(!filter.allows(RecencyTier::Week));
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod telemetry;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, CrawlerConfig, DatabaseConfig};
pub use error::{ConfigError, ConfigResult, Result, RollcallError};
pub use types::{GroupId, MemberId, RecencyTier, ScanMode, TierFilter, RECENT_TIERS, WEEK_TIERS};
