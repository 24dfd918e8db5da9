//! Configuration management for Rollcall.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/rollcall/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Crawl tuning (concurrency, recursion, thresholds)
    pub crawler: CrawlerConfig,
    /// Member database settings
    pub database: DatabaseConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    /// - A value fails validation
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        let config: Self = if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            toml::from_str(&contents)?
        } else {
            tracing::debug!("Config file not found, using defaults");
            Self::default()
        };

        config.crawler.validate()?;
        Ok(config)
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `ROLLCALL_DB_PATH`: Override the member database location
    /// - `ROLLCALL_MAX_IN_FLIGHT`: Override the shared search permit count
    /// - `ROLLCALL_RATE_LIMIT_RETRIES`: Override retries after a flood wait
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        config.crawler.validate()?;
        Ok(config)
    }

    /// Apply `ROLLCALL_*` environment overrides on top of the current values.
    ///
    /// Unparseable values are ignored.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("ROLLCALL_DB_PATH") {
            if !val.is_empty() {
                tracing::debug!("Override database.path from env: {}", val);
                self.database.path = Some(PathBuf::from(val));
            }
        }

        if let Ok(val) = std::env::var("ROLLCALL_MAX_IN_FLIGHT") {
            if let Ok(permits) = val.parse() {
                self.crawler.max_in_flight_queries = permits;
                tracing::debug!("Override crawler.max_in_flight_queries from env: {}", permits);
            }
        }

        if let Ok(val) = std::env::var("ROLLCALL_RATE_LIMIT_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.crawler.rate_limit_retries = retries;
                tracing::debug!("Override crawler.rate_limit_retries from env: {}", retries);
            }
        }
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/rollcall/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "rollcall", "rollcall").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/rollcall`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs =
            ProjectDirs::from("com", "rollcall", "rollcall").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Crawl tuning.
///
/// Defaults reproduce the limits the crawler was calibrated against; raising
/// `max_in_flight_queries` mostly buys flood waits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Search calls allowed in flight at once across a whole crawl
    pub max_in_flight_queries: usize,
    /// Top-level queries launched before the phase waits for them
    pub admission_batch_size: usize,
    /// Pause between admission batches in milliseconds
    pub admission_pause_ms: u64,
    /// Member records accumulated before a store flush
    pub write_batch_size: usize,
    /// Raw matches for a prefix that signal truncated results
    pub recursion_threshold: usize,
    /// Deepest recursion level (prefix length is `max_depth + 1`)
    pub max_depth: usize,
    /// Groups smaller than this try the direct listing first
    pub fast_path_threshold: u64,
    /// Direct listings at or below this size are suspected truncated
    pub truncation_cutoff: u64,
    /// Groups larger than this default to `smart_tiered`
    pub large_group_threshold: u64,
    /// Minimum seconds between progress events
    pub progress_interval_secs: u64,
    /// Extra seconds slept on top of a flood wait
    pub rate_limit_grace_secs: u64,
    /// Times a flood-waited query is re-issued before it is abandoned
    pub rate_limit_retries: u32,
    /// Member estimate used when the group hides its size
    pub fallback_member_estimate: u64,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_in_flight_queries: 5,
            admission_batch_size: 20,
            admission_pause_ms: 100,
            write_batch_size: 50,
            recursion_threshold: 100,
            max_depth: 2,
            fast_path_threshold: 10_000,
            truncation_cutoff: 250,
            large_group_threshold: 10_000,
            progress_interval_secs: 3,
            rate_limit_grace_secs: 2,
            rate_limit_retries: 0,
            fallback_member_estimate: 1000,
        }
    }
}

impl CrawlerConfig {
    /// Check that the limits describe a crawl that can make progress.
    pub fn validate(&self) -> ConfigResult<()> {
        let positive = [
            ("crawler.max_in_flight_queries", self.max_in_flight_queries),
            ("crawler.admission_batch_size", self.admission_batch_size),
            ("crawler.write_batch_size", self.write_batch_size),
            ("crawler.recursion_threshold", self.recursion_threshold),
        ];

        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Member database settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database file; defaults to `members.db` in the data directory
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolve the database file location.
    pub fn resolve_path(&self) -> ConfigResult<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => Ok(AppConfig::data_dir()?.join("members.db")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.crawler.max_in_flight_queries, 5);
        assert_eq!(config.crawler.admission_batch_size, 20);
        assert_eq!(config.crawler.write_batch_size, 50);
        assert_eq!(config.crawler.recursion_threshold, 100);
        assert_eq!(config.crawler.max_depth, 2);
        assert_eq!(config.crawler.truncation_cutoff, 250);
        assert_eq!(config.crawler.rate_limit_retries, 0);
        assert!(config.database.path.is_none());
        config.crawler.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[crawler]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(
            parsed.crawler.large_group_threshold,
            config.crawler.large_group_threshold
        );
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("config.toml");

        let mut config = AppConfig::default();
        config.crawler.max_in_flight_queries = 3;
        config.database.path = Some(tmp.path().join("members.db"));

        let contents = toml::to_string_pretty(&config).expect("serialize config");
        fs::write(&config_path, contents).expect("write config file");

        let loaded_contents = fs::read_to_string(&config_path).expect("read config file");
        let loaded: AppConfig = toml::from_str(&loaded_contents).expect("parse loaded config");

        assert_eq!(loaded.crawler.max_in_flight_queries, 3);
        assert_eq!(
            loaded.database.resolve_path().expect("resolve path"),
            tmp.path().join("members.db")
        );
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("ROLLCALL_MAX_IN_FLIGHT", "2");
        std::env::set_var("ROLLCALL_RATE_LIMIT_RETRIES", "not-a-number");
        std::env::set_var("ROLLCALL_DB_PATH", "/tmp/rollcall-test.db");

        let mut config = AppConfig::default();
        config.apply_env_overrides();

        assert_eq!(config.crawler.max_in_flight_queries, 2);
        assert_eq!(config.crawler.rate_limit_retries, 0);
        assert_eq!(
            config.database.path,
            Some(PathBuf::from("/tmp/rollcall-test.db"))
        );

        std::env::remove_var("ROLLCALL_MAX_IN_FLIGHT");
        std::env::remove_var("ROLLCALL_RATE_LIMIT_RETRIES");
        std::env::remove_var("ROLLCALL_DB_PATH");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r"
[crawler]
max_depth = 1
rate_limit_retries = 2
";

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.crawler.max_depth, 1);
        assert_eq!(config.crawler.rate_limit_retries, 2);
        // These should be defaults
        assert_eq!(config.crawler.max_in_flight_queries, 5);
        assert_eq!(config.crawler.fast_path_threshold, 10_000);
    }

    #[test]
    fn test_validate_rejects_zero_permits() {
        let config = CrawlerConfig {
            max_in_flight_queries: 0,
            ..CrawlerConfig::default()
        };

        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "crawler.max_in_flight_queries"
        ));
    }
}
