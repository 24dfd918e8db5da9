//! Rollcall Database Layer
//!
//! Provides `SQLite` storage for the member crawler using `SQLx` with embedded
//! migrations.
//!
//! # Stores
//!
//! - [`members`] - member records keyed by (member id, group id)
//! - [`checkpoints`] - per-group crawl resume points
//! - [`scan_prefs`] - per-group scan mode preference
//!
//! # Example
//!
//! ```ignore
//! use rollcall_db::Database;
//!
//! let db = Database::new("members.db").await?;
//! db.run_migrations().await?;
//! let members = rollcall_db::members::read_all(db.pool(), group_id).await?;
//! ```
//!
//! Every store function takes a `&Pool<Sqlite>` and performs one
//! self-contained statement or transaction, so stores can be called from many
//! concurrent tasks without further coordination.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod checkpoints;
pub mod connection;
pub mod error;
pub mod members;
pub mod migrations;
pub mod scan_prefs;

// Re-export commonly used types
pub use checkpoints::Checkpoint;
pub use error::{DatabaseError, Result};
pub use members::MemberRecord;

use rollcall_core::DatabaseConfig;
use sqlx::{Pool, Sqlite};
use std::path::Path;

/// High-level database handle owning the shared connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open a database at the specified path.
    ///
    /// # Arguments
    /// * `path` - Path to the database file (or `:memory:` for in-memory)
    ///
    /// # Errors
    /// Returns `DatabaseError::Open` if the database cannot be opened.
    pub async fn new(path: impl AsRef<Path>) -> Result<Self> {
        let pool = connection::open_pool(path).await?;
        Ok(Self { pool })
    }

    /// Open the configured database, creating its directory and applying
    /// migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the path cannot be resolved or created, the
    /// database cannot be opened, or a migration fails.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        let path = config
            .resolve_path()
            .map_err(|e| DatabaseError::Open(format!("cannot resolve database path: {e}")))?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let db = Self::new(&path).await?;
        db.run_migrations().await?;
        Ok(db)
    }

    /// Run all pending database migrations.
    ///
    /// # Errors
    /// Returns `DatabaseError::Migration` if any migration fails.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get the current schema version.
    ///
    /// # Errors
    /// Returns `DatabaseError` if the version cannot be queried.
    pub async fn get_schema_version(&self) -> Result<i64> {
        migrations::get_schema_version(&self.pool).await
    }

    /// Get a reference to the underlying connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the database connection gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
