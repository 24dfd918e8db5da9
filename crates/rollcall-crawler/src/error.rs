//! Error types for the crawler.

use rollcall_core::GroupId;
use std::time::Duration;
use thiserror::Error;

/// Failures reported by a [`Directory`](crate::Directory) implementation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    /// The platform asked for a pause before the next request
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Duration },

    /// Any other request failure
    #[error("directory request failed: {0}")]
    Transient(String),
}

/// Errors that end a crawl or an orchestrator call.
#[derive(Debug, Error)]
pub enum CrawlError {
    /// The group could not be resolved
    #[error("directory error for group {group_id}: {source}")]
    Directory {
        group_id: GroupId,
        #[source]
        source: DirectoryError,
    },

    /// Crawl state could not be read or written
    #[error("Database error: {0}")]
    Database(#[from] rollcall_db::DatabaseError),

    /// A progress sink rejected an event
    #[error("progress sink unavailable: {0}")]
    Progress(String),
}

/// Result type for crawler operations.
pub type Result<T> = std::result::Result<T, CrawlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_error_keeps_source() {
        let err = CrawlError::Directory {
            group_id: GroupId::new(-100),
            source: DirectoryError::Transient("channel private".to_string()),
        };
        assert_eq!(
            err.to_string(),
            "directory error for group -100: directory request failed: channel private"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_rate_limited_display() {
        let err = DirectoryError::RateLimited {
            retry_after: Duration::from_secs(4),
        };
        assert_eq!(err.to_string(), "rate limited, retry after 4s");
    }
}
