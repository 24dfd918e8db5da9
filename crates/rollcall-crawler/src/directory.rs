//! Directory service contract.
//!
//! The crawler never talks to the messaging platform directly; it consumes a
//! [`Directory`] that resolves groups and streams member observations. Session
//! handling, authentication and connection management live behind it.

use crate::classifier::{classify, PresenceSignal};
use crate::error::DirectoryError;
use async_trait::async_trait;
use futures::stream::BoxStream;
use rollcall_core::{GroupId, MemberId, RecencyTier};
use rollcall_db::MemberRecord;
use serde::{Deserialize, Serialize};

/// Lazily streamed member observations. Finite and not restartable.
pub type MemberStream<'a> = BoxStream<'a, Result<MemberSignal, DirectoryError>>;

/// Group metadata as reported by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInfo {
    /// Display title
    pub title: String,
    /// Advertised member count; `None` or `Some(0)` when hidden
    pub member_count: Option<u64>,
}

/// One observation of a member returned by a search or listing call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSignal {
    /// Platform user id
    pub id: MemberId,
    /// Public username, if any
    pub username: Option<String>,
    /// First name, if set
    pub first_name: Option<String>,
    /// Last name, if set
    pub last_name: Option<String>,
    /// Phone number, if visible
    pub phone: Option<String>,
    /// Whether the account is a bot
    pub is_bot: bool,
    /// Presence at observation time
    pub presence: PresenceSignal,
}

impl MemberSignal {
    /// Classify this observation against the current time.
    #[must_use]
    pub fn tier(&self) -> RecencyTier {
        classify(&self.presence)
    }

    /// Build the stored record for this observation in `group_id`.
    #[must_use]
    pub fn to_record(&self, group_id: GroupId, tier: RecencyTier) -> MemberRecord {
        MemberRecord {
            id: self.id,
            group_id,
            username: self.username.clone().filter(|u| !u.is_empty()),
            first_name: self.first_name.clone().unwrap_or_default(),
            last_name: self.last_name.clone().unwrap_or_default(),
            phone: self.phone.clone().filter(|p| !p.is_empty()),
            is_bot: self.is_bot,
            tier,
        }
    }
}

/// Remote member directory of the messaging platform.
#[async_trait]
pub trait Directory: Send + Sync {
    /// Resolve group metadata.
    async fn resolve_group(&self, group_id: GroupId) -> Result<GroupInfo, DirectoryError>;

    /// Zero-limit count probe, used when the advertised count is hidden.
    async fn count_members(&self, group_id: GroupId) -> Result<u64, DirectoryError>;

    /// Stream members whose name or username matches `prefix`.
    ///
    /// The platform caps the result set without signalling it.
    fn search_members(&self, group_id: GroupId, prefix: &str) -> MemberStream<'_>;

    /// Stream every member directly. Large groups are silently truncated.
    fn list_members(&self, group_id: GroupId) -> MemberStream<'_>;
}
