//! Shared types used across the Rollcall crawler.
//!
//! This module defines common newtypes and enums that provide type safety
//! and clear domain modeling.

use crate::error::RollcallError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Platform identifier of a group or channel being enumerated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(i64);

impl GroupId {
    /// Wrap a raw platform id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw platform id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for GroupId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// Platform identifier of a member (user account).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(i64);

impl MemberId {
    /// Wrap a raw platform id.
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Get the raw platform id.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MemberId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

/// How recently a member was active, finest first.
///
/// Derived from a presence signal at observation time and stored alongside
/// the member record as its lowercase label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecencyTier {
    /// Currently online
    Online,
    /// Seen within the last 24 hours
    Today,
    /// Hidden last-seen, but flagged as recently active
    Recently,
    /// Seen within the last week
    Week,
    /// Seen within the last month
    Month,
    /// Seen longer ago, or no information
    Long,
}

impl RecencyTier {
    /// Every tier, finest first.
    pub const ALL: [RecencyTier; 6] = [
        Self::Online,
        Self::Today,
        Self::Recently,
        Self::Week,
        Self::Month,
        Self::Long,
    ];

    /// Storage label for this tier.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Today => "today",
            Self::Recently => "recently",
            Self::Week => "week",
            Self::Month => "month",
            Self::Long => "long",
        }
    }
}

impl fmt::Display for RecencyTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecencyTier {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s)
            .ok_or_else(|| RollcallError::Validation(format!("unknown recency tier '{s}'")))
    }
}

/// Tiers kept by the `recent` scan mode.
pub const RECENT_TIERS: &[RecencyTier] =
    &[RecencyTier::Online, RecencyTier::Today, RecencyTier::Recently];

/// Tiers kept by the `week` scan mode.
pub const WEEK_TIERS: &[RecencyTier] = &[
    RecencyTier::Online,
    RecencyTier::Today,
    RecencyTier::Recently,
    RecencyTier::Week,
];

/// Restriction applied to members before they are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierFilter {
    /// Keep every member
    Any,
    /// Keep only members in one of these tiers
    Only(&'static [RecencyTier]),
}

impl TierFilter {
    /// Whether a member in `tier` passes the filter.
    #[must_use]
    pub fn allows(&self, tier: RecencyTier) -> bool {
        match self {
            Self::Any => true,
            Self::Only(tiers) => tiers.contains(&tier),
        }
    }
}

/// Extraction strategy chosen per group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    /// Online, today and recently active members only
    Recent,
    /// Members active within the last week
    Week,
    /// Every member in a single pass
    #[default]
    All,
    /// Every member, extracted in recency-ordered phases
    SmartTiered,
}

impl ScanMode {
    /// Storage label for this mode.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recent => "recent",
            Self::Week => "week",
            Self::All => "all",
            Self::SmartTiered => "smart_tiered",
        }
    }

    /// Filter covering everything this mode eventually keeps.
    ///
    /// `SmartTiered` keeps every tier across its phases, so a single-pass
    /// listing under that mode is unrestricted.
    #[must_use]
    pub fn overall_filter(&self) -> TierFilter {
        match self {
            Self::Recent => TierFilter::Only(RECENT_TIERS),
            Self::Week => TierFilter::Only(WEEK_TIERS),
            Self::All | Self::SmartTiered => TierFilter::Any,
        }
    }
}

impl fmt::Display for ScanMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScanMode {
    type Err = RollcallError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "recent" => Ok(Self::Recent),
            "week" => Ok(Self::Week),
            "all" => Ok(Self::All),
            "smart_tiered" => Ok(Self::SmartTiered),
            other => Err(RollcallError::Validation(format!(
                "unknown scan mode '{other}': expected recent, week, all or smart_tiered"
            ))),
        }
    }
}
