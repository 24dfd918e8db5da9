//! Presence signal classification.
//!
//! Maps the presence a member advertises to one of the six recency tiers.
//! Exact last-seen timestamps are bucketed by age; privacy-restricted
//! signals map directly.

use chrono::{DateTime, Duration, Utc};
use rollcall_core::RecencyTier;
use serde::{Deserialize, Serialize};

/// Presence advertised by a member at observation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresenceSignal {
    /// Currently online
    Online,
    /// Offline, with the exact time the member was last online
    Offline {
        /// Last time the member was online
        last_seen: DateTime<Utc>,
    },
    /// Last seen recently; exact time hidden by privacy settings
    Recently,
    /// Last seen within a week
    LastWeek,
    /// Last seen within a month
    LastMonth,
    /// No presence information
    Empty,
}

/// Classify a presence signal against the current time.
#[must_use]
pub fn classify(signal: &PresenceSignal) -> RecencyTier {
    classify_at(signal, Utc::now())
}

/// Classify a presence signal against a fixed `now`.
///
/// Offline ages are half-open buckets: an age of exactly one day is `Week`,
/// exactly seven days is `Month`, exactly thirty days is `Long`.
#[must_use]
pub fn classify_at(signal: &PresenceSignal, now: DateTime<Utc>) -> RecencyTier {
    match signal {
        PresenceSignal::Online => RecencyTier::Online,
        PresenceSignal::Offline { last_seen } => {
            let age = now.signed_duration_since(*last_seen);
            if age < Duration::days(1) {
                RecencyTier::Today
            } else if age < Duration::days(7) {
                RecencyTier::Week
            } else if age < Duration::days(30) {
                RecencyTier::Month
            } else {
                RecencyTier::Long
            }
        }
        PresenceSignal::Recently => RecencyTier::Recently,
        PresenceSignal::LastWeek => RecencyTier::Week,
        PresenceSignal::LastMonth => RecencyTier::Month,
        PresenceSignal::Empty => RecencyTier::Long,
    }
}
