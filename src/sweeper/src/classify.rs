//! Staleness predicate.

use chrono::{DateTime, Duration, Utc};

/// Age threshold past which an object is stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StalenessPolicy {
    threshold: Duration,
}

impl StalenessPolicy {
    pub fn from_days(days: u64) -> Self {
        let days = i64::try_from(days).unwrap_or(i64::MAX);
        // Saturate instead of overflowing for absurd thresholds
        let threshold = Duration::try_days(days).unwrap_or(Duration::MAX);
        Self { threshold }
    }

    pub fn threshold(&self) -> Duration {
        self.threshold
    }

    /// `now - last_modified > threshold`. An object exactly at the threshold
    /// is not stale, and objects modified in the future never are.
    pub fn is_stale(&self, now: DateTime<Utc>, last_modified: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_modified) > self.threshold
    }
}
