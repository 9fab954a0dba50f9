use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unix timestamp in seconds since epoch.
///
/// Compared by value. Two Timestamps with the same inner value are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp())
    }

    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt.timestamp())
    }

    pub fn to_datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.0, 0).unwrap_or_default()
    }

    /// Timestamp `hours` after this one.
    pub fn plus_hours(&self, hours: u32) -> Self {
        Self(self.0 + i64::from(hours) * 3600)
    }

    /// True once `now` has reached or passed this timestamp.
    pub fn has_passed(&self, now: Timestamp) -> bool {
        now.0 >= self.0
    }
}
