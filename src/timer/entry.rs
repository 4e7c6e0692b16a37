use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use serde::Serialize;

/// A single tracked time block. An entry is open while the activity is still
/// running (`end` absent) and closed once it has been stopped or switched
/// away from. Only closed entries ever reach the history log.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct Entry {
    pub activity: Arc<str>,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub start: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_seconds_option")]
    pub end: Option<DateTime<Utc>>,
}

impl Entry {
    pub fn open(activity: Arc<str>, start: DateTime<Utc>) -> Self {
        Self {
            activity,
            start,
            end: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.end.is_none()
    }

    pub fn with_end(self, end: DateTime<Utc>) -> Self {
        Self {
            end: Some(end),
            ..self
        }
    }

    /// Length of the block. Open entries have no length yet.
    pub fn duration(&self) -> Option<Duration> {
        self.end.map(|end| end - self.start)
    }
}
