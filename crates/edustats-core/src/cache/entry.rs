use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Last known value for a cache key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub key: String,
    pub payload: T,
    pub fetched_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(key: impl Into<String>, payload: T) -> Self {
        Self::at(key, payload, Utc::now())
    }

    pub fn at(key: impl Into<String>, payload: T, fetched_at: DateTime<Utc>) -> Self {
        Self {
            key: key.into(),
            payload,
            fetched_at,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.fetched_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        format_age(self.age_minutes())
    }

    pub fn is_stale(&self, max_age: Duration) -> bool {
        Utc::now() - self.fetched_at > max_age
    }
}

/// Human-readable age, rounding up past the half unit ("1h 30m" reads as "2h ago").
pub fn format_age(minutes: i64) -> String {
    if minutes < 1 {
        // Covers clock skew too
        "just now".to_string()
    } else if minutes < 60 {
        format!("{}m ago", minutes)
    } else if minutes < 1440 {
        let hours = minutes / 60;
        if minutes % 60 >= 30 {
            format!("{}h ago", hours + 1)
        } else {
            format!("{}h ago", hours)
        }
    } else {
        let days = minutes / 1440;
        if (minutes % 1440) / 60 >= 12 {
            format!("{}d ago", days + 1)
        } else {
            format!("{}d ago", days)
        }
    }
}
