use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use super::entry::CacheEntry;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Invalid cache key: {0:?}")]
    InvalidKey(String),

    #[error("Cache I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache record for {key}: {source}")]
    Corrupt {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize cache payload: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Cache lock poisoned")]
    Poisoned,
}

/// Key-value storage for cache entries.
///
/// At most one entry exists per key and `put_at` always overwrites it. There is
/// no coordination between writers: when two writes to the same key race, the
/// one that lands last is what `get` returns afterwards.
pub trait CacheStore: Send + Sync {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError>;

    fn put_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError>;

    fn put<T: Serialize>(&self, key: &str, payload: &T) -> Result<(), CacheError> {
        self.put_at(key, payload, Utc::now())
    }

    /// Read without surfacing errors; any failure reads as "no cached value".
    fn get_or_absent<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        match self.get(key) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(key, error = %e, "Cache read failed, treating as absent");
                None
            }
        }
    }

    /// Write without surfacing errors. Returns whether the entry was stored.
    fn put_or_log<T: Serialize>(&self, key: &str, payload: &T) -> bool {
        match self.put(key, payload) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to write cache entry");
                false
            }
        }
    }
}

/// Keys double as file names, so only a conservative character set is allowed.
pub fn validate_key(key: &str) -> Result<(), CacheError> {
    let valid = !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidKey(key.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_key() {
        assert!(validate_key("admin_statistics").is_ok());
        assert!(validate_key("stats-v2.daily").is_ok());

        assert!(validate_key("").is_err());
        assert!(validate_key(".hidden").is_err());
        assert!(validate_key("../escape").is_err());
        assert!(validate_key("with space").is_err());
        assert!(validate_key("nested/key").is_err());
    }
}
