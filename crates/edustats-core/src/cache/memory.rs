use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use super::entry::CacheEntry;
use super::store::{validate_key, CacheError, CacheStore};

/// In-process store. Nothing survives the process; used by tests and `--no-cache`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for MemoryStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        validate_key(key)?;
        let record = {
            let entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
            match entries.get(key) {
                Some(value) => value.clone(),
                None => return Ok(None),
            }
        };
        serde_json::from_value(record)
            .map(Some)
            .map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })
    }

    fn put_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        validate_key(key)?;
        let record = serde_json::to_value(CacheEntry::at(key, payload, fetched_at))
            .map_err(CacheError::Serialize)?;
        let mut entries = self.entries.lock().map_err(|_| CacheError::Poisoned)?;
        entries.insert(key.to_string(), record);
        Ok(())
    }
}
