//! Revalidation: fetch a fresh value and overwrite the cache on success.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cache::{CacheEntry, CacheError, CacheStore};
use crate::session::Resource;

/// Every remote failure collapses into this one condition; the cause stays
/// available as the error source.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error("Fetch failed for {key}")]
    FetchFailed {
        key: String,
        #[source]
        source: ApiError,
    },
}

impl RefreshError {
    pub fn key(&self) -> &str {
        match self {
            RefreshError::FetchFailed { key, .. } => key,
        }
    }
}

/// A successful fetch. `write_error` is set when the value could not be cached;
/// the fetched value is still good to display.
#[derive(Debug)]
pub struct Refreshed<T> {
    pub entry: CacheEntry<T>,
    pub write_error: Option<CacheError>,
}

pub struct Revalidator<S> {
    store: Arc<S>,
}

impl<S> Clone for Revalidator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: CacheStore> Revalidator<S> {
    pub fn new(store: S) -> Self {
        Self::from_shared(Arc::new(store))
    }

    pub fn from_shared(store: Arc<S>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Last cached value for `key`, if any.
    pub fn hydrate<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        self.store.get(key)
    }

    /// Issue exactly one read through `fetch`. On success the value is written
    /// to the cache and returned; on failure the cache is left untouched.
    pub async fn refresh<T, F, Fut>(&self, key: &str, fetch: F) -> Result<Refreshed<T>, RefreshError>
    where
        T: Serialize,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        debug!(key, "Revalidating");

        let payload = fetch().await.map_err(|source| {
            warn!(key, error = %source, "Revalidation fetch failed, keeping cached value");
            RefreshError::FetchFailed {
                key: key.to_string(),
                source,
            }
        })?;

        // Stamped at resolution time, so the latest resolver owns the entry.
        let entry = CacheEntry::new(key, payload);
        let write_error = self.store.put_at(key, &entry.payload, entry.fetched_at).err();
        match write_error {
            Some(ref e) => warn!(key, error = %e, "Failed to cache refreshed value"),
            None => info!(key, "Cache revalidated"),
        }

        Ok(Refreshed { entry, write_error })
    }

    /// Refresh several resources concurrently. Results come back in input order.
    pub async fn refresh_all<T, F, Fut>(
        &self,
        resources: &[Resource],
        fetch: F,
    ) -> Vec<(Resource, Result<Refreshed<T>, RefreshError>)>
    where
        T: Serialize,
        F: Fn(Resource) -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let refreshes = resources.iter().map(|&resource| {
            let pending = fetch(resource);
            async move { (resource, self.refresh(resource.key, || pending).await) }
        });
        join_all(refreshes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::session::Role;
    use serde_json::{json, Value};
    use tokio::sync::oneshot;

    fn server_down() -> ApiError {
        ApiError::ServerError("down".to_string())
    }

    #[tokio::test]
    async fn test_refresh_stores_and_returns_payload() {
        let reval = Revalidator::new(MemoryStore::new());

        let refreshed = reval
            .refresh("admin_statistics", || async { Ok(json!({"totalUsers": 42})) })
            .await
            .unwrap();

        assert_eq!(refreshed.entry.payload, json!({"totalUsers": 42}));
        assert!(refreshed.write_error.is_none());
        let cached = reval.hydrate::<Value>("admin_statistics").unwrap().unwrap();
        assert_eq!(cached.payload, json!({"totalUsers": 42}));
        assert_eq!(cached.fetched_at, refreshed.entry.fetched_at);
    }

    #[tokio::test]
    async fn test_failed_refresh_leaves_cache_unchanged() {
        let reval = Revalidator::new(MemoryStore::new());
        reval.store().put("k", &json!({"totalUsers": 10})).unwrap();
        let before = reval.hydrate::<Value>("k").unwrap().unwrap();

        let err = reval
            .refresh::<Value, _, _>("k", || async { Err(server_down()) })
            .await
            .unwrap_err();

        assert!(matches!(err, RefreshError::FetchFailed { .. }));
        assert_eq!(err.key(), "k");
        assert_eq!(reval.hydrate::<Value>("k").unwrap().unwrap(), before);
    }

    #[tokio::test]
    async fn test_failed_refresh_on_empty_cache_stays_empty() {
        let reval = Revalidator::new(MemoryStore::new());
        let _ = reval
            .refresh::<Value, _, _>("k", || async { Err(ApiError::Unauthorized) })
            .await;
        assert!(reval.store().is_empty());
    }

    #[tokio::test]
    async fn test_write_failure_does_not_fail_refresh() {
        let reval = Revalidator::new(MemoryStore::new());

        let refreshed = reval
            .refresh("bad/key", || async { Ok(json!({"totalUsers": 5})) })
            .await
            .unwrap();

        assert_eq!(refreshed.entry.payload, json!({"totalUsers": 5}));
        assert!(matches!(refreshed.write_error, Some(CacheError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_out_of_order_resolution_last_resolved_wins() {
        let reval = Revalidator::new(MemoryStore::new());
        let (first_tx, first_rx) = oneshot::channel::<Value>();
        let (second_tx, second_rx) = oneshot::channel::<Value>();

        let r1 = reval.clone();
        let first = tokio::spawn(async move {
            r1.refresh("k", || async move { Ok(first_rx.await.unwrap()) }).await
        });
        let r2 = reval.clone();
        let second = tokio::spawn(async move {
            r2.refresh("k", || async move { Ok(second_rx.await.unwrap()) }).await
        });

        // The later-initiated refresh resolves first...
        second_tx.send(json!({"totalUsers": 2})).unwrap();
        second.await.unwrap().unwrap();
        // ...and the earlier one resolves last, so its payload is what remains.
        first_tx.send(json!({"totalUsers": 1})).unwrap();
        first.await.unwrap().unwrap();

        let cached = reval.hydrate::<Value>("k").unwrap().unwrap();
        assert_eq!(cached.payload, json!({"totalUsers": 1}));
    }

    #[tokio::test]
    async fn test_refresh_all_reports_each_resource() {
        let reval = Revalidator::new(MemoryStore::new());
        let resources = [Role::Admin.resource(), Role::Student.resource()];

        let results = reval
            .refresh_all(&resources, |resource| async move {
                if resource.key == "admin_statistics" {
                    Ok(json!({"totalUsers": 42}))
                } else {
                    Err(server_down())
                }
            })
            .await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, Role::Admin.resource());
        assert!(results[0].1.is_ok());
        assert!(results[1].1.is_err());
        assert!(reval.hydrate::<Value>("admin_statistics").unwrap().is_some());
        assert!(reval.hydrate::<Value>("student_statistics").unwrap().is_none());
    }
}
