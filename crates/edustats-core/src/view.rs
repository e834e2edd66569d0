//! Display state for one statistics panel.
//!
//! The view shows whatever it has: the cached snapshot first, then the fetched
//! one. It never waits on the network and never validates the payload shape.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::api::ApiError;
use crate::cache::{format_age, CacheEntry, CacheStore};
use crate::revalidate::{RefreshError, Revalidator};
use crate::utils::{format_value, humanize_key};

/// Informal panel states, used for the status bar only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewState {
    Idle,
    CacheHydrated,
    Revalidating,
    Updated,
    Stale,
}

impl ViewState {
    pub fn label(&self) -> &'static str {
        match self {
            ViewState::Idle => "idle",
            ViewState::CacheHydrated => "cached",
            ViewState::Revalidating => "refreshing",
            ViewState::Updated => "live",
            ViewState::Stale => "stale",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotSource {
    Cache,
    Network,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplaySnapshot {
    pub payload: Value,
    pub fetched_at: DateTime<Utc>,
    pub source: SnapshotSource,
}

/// One rendered line of a statistics table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct StatsView {
    snapshot: Option<DisplaySnapshot>,
    state: ViewState,
    loading: bool,
    last_error: Option<String>,
}

impl Default for StatsView {
    fn default() -> Self {
        Self::new()
    }
}

impl StatsView {
    pub fn new() -> Self {
        Self {
            snapshot: None,
            state: ViewState::Idle,
            loading: true,
            last_error: None,
        }
    }

    pub fn snapshot(&self) -> Option<&DisplaySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn payload(&self) -> Option<&Value> {
        self.snapshot.as_ref().map(|s| &s.payload)
    }

    pub fn state(&self) -> ViewState {
        self.state
    }

    /// True until the first value shows up or the first refresh settles.
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn age_display(&self) -> Option<String> {
        self.snapshot
            .as_ref()
            .map(|s| format_age((Utc::now() - s.fetched_at).num_minutes()))
    }

    /// Take a value unless it is older than what is already shown.
    fn offer(&mut self, entry: CacheEntry<Value>, source: SnapshotSource) -> bool {
        let newer = self
            .snapshot
            .as_ref()
            .map_or(true, |current| entry.fetched_at >= current.fetched_at);
        if newer {
            self.snapshot = Some(DisplaySnapshot {
                payload: entry.payload,
                fetched_at: entry.fetched_at,
                source,
            });
            self.loading = false;
        }
        newer
    }

    /// Apply the result of the cache read. Returns whether the display changed.
    pub fn apply_cached(&mut self, entry: Option<CacheEntry<Value>>) -> bool {
        let Some(entry) = entry else {
            return false;
        };
        let applied = self.offer(entry, SnapshotSource::Cache);
        if applied && self.state == ViewState::Idle {
            self.state = ViewState::CacheHydrated;
        }
        applied
    }

    pub fn begin_refresh(&mut self) {
        self.state = ViewState::Revalidating;
    }

    /// Apply the outcome of a revalidation. A failure keeps the current
    /// snapshot. Returns whether the display changed.
    pub fn apply_refresh(&mut self, result: Result<CacheEntry<Value>, String>) -> bool {
        self.loading = false;
        match result {
            Ok(entry) => {
                self.last_error = None;
                let applied = self.offer(entry, SnapshotSource::Network);
                // The state describes the snapshot on screen, not the rejected value
                self.state = match self.snapshot.as_ref().map(|s| s.source) {
                    Some(SnapshotSource::Network) => ViewState::Updated,
                    Some(SnapshotSource::Cache) => ViewState::CacheHydrated,
                    None => ViewState::Idle,
                };
                applied
            }
            Err(message) => {
                self.last_error = Some(message);
                self.state = ViewState::Stale;
                false
            }
        }
    }

    /// Hydrate from the cache, then revalidate and apply the outcome.
    /// Cache problems read as "nothing cached"; the refresh outcome is
    /// returned so the caller can decide whether to surface it.
    pub async fn mount<S, F, Fut>(
        &mut self,
        revalidator: &Revalidator<S>,
        key: &str,
        fetch: F,
    ) -> Result<(), RefreshError>
    where
        S: CacheStore,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, ApiError>>,
    {
        self.apply_cached(revalidator.store().get_or_absent(key));
        self.begin_refresh();
        match revalidator.refresh(key, fetch).await {
            Ok(refreshed) => {
                self.apply_refresh(Ok(refreshed.entry));
                Ok(())
            }
            Err(e) => {
                self.apply_refresh(Err(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn rows(&self) -> Vec<StatRow> {
        self.payload().map(flatten_rows).unwrap_or_default()
    }
}

/// Flatten a payload into table rows. Objects become one row per field;
/// anything else becomes a single "Value" row.
pub fn flatten_rows(payload: &Value) -> Vec<StatRow> {
    match payload {
        Value::Object(fields) => fields
            .iter()
            .map(|(key, value)| StatRow {
                label: humanize_key(key),
                value: format_value(value),
            })
            .collect(),
        other => vec![StatRow {
            label: "Value".to_string(),
            value: format_value(other),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use chrono::Duration;
    use serde_json::json;

    fn entry_at(payload: Value, minutes_ago: i64) -> CacheEntry<Value> {
        CacheEntry::at("k", payload, Utc::now() - Duration::minutes(minutes_ago))
    }

    #[test]
    fn test_new_view_is_idle_and_loading() {
        let view = StatsView::new();
        assert_eq!(view.state(), ViewState::Idle);
        assert!(view.is_loading());
        assert!(view.rows().is_empty());
        assert!(view.age_display().is_none());
    }

    #[test]
    fn test_cache_hit_hydrates() {
        let mut view = StatsView::new();
        assert!(view.apply_cached(Some(entry_at(json!({"totalUsers": 10}), 5))));
        assert_eq!(view.state(), ViewState::CacheHydrated);
        assert!(!view.is_loading());
        assert_eq!(view.snapshot().unwrap().source, SnapshotSource::Cache);
        assert_eq!(view.age_display().as_deref(), Some("5m ago"));
    }

    #[test]
    fn test_cache_miss_changes_nothing() {
        let mut view = StatsView::new();
        assert!(!view.apply_cached(None));
        assert_eq!(view.state(), ViewState::Idle);
        assert!(view.is_loading());
    }

    #[test]
    fn test_late_older_cache_read_does_not_roll_back() {
        let mut view = StatsView::new();
        view.begin_refresh();
        view.apply_refresh(Ok(entry_at(json!({"totalUsers": 42}), 0)));

        // The cache read resolves after the network response
        assert!(!view.apply_cached(Some(entry_at(json!({"totalUsers": 10}), 30))));
        assert_eq!(view.payload(), Some(&json!({"totalUsers": 42})));
        assert_eq!(view.state(), ViewState::Updated);
    }

    #[test]
    fn test_older_refresh_result_keeps_cached_state() {
        let mut view = StatsView::new();
        view.apply_cached(Some(entry_at(json!({"totalUsers": 10}), 1)));
        view.begin_refresh();

        assert!(!view.apply_refresh(Ok(entry_at(json!({"totalUsers": 9}), 30))));
        assert_eq!(view.payload(), Some(&json!({"totalUsers": 10})));
        assert_eq!(view.state(), ViewState::CacheHydrated);
    }

    #[test]
    fn test_failed_refresh_keeps_snapshot() {
        let mut view = StatsView::new();
        view.apply_cached(Some(entry_at(json!({"totalUsers": 10}), 1)));
        view.begin_refresh();
        assert!(!view.apply_refresh(Err("Fetch failed for k".to_string())));

        assert_eq!(view.state(), ViewState::Stale);
        assert_eq!(view.payload(), Some(&json!({"totalUsers": 10})));
        assert_eq!(view.last_error(), Some("Fetch failed for k"));
    }

    #[test]
    fn test_failed_refresh_without_cache_stops_loading() {
        let mut view = StatsView::new();
        view.begin_refresh();
        view.apply_refresh(Err("boom".to_string()));
        assert!(!view.is_loading());
        assert!(view.snapshot().is_none());
    }

    #[test]
    fn test_rows_render_partial_payloads() {
        let mut view = StatsView::new();
        view.apply_cached(Some(entry_at(
            json!({"totalUsers": 1200, "totalOrders": null, "teachers": [1, 2]}),
            0,
        )));

        let rows = view.rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.contains(&StatRow { label: "Total Users".into(), value: "1,200".into() }));
        assert!(rows.contains(&StatRow { label: "Total Orders".into(), value: "—".into() }));
        assert!(rows.contains(&StatRow { label: "Teachers".into(), value: "2 items".into() }));
    }

    #[test]
    fn test_non_object_payload_is_single_row() {
        let rows = flatten_rows(&json!(7));
        assert_eq!(rows, vec![StatRow { label: "Value".into(), value: "7".into() }]);
    }

    #[tokio::test]
    async fn test_mount_with_empty_cache_shows_fetched_value() {
        let reval = Revalidator::new(MemoryStore::new());
        let mut view = StatsView::new();

        view.mount(&reval, "admin_statistics", || async { Ok(json!({"totalUsers": 42})) })
            .await
            .unwrap();

        assert_eq!(view.state(), ViewState::Updated);
        assert_eq!(view.rows(), vec![StatRow { label: "Total Users".into(), value: "42".into() }]);
        let cached = reval.hydrate::<Value>("admin_statistics").unwrap().unwrap();
        assert_eq!(cached.payload, json!({"totalUsers": 42}));
    }

    #[tokio::test]
    async fn test_mount_with_failing_network_keeps_cached_value() {
        let reval = Revalidator::new(MemoryStore::new());
        reval.store().put("admin_statistics", &json!({"totalUsers": 10})).unwrap();
        let mut view = StatsView::new();

        let result = view
            .mount(&reval, "admin_statistics", || async {
                Err(ApiError::ServerError("unavailable".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(view.state(), ViewState::Stale);
        assert_eq!(view.rows(), vec![StatRow { label: "Total Users".into(), value: "10".into() }]);
        let cached = reval.hydrate::<Value>("admin_statistics").unwrap().unwrap();
        assert_eq!(cached.payload, json!({"totalUsers": 10}));
    }
}
