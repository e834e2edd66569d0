//! Application state for the statistics dashboard.
//!
//! Each role has its own panel. A panel is hydrated from the cache when it is
//! first shown, then revalidated by a background task that reports back over
//! an mpsc channel drained once per frame.

use std::collections::HashMap;

use anyhow::Result;
use chrono::{DateTime, Utc};
use edustats_core::cache::{CacheEntry, CacheError, CacheStore, FileStore, MemoryStore};
use edustats_core::{
    ApiClient, Config, RefreshError, Refreshed, Revalidator, Role, SessionContext, StatsView,
    ViewState,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Buffer size for the background refresh channel.
const CHANNEL_BUFFER_SIZE: usize = 16;

/// Where cached statistics live for this run.
pub enum StoreBackend {
    File(FileStore),
    Memory(MemoryStore),
}

impl CacheStore for StoreBackend {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        match self {
            StoreBackend::File(store) => store.get(key),
            StoreBackend::Memory(store) => store.get(key),
        }
    }

    fn put_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        match self {
            StoreBackend::File(store) => store.put_at(key, payload, fetched_at),
            StoreBackend::Memory(store) => store.put_at(key, payload, fetched_at),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Normal,
    ShowingHelp,
    Quitting,
}

/// Messages from background refresh tasks.
#[derive(Debug)]
pub(crate) enum RefreshResult {
    Updated(Role, CacheEntry<Value>),
    Failed(Role, String),
}

pub struct App {
    pub config: Config,
    pub context: SessionContext,
    pub state: AppState,
    pub status_message: Option<String>,

    api: ApiClient,
    revalidator: Revalidator<StoreBackend>,
    views: HashMap<Role, StatsView>,

    refresh_rx: mpsc::Receiver<RefreshResult>,
    refresh_tx: mpsc::Sender<RefreshResult>,
}

impl App {
    pub fn new(config: Config, store: StoreBackend) -> Result<Self> {
        let context = config.session_context();
        let api = ApiClient::new(config.api_base_url.clone())?;
        let (refresh_tx, refresh_rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        debug!(base_url = api.base_url(), role = %context.role, "App created");

        Ok(Self {
            config,
            context,
            state: AppState::Normal,
            status_message: None,
            api,
            revalidator: Revalidator::new(store),
            views: HashMap::new(),
            refresh_rx,
            refresh_tx,
        })
    }

    pub fn role(&self) -> Role {
        self.context.role
    }

    pub fn view(&self, role: Role) -> Option<&StatsView> {
        self.views.get(&role)
    }

    pub fn current_view(&self) -> Option<&StatsView> {
        self.view(self.role())
    }

    /// Whether the shown snapshot is older than the configured threshold.
    pub fn is_current_stale(&self) -> bool {
        self.current_view()
            .and_then(|v| v.snapshot())
            .map(|s| Utc::now() - s.fetched_at > self.config.stale_after())
            .unwrap_or(false)
    }

    /// Seed a role's panel from the cache. Read failures count as "nothing cached".
    pub fn hydrate(&mut self, role: Role) {
        let cached: Option<CacheEntry<Value>> =
            self.revalidator.store().get_or_absent(role.resource().key);
        let hit = cached.is_some();
        let view = self.views.entry(role).or_default();
        view.apply_cached(cached);
        debug!(%role, hit, "Hydrated from cache");
    }

    /// Show a role's panel, hydrating and revalidating it the first time.
    pub fn select_role(&mut self, role: Role) {
        self.context = self.context.with_role(role);
        if self.is_unvisited(role) {
            self.hydrate(role);
            self.spawn_refresh(role);
        }
    }

    fn is_unvisited(&self, role: Role) -> bool {
        self.views
            .get(&role)
            .map_or(true, |v| v.state() == ViewState::Idle)
    }

    pub fn refresh_current(&mut self) {
        self.spawn_refresh(self.role());
    }

    /// Revalidate a role's statistics in the background.
    pub fn spawn_refresh(&mut self, role: Role) {
        self.views.entry(role).or_default().begin_refresh();
        self.status_message = Some(format!("Refreshing {} statistics...", role));

        let api = self.api.with_context(&self.context.with_role(role));
        let revalidator = self.revalidator.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let result = revalidator
                .refresh(role.resource().key, || api.fetch_statistics(role))
                .await;
            if let Err(e) = tx.send(refresh_message(role, result)).await {
                error!(error = %e, "Failed to send refresh result - channel closed");
            }
        });
    }

    /// Revalidate every dashboard concurrently in one background task.
    pub fn refresh_all(&mut self) {
        for role in Role::ALL {
            if self.is_unvisited(role) {
                self.hydrate(role);
            }
            self.views.entry(role).or_default().begin_refresh();
        }
        self.status_message = Some("Refreshing all statistics...".to_string());

        let api = self.api.with_context(&self.context);
        let revalidator = self.revalidator.clone();
        let tx = self.refresh_tx.clone();

        tokio::spawn(async move {
            let resources = Role::ALL.map(|role| role.resource());
            let results = revalidator
                .refresh_all(&resources, |resource| api.fetch_resource(resource))
                .await;
            for (role, (_, result)) in Role::ALL.into_iter().zip(results) {
                if let Err(e) = tx.send(refresh_message(role, result)).await {
                    error!(error = %e, "Failed to send refresh result - channel closed");
                    break;
                }
            }
        });
    }

    /// Apply every refresh result that has arrived since the last frame.
    pub fn check_background_tasks(&mut self) {
        while let Ok(result) = self.refresh_rx.try_recv() {
            self.process_refresh_result(result);
        }
    }

    pub(crate) fn process_refresh_result(&mut self, result: RefreshResult) {
        match result {
            RefreshResult::Updated(role, entry) => {
                info!(%role, "Statistics updated");
                self.views.entry(role).or_default().apply_refresh(Ok(entry));
                self.status_message = None;
            }
            RefreshResult::Failed(role, message) => {
                self.views.entry(role).or_default().apply_refresh(Err(message));
                self.status_message = Some(format!("{} refresh failed, showing last known values", role));
            }
        }
    }

    pub fn toggle_help(&mut self) {
        self.state = match self.state {
            AppState::ShowingHelp => AppState::Normal,
            _ => AppState::ShowingHelp,
        };
    }

    pub fn quit(&mut self) {
        self.state = AppState::Quitting;
    }
}

fn refresh_message(role: Role, result: Result<Refreshed<Value>, RefreshError>) -> RefreshResult {
    match result {
        Ok(refreshed) => RefreshResult::Updated(role, refreshed.entry),
        Err(e) => RefreshResult::Failed(role, e.to_string()),
    }
}
