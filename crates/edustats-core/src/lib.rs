//! Core library for edustats.
//!
//! Statistics dashboards read an aggregate from the platform API. To show
//! something immediately, the last fetched aggregate is kept in a local cache:
//!
//! 1. [`view::StatsView`] is seeded from the cache (if anything is there)
//! 2. [`revalidate::Revalidator`] fetches a fresh value and overwrites the cache
//! 3. on failure the cached value stays on screen
//!
//! Failures are returned as explicit results; the `*_or_absent`/`*_or_log`
//! helpers on [`cache::CacheStore`] exist for callers that prefer to ignore them.

pub mod api;
pub mod cache;
pub mod config;
pub mod revalidate;
pub mod session;
pub mod utils;
pub mod view;

pub use api::{ApiClient, ApiError};
pub use cache::{CacheEntry, CacheError, CacheStore, FileStore, MemoryStore};
pub use config::Config;
pub use revalidate::{RefreshError, Refreshed, Revalidator};
pub use session::{Resource, Role, SessionContext};
pub use view::{StatsView, ViewState};

/// Database name of the persistent statistics cache.
pub const DB_NAME: &str = "edustats";

/// The single object store inside [`DB_NAME`].
pub const STORE_NAME: &str = "statistics";
