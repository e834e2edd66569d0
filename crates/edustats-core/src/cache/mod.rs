//! Local cache for previously fetched statistics.
//!
//! Entries are keyed by string and carry the payload together with the time
//! it was fetched. Two backends implement [`CacheStore`]:
//! - [`FileStore`]: JSON files under `<cache_dir>/<db_name>/<store_name>/`
//! - [`MemoryStore`]: process-local map
//!
//! The store never evicts. An entry lives until it is overwritten or the
//! directory is cleared from outside.

pub mod entry;
pub mod file;
pub mod memory;
pub mod store;

pub use entry::{format_age, CacheEntry};
pub use file::{FileStore, SCHEMA_VERSION};
pub use memory::MemoryStore;
pub use store::{CacheError, CacheStore};
