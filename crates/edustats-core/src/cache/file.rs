use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::{debug, info};

use super::entry::CacheEntry;
use super::store::{validate_key, CacheError, CacheStore};

/// Version of the on-disk record layout. Bumping it discards existing entries.
pub const SCHEMA_VERSION: u32 = 1;

/// Marker file recording the schema version of an object store directory.
const META_FILE: &str = "meta.json";

/// Distinguishes temp files of concurrent writers within one process.
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Serialize, Deserialize)]
struct StoreMeta {
    version: u32,
}

/// Persistent store addressed by a database name and one object store,
/// laid out as `<root>/<db_name>/<store_name>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(root: &Path, db_name: &str, store_name: &str) -> Result<Self, CacheError> {
        Self::open_versioned(root, db_name, store_name, SCHEMA_VERSION)
    }

    pub fn open_versioned(
        root: &Path,
        db_name: &str,
        store_name: &str,
        version: u32,
    ) -> Result<Self, CacheError> {
        validate_key(db_name)?;
        validate_key(store_name)?;

        let dir = root.join(db_name).join(store_name);
        std::fs::create_dir_all(&dir)?;

        let store = Self { dir };
        store.ensure_schema(version)?;
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn ensure_schema(&self, version: u32) -> Result<(), CacheError> {
        let meta_path = self.dir.join(META_FILE);
        let found = match std::fs::read_to_string(&meta_path) {
            Ok(contents) => serde_json::from_str::<StoreMeta>(&contents)
                .ok()
                .map(|m| m.version),
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        if found == Some(version) {
            return Ok(());
        }

        let removed = self.remove_entries()?;
        if removed > 0 {
            info!(dir = ?self.dir, ?found, version, removed, "Cache schema changed, discarded entries");
        }

        let meta = serde_json::to_string_pretty(&StoreMeta { version })
            .map_err(CacheError::Serialize)?;
        write_atomic(&meta_path, &meta)?;
        Ok(())
    }

    fn remove_entries(&self) -> Result<usize, CacheError> {
        let mut removed = 0;
        for dir_entry in std::fs::read_dir(&self.dir)? {
            let path = dir_entry?.path();
            let is_meta = path.file_name().is_some_and(|n| n == META_FILE);
            let is_record = path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tmp");
            if is_record && !is_meta {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        Ok(removed)
    }
}

impl CacheStore for FileStore {
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CacheEntry<T>>, CacheError> {
        validate_key(key)?;
        let path = self.entry_path(key);

        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entry: CacheEntry<T> =
            serde_json::from_str(&contents).map_err(|source| CacheError::Corrupt {
                key: key.to_string(),
                source,
            })?;
        Ok(Some(entry))
    }

    fn put_at<T: Serialize>(
        &self,
        key: &str,
        payload: &T,
        fetched_at: DateTime<Utc>,
    ) -> Result<(), CacheError> {
        validate_key(key)?;
        let contents = serde_json::to_string_pretty(&CacheEntry::at(key, payload, fetched_at))
            .map_err(CacheError::Serialize)?;
        write_atomic(&self.entry_path(key), &contents)?;
        debug!(key, "Cache entry written");
        Ok(())
    }
}

/// Write to a private temp file, then rename over the target so readers only
/// ever see a whole record.
fn write_atomic(path: &Path, contents: &str) -> io::Result<()> {
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_extension(format!("json.{}-{}.tmp", std::process::id(), n));
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp);
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> FileStore {
        FileStore::open(tmp.path(), "edustats", "statistics").unwrap()
    }

    #[test]
    fn test_layout_uses_db_and_store_names() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        assert_eq!(store.dir(), tmp.path().join("edustats").join("statistics"));
        assert!(store.dir().join(META_FILE).exists());
    }

    #[test]
    fn test_put_then_get_round_trips() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.put("admin_statistics", &json!({"totalUsers": 42, "totalOrders": 7})).unwrap();

        let entry = store.get::<Value>("admin_statistics").unwrap().unwrap();
        assert_eq!(entry.payload, json!({"totalUsers": 42, "totalOrders": 7}));
    }

    #[test]
    fn test_last_write_wins() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.put("k", &json!({"totalUsers": 1})).unwrap();
        store.put("k", &json!({"totalUsers": 2})).unwrap();

        let entry = store.get::<Value>("k").unwrap().unwrap();
        assert_eq!(entry.payload, json!({"totalUsers": 2}));
    }

    #[test]
    fn test_unknown_key_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        assert!(store.get::<Value>("nothing_here").unwrap().is_none());
    }

    #[test]
    fn test_entries_survive_reopen() {
        let tmp = TempDir::new().unwrap();
        open(&tmp).put("k", &json!([1, 2, 3])).unwrap();

        let reopened = open(&tmp);
        let entry = reopened.get::<Value>("k").unwrap().unwrap();
        assert_eq!(entry.payload, json!([1, 2, 3]));
    }

    #[test]
    fn test_schema_change_discards_entries() {
        let tmp = TempDir::new().unwrap();
        let v1 = FileStore::open_versioned(tmp.path(), "edustats", "statistics", 1).unwrap();
        v1.put("k", &json!({"totalUsers": 10})).unwrap();

        let v2 = FileStore::open_versioned(tmp.path(), "edustats", "statistics", 2).unwrap();
        assert!(v2.get::<Value>("k").unwrap().is_none());

        let meta = std::fs::read_to_string(v2.dir().join(META_FILE)).unwrap();
        assert_eq!(serde_json::from_str::<StoreMeta>(&meta).unwrap().version, 2);
    }

    #[test]
    fn test_corrupt_file_is_error_but_silent_read_is_absent() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        std::fs::write(store.dir().join("broken.json"), "{ not json").unwrap();

        assert!(matches!(store.get::<Value>("broken"), Err(CacheError::Corrupt { .. })));
        assert!(store.get_or_absent::<Value>("broken").is_none());
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let tmp = TempDir::new().unwrap();
        let store = open(&tmp);
        store.put("k", &1).unwrap();
        store.put("k", &2).unwrap();

        let leftovers = std::fs::read_dir(store.dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[test]
    fn test_invalid_names_are_rejected() {
        let tmp = TempDir::new().unwrap();
        assert!(FileStore::open(tmp.path(), "../up", "statistics").is_err());
        let store = open(&tmp);
        assert!(matches!(store.put("a/b", &1), Err(CacheError::InvalidKey(_))));
    }
}
