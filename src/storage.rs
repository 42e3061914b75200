//! Durable local key/value storage.
//!
//! A flat string-keyed store shared by the search log and the navigation
//! machine under disjoint key namespaces. All access is synchronous; the
//! file-backed implementation rewrites its JSON document on every mutation,
//! the same way the app config is persisted.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Mutex;

use log::warn;

/// Every durable key the client owns. Legacy keys are read for the one-time
/// migration and purged by an explicit log clear, never written otherwise.
pub mod keys {
    pub const ONBOARDING_COMPLETE: &str = "sage_onboarding_complete";
    pub const HELLO_SEEN: &str = "sage_seen_hello";
    pub const USER_NAME: &str = "sage_user_name";
    /// Cached root list from older builds. The backend owns the root set, so
    /// this key is deleted unconditionally at startup.
    pub const USER_ROUTES: &str = "sage_user_routes";
    pub const INDEXING_LOGS_QUERY: &str = "sage_indexing_logs_query";
    pub const INDEXING_LOGS_RESULTS: &str = "sage_indexing_logs_results";
    // Older builds persisted the last search directly under these keys.
    pub const LEGACY_SEARCH_QUERY: &str = "sage_last_search_query";
    pub const LEGACY_SEARCH_RESULTS: &str = "sage_last_search_results";
}

/// Flat string key/value store. Writes are best-effort: a failed flush is
/// logged and the in-memory view stays current, matching how the rest of the
/// client degrades on storage trouble.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn remove(&self, key: &str);
}

/// Storage backed by a single pretty-printed JSON object on disk.
///
/// A missing or malformed file is treated as empty rather than an error, so
/// corruption degrades to first-run defaults.
pub struct JsonFileStorage {
    path: PathBuf,
    map: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStorage {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let map = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<BTreeMap<String, String>>(&content) {
                Ok(map) => map,
                Err(e) => {
                    warn!("discarding malformed state file {:?}: {}", path, e);
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };
        Self {
            path,
            map: Mutex::new(map),
        }
    }

    fn flush(&self, map: &BTreeMap<String, String>) {
        let json = match serde_json::to_string_pretty(map) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize client state: {}", e);
                return;
            }
        };
        if let Some(parent) = self.path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("failed to persist client state to {:?}: {}", self.path, e);
        }
    }
}

impl Storage for JsonFileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.map.lock() {
            map.insert(key.to_string(), value.to_string());
            self.flush(&map);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.map.lock() {
            if map.remove(key).is_some() {
                self.flush(&map);
            }
        }
    }
}

/// In-memory storage for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    map: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.map.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut map) = self.map.lock() {
            map.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut map) = self.map.lock() {
            map.remove(key);
        }
    }
}
