//! Per-agent persistent key-value storage.
//!
//! Each agent owns one JSON file, `{work_dir}/agents/{name}/storage.json`,
//! holding a flat string-keyed map of JSON values. Every write is flushed to
//! disk before returning. There is no eviction and no sharing across agents.
//!
//! All I/O is synchronous and short; handlers call it inline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppError;

const STORAGE_FILENAME: &str = "storage.json";

pub struct KvStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl std::fmt::Debug for KvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl KvStore {
    /// Open (or create) the store for agent `name` under `work_dir`.
    pub fn open(work_dir: &Path, name: &str) -> Result<Self, AppError> {
        let dir = work_dir.join("agents").join(name);
        fs::create_dir_all(&dir)
            .map_err(|e| AppError::Storage(format!("cannot create {}: {e}", dir.display())))?;
        Self::open_file(dir.join(STORAGE_FILENAME))
    }

    /// Open a store backed by an explicit file path.
    pub fn open_file(path: PathBuf) -> Result<Self, AppError> {
        let values = if path.exists() {
            let raw = fs::read_to_string(&path)
                .map_err(|e| AppError::Storage(format!("cannot read {}: {e}", path.display())))?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|e| {
                    AppError::Storage(format!("{} is not a JSON object: {e}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = values.len(), "storage opened");
        Ok(Self { path, values: Mutex::new(values) })
    }

    /// In-memory store that never touches disk (tests, ephemeral agents).
    pub fn in_memory() -> Self {
        Self { path: PathBuf::new(), values: Mutex::new(BTreeMap::new()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    /// Typed read. A value that does not decode as `T` is logged and treated as absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(key, error = %e, "stored value has unexpected shape");
                None
            }
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn set(&self, key: &str, value: Value) -> Result<(), AppError> {
        let mut values = self.lock();
        values.insert(key.to_string(), value);
        self.flush(&values)
    }

    pub fn set_as<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let value = serde_json::to_value(value)
            .map_err(|e| AppError::Storage(format!("cannot encode value for '{key}': {e}")))?;
        self.set(key, value)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Value>> {
        // A poisoned lock only means another handler panicked mid-write; the
        // map itself is still a valid map.
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn flush(&self, values: &BTreeMap<String, Value>) -> Result<(), AppError> {
        if self.path.as_os_str().is_empty() {
            return Ok(());
        }
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| AppError::Storage(format!("cannot encode storage: {e}")))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|e| AppError::Storage(format!("cannot write {}: {e}", tmp.display())))?;
        fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::Storage(format!("cannot replace {}: {e}", self.path.display())))
    }
}
