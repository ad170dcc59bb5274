//! Typed cache over a raw string backend
//!
//! Stores one JSON snapshot per key and keeps an in-memory fingerprint of the
//! last raw value seen per key. The fingerprint map is what the polling
//! watcher compares against, so a write from this cache never re-triggers its
//! own observers.

use crate::backend::CacheBackend;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

/// Build the canonical cache key for a purpose scoped to one candidate.
#[inline]
#[must_use]
pub fn scoped_key(purpose: &str, candidate_id: &str) -> String {
    format!("{purpose}_{candidate_id}")
}

/// Keyed durable cache.
///
/// `write(key, None)` deletes. A cache constructed with [`DurableCache::detached`]
/// has no backend at all: reads return `None`/defaults and writes are no-ops,
/// which is the contract for non-browser execution contexts.
#[derive(Debug, Clone)]
pub struct DurableCache {
    backend: Option<Arc<dyn CacheBackend>>,
    last_seen: Arc<DashMap<String, Option<String>>>,
}

impl DurableCache {
    #[must_use]
    pub fn new(backend: Arc<dyn CacheBackend>) -> Self {
        Self {
            backend: Some(backend),
            last_seen: Arc::new(DashMap::new()),
        }
    }

    /// Cache with no backing store.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            backend: None,
            last_seen: Arc::new(DashMap::new()),
        }
    }

    /// Whether a backing store is attached.
    #[inline]
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.backend.is_some()
    }

    /// Read and deserialize the value under `key`.
    ///
    /// Returns `None` when the backend is absent, the key is missing, or the
    /// stored payload no longer deserializes (logged and treated as a miss).
    #[must_use]
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.raw(key)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key, %err, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Read with a fallback default.
    #[must_use]
    pub fn read_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.read(key).unwrap_or(default)
    }

    /// Serialize and store `value` under `key`; `None` deletes the key.
    ///
    /// Serialization failures are logged and leave the store untouched.
    pub fn write<T: Serialize>(&self, key: &str, value: Option<&T>) {
        let Some(backend) = &self.backend else {
            return;
        };
        match value {
            Some(value) => match serde_json::to_string(value) {
                Ok(raw) => {
                    backend.set(key, &raw);
                    self.last_seen.insert(key.to_string(), Some(raw));
                }
                Err(err) => {
                    tracing::warn!(key, %err, "failed to serialize cache value");
                }
            },
            None => {
                backend.remove(key);
                self.last_seen.insert(key.to_string(), None);
            }
        }
    }

    /// Delete `key`.
    pub fn remove(&self, key: &str) {
        let Some(backend) = &self.backend else {
            return;
        };
        backend.remove(key);
        self.last_seen.insert(key.to_string(), None);
    }

    /// Raw value under `key`, recording it as last-seen.
    pub(crate) fn raw(&self, key: &str) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let raw = backend.get(key);
        self.last_seen.insert(key.to_string(), raw.clone());
        raw
    }

    /// Compare the backend's current raw value against the last-seen
    /// fingerprint; on difference, update the fingerprint and return the new
    /// raw value wrapped in `Some`.
    ///
    /// Used by the polling watcher. Returns `None` when nothing changed or no
    /// backend is attached.
    pub(crate) fn poll_raw(&self, key: &str) -> Option<Option<String>> {
        let backend = self.backend.as_ref()?;
        let current = backend.get(key);
        let mut entry = self.last_seen.entry(key.to_string()).or_insert(None);
        let changed = match entry.value() {
            Some(last) => current.as_deref() != Some(last.as_str()),
            None => current.is_some(),
        };
        if changed {
            *entry.value_mut() = current.clone();
            return Some(current);
        }
        None
    }

    pub(crate) fn backend(&self) -> Option<&Arc<dyn CacheBackend>> {
        self.backend.as_ref()
    }
}
