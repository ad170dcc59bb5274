//! Cache backend seam
//!
//! The durable cache stores raw JSON strings in a key-value backend provided
//! by the host environment. The backend also exposes a native change channel
//! so consumers in other execution contexts are notified without polling.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt::Debug;
use tokio::sync::broadcast;

/// Raw key-value seam over the host's persistent store.
///
/// Values are opaque JSON strings; (de)serialization is the cache's job.
pub trait CacheBackend: Debug + Send + Sync {
    /// Fetch the raw value for `key`, if present.
    fn get(&self, key: &str) -> Option<String>;

    /// Store the raw value for `key`.
    fn set(&self, key: &str, value: &str);

    /// Delete `key`.
    fn remove(&self, key: &str);

    /// Subscribe to native change notifications.
    ///
    /// Each message is the key that changed in another context. Backends
    /// without a notification channel return `None`; the polling watcher
    /// still covers them.
    fn subscribe(&self) -> Option<broadcast::Receiver<String>>;
}

/// In-memory backend with a broadcast change channel.
///
/// Reference implementation used in tests and non-persistent contexts.
#[derive(Debug)]
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, String>>,
    changes: broadcast::Sender<String>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(64);
        Self {
            entries: RwLock::new(HashMap::new()),
            changes,
        }
    }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries.write().insert(key.to_string(), value.to_string());
        // No receivers is fine: nobody is listening yet.
        let _ = self.changes.send(key.to_string());
    }

    fn remove(&self, key: &str) {
        self.entries.write().remove(key);
        let _ = self.changes.send(key.to_string());
    }

    fn subscribe(&self) -> Option<broadcast::Receiver<String>> {
        Some(self.changes.subscribe())
    }
}
