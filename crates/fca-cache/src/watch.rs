//! Change observation for cache keys
//!
//! Multiple independent consumers in one execution context share cache keys
//! without an event bus: a spawned polling task compares each observed key's
//! raw value against the cache's last-seen fingerprint (~100ms cadence), and
//! a second task bridges the backend's native cross-context notifications so
//! those are observed without waiting for the next tick.

use crate::cache::DurableCache;
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default polling cadence: short enough to feel synchronous to a human.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type SubscriberMap = Arc<Mutex<HashMap<String, watch::Sender<Option<String>>>>>;

/// Watches cache keys for mutation by other consumers.
#[derive(Debug)]
pub struct CacheWatcher {
    cache: DurableCache,
    subscribers: SubscriberMap,
    poll_task: JoinHandle<()>,
    notify_task: Option<JoinHandle<()>>,
}

impl CacheWatcher {
    /// Spawn a watcher with the default ~100ms interval.
    #[must_use]
    pub fn spawn(cache: DurableCache) -> Self {
        Self::spawn_with_interval(cache, DEFAULT_POLL_INTERVAL)
    }

    /// Spawn a watcher with an explicit polling interval.
    #[must_use]
    pub fn spawn_with_interval(cache: DurableCache, interval: Duration) -> Self {
        let subscribers: SubscriberMap = Arc::new(Mutex::new(HashMap::new()));

        let poll_task = {
            let cache = cache.clone();
            let subscribers = Arc::clone(&subscribers);
            tokio::spawn(async move {
                let mut ticker = tokio::time::interval(interval);
                ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
                loop {
                    ticker.tick().await;
                    let keys: Vec<String> = subscribers.lock().keys().cloned().collect();
                    for key in keys {
                        publish_if_changed(&cache, &subscribers, &key);
                    }
                }
            })
        };

        let notify_task = cache
            .backend()
            .and_then(|backend| backend.subscribe())
            .map(|mut rx| {
                let cache = cache.clone();
                let subscribers = Arc::clone(&subscribers);
                tokio::spawn(async move {
                    loop {
                        match rx.recv().await {
                            Ok(key) => publish_if_changed(&cache, &subscribers, &key),
                            Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                                tracing::debug!(missed, "cache notifications lagged; poller will catch up");
                            }
                            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                        }
                    }
                })
            });

        Self {
            cache,
            subscribers,
            poll_task,
            notify_task,
        }
    }

    /// Observe a key. The observer starts at the key's current value.
    #[must_use]
    pub fn observe<T: DeserializeOwned>(&self, key: &str) -> KeyObserver<T> {
        let mut subs = self.subscribers.lock();
        let sender = subs.entry(key.to_string()).or_insert_with(|| {
            let (tx, _) = watch::channel(self.cache.raw(key));
            tx
        });
        KeyObserver {
            rx: sender.subscribe(),
            _marker: PhantomData,
        }
    }
}

impl Drop for CacheWatcher {
    fn drop(&mut self) {
        self.poll_task.abort();
        if let Some(task) = &self.notify_task {
            task.abort();
        }
    }
}

fn publish_if_changed(cache: &DurableCache, subscribers: &SubscriberMap, key: &str) {
    if let Some(raw) = cache.poll_raw(key) {
        if let Some(sender) = subscribers.lock().get(key) {
            sender.send_replace(raw);
        }
    }
}

/// One consumer's view of one cache key.
#[derive(Debug)]
pub struct KeyObserver<T> {
    rx: watch::Receiver<Option<String>>,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> KeyObserver<T> {
    /// Decode the most recently observed value.
    #[must_use]
    pub fn current(&self) -> Option<T> {
        decode(self.rx.borrow().as_deref())
    }

    /// Wait for the next observed change and decode it.
    ///
    /// Returns `None` once the watcher has been dropped.
    pub async fn changed(&mut self) -> Option<Option<T>> {
        self.rx.changed().await.ok()?;
        Some(decode(self.rx.borrow_and_update().as_deref()))
    }
}

fn decode<T: DeserializeOwned>(raw: Option<&str>) -> Option<T> {
    let raw = raw?;
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(%err, "observed cache value failed to decode");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CacheBackend, MemoryBackend};
    use crate::cache::scoped_key;

    const FAST_POLL: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn observer_sees_external_write() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = DurableCache::new(backend.clone());
        let watcher = CacheWatcher::spawn_with_interval(cache, FAST_POLL);
        let key = scoped_key("notes", "cand-1");

        let mut observer = watcher.observe::<String>(&key);
        assert_eq!(observer.current(), None);

        // A different consumer writes the same key directly.
        backend.set(&key, "\"call references\"");

        let seen = tokio::time::timeout(Duration::from_secs(1), observer.changed())
            .await
            .expect("change observed within interval")
            .expect("watcher alive");
        assert_eq!(seen, Some("call references".to_string()));
    }

    #[tokio::test]
    async fn competing_writers_converge_on_last_write() {
        let backend = Arc::new(MemoryBackend::new());
        let writer_a = DurableCache::new(backend.clone());
        let writer_b = DurableCache::new(backend.clone());
        let watcher =
            CacheWatcher::spawn_with_interval(DurableCache::new(backend.clone()), FAST_POLL);
        let key = scoped_key("notes", "cand-1");

        let mut first = watcher.observe::<String>(&key);
        let mut second = watcher.observe::<String>(&key);

        // Two consumers race within one polling interval; last writer wins.
        writer_a.write(&key, Some(&"from a".to_string()));
        writer_b.write(&key, Some(&"from b".to_string()));

        for observer in [&mut first, &mut second] {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
            loop {
                if observer.current().as_deref() == Some("from b") {
                    break;
                }
                assert!(tokio::time::Instant::now() < deadline, "observer did not converge");
                let _ = tokio::time::timeout(Duration::from_millis(50), observer.changed()).await;
            }
        }
    }

    #[tokio::test]
    async fn deletion_is_observed() {
        let backend = Arc::new(MemoryBackend::new());
        let cache = DurableCache::new(backend.clone());
        let key = scoped_key("notes", "cand-1");
        cache.write(&key, Some(&"draft".to_string()));

        let watcher = CacheWatcher::spawn_with_interval(DurableCache::new(backend.clone()), FAST_POLL);
        let mut observer = watcher.observe::<String>(&key);
        assert_eq!(observer.current(), Some("draft".to_string()));

        backend.remove(&key);
        let seen = tokio::time::timeout(Duration::from_secs(1), observer.changed())
            .await
            .expect("deletion observed")
            .expect("watcher alive");
        assert_eq!(seen, None);
    }
}
