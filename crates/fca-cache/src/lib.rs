//! FCA Cache - Keyed durable cache for in-progress stage data
//!
//! Holds one JSON-serializable snapshot per `{purpose}_{candidateId}` key on
//! top of a pluggable client-side backend:
//! - Tolerates a completely absent backend (reads return defaults, writes
//!   become no-ops)
//! - Tracks a last-seen raw fingerprint per key so pollers can detect
//!   external mutation without redundant re-reads
//! - Surfaces same-context changes via a ~100ms polling watcher and
//!   cross-context changes via the backend's native notification channel
//!
//! # Example
//!
//! ```rust,ignore
//! use fca_cache::{DurableCache, MemoryBackend, scoped_key};
//! use std::sync::Arc;
//!
//! let cache = DurableCache::new(Arc::new(MemoryBackend::new()));
//! let key = scoped_key("revocation_form", "cand-1");
//! cache.write(&key, Some(&form));
//! let form: Option<RevocationForm> = cache.read(&key);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod backend;
pub mod cache;
pub mod watch;

pub use backend::{CacheBackend, MemoryBackend};
pub use cache::{scoped_key, DurableCache};
pub use watch::{CacheWatcher, KeyObserver};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
