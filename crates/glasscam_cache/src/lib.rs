//! Bounded in-memory byte cache with optional TTL and LRU eviction.
//!
//! Eviction is by least-recently-ACCESSED entry, not insertion order.
//! Expired entries are treated as absent and evicted lazily on lookup.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::debug;

struct CacheEntry {
    data: Vec<u8>,
    expires_at: Option<Instant>,
    last_accessed: Instant,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|t| now >= t)
    }
}

pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl ResponseCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Return the cached bytes if present and not expired. A hit refreshes
    /// the entry's last-accessed time; an expired entry is removed.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                None
            }
            Some(entry) => {
                entry.last_accessed = now;
                Some(entry.data.clone())
            }
            None => None,
        }
    }

    /// Insert or overwrite. When the cache is at capacity and `key` is new,
    /// the single least-recently-accessed entry is evicted first.
    pub fn put(&self, key: &str, data: Vec<u8>, ttl_millis: Option<u64>) {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        if !entries.contains_key(key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                debug!(target: "glasscam::cache", evicted = %oldest, "LRU eviction");
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                expires_at: ttl_millis.map(|ms| now + Duration::from_millis(ms)),
                last_accessed: now,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// Live entry count. Expired-but-untouched entries still count until a
    /// lookup evicts them.
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
