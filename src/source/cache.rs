//! Output cache for saved forms

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// A saved PDF held in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPdf {
    pub file_name: String,
    pub data: Vec<u8>,
}

struct CacheInner {
    lru: LruCache<String, CachedPdf>,
    total_bytes: usize,
}

/// LRU cache of saved PDFs with an entry limit and a byte budget
pub struct CacheManager {
    inner: Mutex<CacheInner>,
    max_bytes: usize,
}

impl CacheManager {
    pub fn new(capacity: usize, max_bytes: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(CacheInner {
                lru: LruCache::new(capacity),
                total_bytes: 0,
            }),
            max_bytes,
        }
    }

    /// Store a saved PDF under a fresh key.
    ///
    /// Returns `None` when the document alone exceeds the byte budget.
    /// Older entries are evicted until the new one fits.
    pub fn insert(&self, file_name: String, data: Vec<u8>) -> Option<String> {
        let size = data.len();
        if size > self.max_bytes {
            tracing::warn!(size, max_bytes = self.max_bytes, "output too large to cache");
            return None;
        }

        let mut inner = self.inner.lock();
        let key = loop {
            let key = uuid::Uuid::new_v4().to_string();
            if !inner.lru.contains(&key) {
                break key;
            }
        };

        while inner.total_bytes + size > self.max_bytes {
            match inner.lru.pop_lru() {
                Some((evicted, entry)) => {
                    tracing::debug!(key = %evicted, "evicting cached output");
                    inner.total_bytes = inner.total_bytes.saturating_sub(entry.data.len());
                }
                None => break,
            }
        }

        // A full LRU evicts on push; keep the byte count in step
        if let Some((_, evicted)) = inner.lru.push(key.clone(), CachedPdf { file_name, data }) {
            inner.total_bytes = inner.total_bytes.saturating_sub(evicted.data.len());
        }
        inner.total_bytes += size;

        Some(key)
    }

    pub fn get(&self, key: &str) -> Option<CachedPdf> {
        self.inner.lock().lru.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.inner.lock().lru.contains(key)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().lru.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().lru.is_empty()
    }

    /// Total bytes currently stored
    pub fn total_bytes(&self) -> usize {
        self.inner.lock().total_bytes
    }
}
