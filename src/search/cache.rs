use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

use crate::search::results::SearchHit;

const DEFAULT_CAPACITY: usize = 64;

/// Query-result cache keyed by the raw query string.
///
/// Valid as long as the index does not change underneath it; the session
/// clears it on every document added.
pub struct QueryCache {
    cache: Mutex<LruCache<String, Vec<SearchHit>>>,
    hit_count: AtomicUsize,
    miss_count: AtomicUsize,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap();
        QueryCache {
            cache: Mutex::new(LruCache::new(capacity)),
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, query: &str) -> Option<Vec<SearchHit>> {
        let mut cache = self.cache.lock();
        match cache.get(query) {
            Some(hits) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Some(hits.clone())
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn put(&self, query: &str, hits: Vec<SearchHit>) {
        self.cache.lock().put(query.to_string(), hits);
    }

    pub fn clear(&self) {
        self.cache.lock().clear();
    }

    pub fn hit_count(&self) -> usize {
        self.hit_count.load(Ordering::Relaxed)
    }

    pub fn miss_count(&self) -> usize {
        self.miss_count.load(Ordering::Relaxed)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
