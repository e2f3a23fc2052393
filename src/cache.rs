//! Caching of annotation results

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Everything an annotation result depends on
///
/// The registry generation is part of the key, so results computed before
/// a registry change are never served after it. The source text is kept
/// in full: two different inputs can never share an entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestKey {
    generation: u64,
    language: String,
    global_class: Option<String>,
    code: String,
}

impl RequestKey {
    pub fn new(generation: u64, language: &str, global_class: Option<&str>, code: &str) -> Self {
        Self {
            generation,
            language: language.to_string(),
            global_class: global_class.map(str::to_string),
            code: code.to_string(),
        }
    }
}

/// LRU cache of annotated output
pub struct ResultCache {
    cache: Mutex<LruCache<RequestKey, String>>,
}

impl ResultCache {
    /// `None` when `capacity` is zero, meaning caching is off
    pub fn new(capacity: usize) -> Option<Self> {
        NonZeroUsize::new(capacity).map(|capacity| Self {
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Get cached result
    pub fn get(&self, key: &RequestKey) -> Option<String> {
        let mut cache = self.cache.lock().ok()?;
        cache.get(key).cloned()
    }

    /// Insert result into cache
    pub fn insert(&self, key: RequestKey, annotated: String) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(key, annotated);
        }
    }

    /// Clear the cache
    pub fn clear(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        if let Ok(cache) = self.cache.lock() {
            CacheStats {
                size: cache.len(),
                capacity: cache.cap().get(),
            }
        } else {
            CacheStats {
                size: 0,
                capacity: 0,
            }
        }
    }
}

/// Cache statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    /// Current number of entries
    pub size: usize,

    /// Maximum capacity
    pub capacity: usize,
}

impl CacheStats {
    pub fn utilization(&self) -> f32 {
        if self.capacity == 0 {
            0.0
        } else {
            self.size as f32 / self.capacity as f32
        }
    }
}
