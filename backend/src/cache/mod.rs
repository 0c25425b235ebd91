//! Response cache - reuse model replies for identical requests.
//!
//! An in-memory LRU keyed by `(model, prompt)`. Uploading the same file
//! with the same instruction twice does not hit the model again. Nothing
//! is written to disk; the cache lives as long as the process.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

/// Replies kept per process
pub const DEFAULT_CACHE_CAPACITY: usize = 10;

/// Process-wide cache shared by every client built from config
static SHARED_CACHE: Lazy<Arc<ResponseCache>> =
    Lazy::new(|| Arc::new(ResponseCache::new(DEFAULT_CACHE_CAPACITY)));

pub fn shared_cache() -> Arc<ResponseCache> {
    Arc::clone(&SHARED_CACHE)
}

/// A stored reply with metadata
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub response: String,
    pub created_at: DateTime<Utc>,
    /// Times served from the cache
    pub hits: u32,
}

struct Entry {
    key: u64,
    model: String,
    prompt: String,
    value: CachedResponse,
}

/// Least-recently-used reply cache
pub struct ResponseCache {
    capacity: usize,
    /// Most recently used at the front
    entries: Mutex<VecDeque<Entry>>,
}

impl ResponseCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Look up a reply and mark it most recently used.
    pub fn get(&self, model: &str, prompt: &str) -> Option<CachedResponse> {
        let key = cache_key(model, prompt);
        let mut entries = self.entries.lock().ok()?;
        let pos = entries
            .iter()
            .position(|e| e.key == key && e.model == model && e.prompt == prompt)?;
        let mut entry = entries.remove(pos)?;
        entry.value.hits += 1;
        let value = entry.value.clone();
        entries.push_front(entry);
        Some(value)
    }

    /// Store a reply, evicting the least recently used one when full.
    pub fn insert(&self, model: &str, prompt: &str, response: impl Into<String>) {
        let key = cache_key(model, prompt);
        let Ok(mut entries) = self.entries.lock() else {
            return;
        };
        entries.retain(|e| !(e.key == key && e.model == model && e.prompt == prompt));
        entries.push_front(Entry {
            key,
            model: model.to_string(),
            prompt: prompt.to_string(),
            value: CachedResponse {
                response: response.into(),
                created_at: Utc::now(),
                hits: 0,
            },
        });
        entries.truncate(self.capacity);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

fn cache_key(model: &str, prompt: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    model.hash(&mut hasher);
    prompt.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_and_miss() {
        let cache = ResponseCache::new(3);
        cache.insert("llama2", "prompt", "a,b\n1,2");

        let hit = cache.get("llama2", "prompt").unwrap();
        assert_eq!(hit.response, "a,b\n1,2");
        assert_eq!(hit.hits, 1);

        assert!(cache.get("mistral", "prompt").is_none());
        assert!(cache.get("llama2", "other").is_none());
    }

    #[test]
    fn test_evicts_least_recently_used() {
        let cache = ResponseCache::new(2);
        cache.insert("m", "one", "1");
        cache.insert("m", "two", "2");
        // Touch "one" so "two" becomes the oldest
        cache.get("m", "one");
        cache.insert("m", "three", "3");

        assert_eq!(cache.len(), 2);
        assert!(cache.get("m", "one").is_some());
        assert!(cache.get("m", "two").is_none());
        assert!(cache.get("m", "three").is_some());
    }

    #[test]
    fn test_reinsert_replaces() {
        let cache = ResponseCache::new(2);
        cache.insert("m", "p", "old");
        cache.insert("m", "p", "new");
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("m", "p").unwrap().response, "new");
        cache.clear();
        assert!(cache.is_empty());
    }
}
