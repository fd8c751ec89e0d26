//! Bounded TTL cache for generated responses.
//!
//! [`ResponseCache`] deduplicates identical generation requests. Entries are
//! keyed on a [`CacheKey`] fingerprint of (prompt, provider, model, token
//! limit, temperature) and expire after a fixed TTL. Expiry is checked at
//! read time; an expired entry is evicted by the `get` that finds it.
//!
//! # Eviction
//!
//! When the store is full, inserting a new key evicts the oldest inserted
//! entry (FIFO). Overwriting an existing key refreshes its value and
//! timestamp but keeps its place in the eviction order.
//!
//! Only successful responses are cached. Errors and misses are never stored.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Deserialize;
use tokio::time::Instant;
use tracing::debug;

use crate::telemetry;
use crate::types::{AiResponse, RequestOptions};

/// Configuration for the response cache.
///
/// ```rust
/// # use consilium::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(500)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: usize,
    /// Time-to-live for cached entries. Default: 300 seconds.
    #[serde(rename = "ttl_ms", deserialize_with = "crate::serde_util::duration_ms")]
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_millis(300_000),
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default capacity and TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: usize) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Request fingerprint used as the cache key.
///
/// Derived from `prompt|provider|model|max_tokens|temperature`, with
/// `"default"` standing in for an unset provider or model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(u64);

impl CacheKey {
    /// Fingerprint a sanitized prompt together with its request options.
    ///
    /// Uses `DefaultHasher` (SipHash). The hash is deterministic within a
    /// process lifetime, which is all an in-memory cache needs.
    pub fn new(prompt: &str, options: &RequestOptions) -> Self {
        let provider = options.provider.map_or("default", |p| p.as_str());
        let model = options.model.as_deref().unwrap_or("default");
        let material = format!(
            "{prompt}|{provider}|{model}|{}|{}",
            options.max_tokens, options.temperature
        );
        let mut hasher = DefaultHasher::new();
        material.hash(&mut hasher);
        Self(hasher.finish())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

struct CacheEntry {
    value: AiResponse,
    inserted_at: Instant,
}

#[derive(Default)]
struct CacheStore {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Insertion order, oldest first. Always holds exactly the keys of `entries`.
    order: VecDeque<CacheKey>,
}

impl CacheStore {
    fn remove(&mut self, key: &CacheKey) {
        if self.entries.remove(key).is_some() {
            self.order.retain(|k| k != key);
        }
    }
}

/// In-memory FIFO + TTL response cache.
///
/// Safe to share across tasks; each `get`/`put` is a single critical section
/// on the cache's own lock and never awaits while holding it.
pub struct ResponseCache {
    store: Mutex<CacheStore>,
    max_entries: usize,
    ttl: Duration,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            store: Mutex::new(CacheStore::default()),
            max_entries: config.max_entries,
            ttl: config.ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Look up a cached response.
    ///
    /// Hits are returned with `cached = true`. An entry older than the TTL
    /// counts as a miss and is evicted.
    pub fn get(&self, key: &CacheKey) -> Option<AiResponse> {
        let mut store = self.lock();
        let expired = match store.entries.get(key) {
            Some(entry) if entry.inserted_at.elapsed() <= self.ttl => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                let mut value = entry.value.clone();
                value.cached = true;
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            store.remove(key);
            debug!(key = %key, "cache entry expired");
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "ttl").increment(1);
        }
        metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
        None
    }

    /// Insert (or overwrite) a response.
    ///
    /// Inserting a new key into a full cache first evicts the oldest entry.
    pub fn put(&self, key: CacheKey, value: AiResponse) {
        if self.max_entries == 0 {
            return;
        }
        let mut value = value;
        value.cached = false;
        let entry = CacheEntry {
            value,
            inserted_at: Instant::now(),
        };

        let mut store = self.lock();
        if let Some(existing) = store.entries.get_mut(&key) {
            *existing = entry;
            return;
        }
        while store.entries.len() >= self.max_entries {
            let Some(oldest) = store.order.pop_front() else {
                break;
            };
            store.entries.remove(&oldest);
            metrics::counter!(telemetry::CACHE_EVICTIONS_TOTAL, "reason" => "capacity")
                .increment(1);
        }
        store.entries.insert(key, entry);
        store.order.push_back(key);
    }

    /// Number of entries currently held, expired or not.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        let mut store = self.lock();
        store.entries.clear();
        store.order.clear();
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(&CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProviderId;

    #[test]
    fn cache_key_deterministic() {
        let opts = RequestOptions::default();
        assert_eq!(CacheKey::new("hello", &opts), CacheKey::new("hello", &opts));
    }

    #[test]
    fn cache_key_differs_on_prompt() {
        let opts = RequestOptions::default();
        assert_ne!(CacheKey::new("hello", &opts), CacheKey::new("world", &opts));
    }

    #[test]
    fn cache_key_differs_on_provider() {
        let a = RequestOptions::default().provider(ProviderId::OpenAi);
        let b = RequestOptions::default().provider(ProviderId::Anthropic);
        assert_ne!(CacheKey::new("p", &a), CacheKey::new("p", &b));
        assert_ne!(
            CacheKey::new("p", &a),
            CacheKey::new("p", &RequestOptions::default())
        );
    }

    #[test]
    fn cache_key_differs_on_sampling_parameters() {
        let base = RequestOptions::default();
        let key = CacheKey::new("p", &base);
        assert_ne!(key, CacheKey::new("p", &base.clone().max_tokens(10)));
        assert_ne!(key, CacheKey::new("p", &base.clone().temperature(0.2)));
        assert_ne!(key, CacheKey::new("p", &base.clone().model("other")));
    }

    #[test]
    fn cache_key_ignores_non_semantic_options() {
        let base = RequestOptions::default();
        let key = CacheKey::new("p", &base);
        assert_eq!(key, CacheKey::new("p", &base.clone().retry_count(9)));
        assert_eq!(key, CacheKey::new("p", &base.no_fallback()));
    }

    #[test]
    fn cache_key_renders_as_hex_fingerprint() {
        let key = CacheKey::new("p", &RequestOptions::default());
        let rendered = key.to_string();
        assert_eq!(rendered.len(), 16);
        assert!(rendered.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn zero_capacity_stores_nothing() {
        let cache = ResponseCache::new(&CacheConfig::new().max_entries(0));
        let key = CacheKey::new("p", &RequestOptions::default());
        cache.put(key, AiResponse::new(ProviderId::OpenAi, "m", "x"));
        assert!(cache.is_empty());
        assert!(cache.get(&key).is_none());
    }
}
