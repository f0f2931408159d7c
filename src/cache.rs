/*!
 * Cache layer.
 *
 * Two tiers sit in front of the backing store:
 * - `LocalCache`: process-local, holds rich values, never crosses requests
 * - `PersistentCache`: shared across requests, holds serialized primitives
 *   only and is invalidated (never patched) on writes
 *
 * `CacheLayer` wraps the persistent tier with typed JSON access and the
 * "last changed" staleness tokens used to key batched reads.
 */

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result};
use log::{debug, warn};
use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use sha2::{Digest, Sha256};

/// Cross-request storage of serialized cache entries
pub trait PersistentCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn delete(&self, key: &str) -> Result<()>;
}

/// Persistent tier kept in memory; clones share the same entries
#[derive(Clone, Default)]
pub struct MemoryPersistentCache {
    entries: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryPersistentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl PersistentCache for MemoryPersistentCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

/// Process-local keyed cache with hit/miss statistics
pub struct LocalCache<K, V> {
    /// Internal cache storage
    entries: Arc<RwLock<HashMap<K, V>>>,

    /// Cache hit counter
    hits: Arc<AtomicU64>,

    /// Cache miss counter
    misses: Arc<AtomicU64>,

    /// Whether caching is enabled
    enabled: bool,
}

impl<K, V> LocalCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create a new local cache
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            enabled,
        }
    }

    /// Get a value from the cache
    pub fn get(&self, key: &K) -> Option<V> {
        if !self.enabled {
            return None;
        }

        match self.entries.read().get(key) {
            Some(value) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Whether the key is cached, without touching the statistics
    pub fn contains(&self, key: &K) -> bool {
        self.enabled && self.entries.read().contains_key(key)
    }

    /// Store a value in the cache
    pub fn store(&self, key: K, value: V) {
        if !self.enabled {
            return;
        }
        self.entries.write().insert(key, value);
    }

    /// Store many values under one lock
    pub fn store_many(&self, values: impl IntoIterator<Item = (K, V)>) {
        if !self.enabled {
            return;
        }
        self.entries.write().extend(values);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key)
    }

    /// Get cache statistics: hits, misses and hit rate
    pub fn stats(&self) -> (u64, u64, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;

        let hit_rate = if total > 0 {
            hits as f64 / total as f64
        } else {
            0.0
        };

        (hits, misses, hit_rate)
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl<K, V> Default for LocalCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new(true)
    }
}

impl<K, V> Clone for LocalCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            hits: self.hits.clone(),
            misses: self.misses.clone(),
            enabled: self.enabled,
        }
    }
}

/// Monotonic per-process sequence appended to staleness tokens
static TOKEN_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn new_token() -> String {
    let micros = chrono::Utc::now().timestamp_micros();
    let seq = TOKEN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    format!("{}.{}", micros, seq)
}

/// Stable hex key for a set of cache key parts
pub fn hash_key<T: Serialize>(parts: &T) -> String {
    let encoded = serde_json::to_vec(parts).unwrap_or_default();
    let digest = Sha256::digest(&encoded);
    digest.iter().take(16).map(|b| format!("{:02x}", b)).collect()
}

/// Typed access to the persistent tier plus staleness tokens
#[derive(Clone)]
pub struct CacheLayer {
    persistent: Arc<dyn PersistentCache>,
}

impl CacheLayer {
    pub fn new(persistent: Arc<dyn PersistentCache>) -> Self {
        Self { persistent }
    }

    /// Cache layer over a fresh in-memory persistent tier
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryPersistentCache::new()))
    }

    /// Read and decode an entry; undecodable entries are dropped
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let Some(raw) = self.persistent.get(key)? else {
            debug!("Persistent cache miss for '{}'", key);
            return Ok(None);
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("Persistent cache hit for '{}'", key);
                Ok(Some(value))
            }
            Err(e) => {
                warn!("Discarding undecodable cache entry '{}': {}", key, e);
                self.persistent.delete(key)?;
                Ok(None)
            }
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)
            .with_context(|| format!("Failed to serialize cache entry '{}'", key))?;
        self.persistent.set(key, &raw)
    }

    pub fn delete(&self, key: &str) -> Result<()> {
        self.persistent.delete(key)
    }

    /// Current staleness token of a cache group, created on first use
    pub fn last_changed(&self, group: &str) -> Result<String> {
        let key = format!("last_changed:{}", group);
        if let Some(token) = self.persistent.get(&key)? {
            return Ok(token);
        }
        let token = new_token();
        self.persistent.set(&key, &token)?;
        Ok(token)
    }

    /// Replace the staleness token of a cache group
    pub fn bump(&self, group: &str) -> Result<String> {
        let token = new_token();
        self.persistent.set(&format!("last_changed:{}", group), &token)?;
        debug!("Cache group '{}' changed ({})", group, token);
        Ok(token)
    }
}
