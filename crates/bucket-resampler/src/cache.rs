//! Memoization of bucket indices across aggregation calls.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chunked_array::ArrayToken;
use swath_common::GridId;

use crate::indices::BucketIndices;

/// Cache key: identity of the lon array, the lat array, and the grid.
pub type IndexKey = (ArrayToken, ArrayToken, GridId);

/// Statistics about index-cache effectiveness.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 - 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Append-only cache of computed [`BucketIndices`], keyed by input
/// identity.
///
/// Entries are pure functions of their key, so there is no invalidation.
/// Losing a population race to another thread wastes a little graph
/// building, never correctness: the values are idempotent.
#[derive(Default)]
pub struct IndexCache {
    entries: Mutex<HashMap<IndexKey, BucketIndices>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl IndexCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up previously computed indices.
    pub fn get(&self, key: &IndexKey) -> Option<BucketIndices> {
        let entries = self.lock();
        match entries.get(key) {
            Some(indices) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(?key, "bucket index cache hit");
                Some(indices.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store computed indices. Existing entries for the key are kept:
    /// they are necessarily equivalent.
    pub fn insert(&self, key: IndexKey, indices: BucketIndices) {
        self.lock().entry(key).or_insert(indices);
    }

    /// Return cached indices for `key`, computing and storing them on a
    /// miss.
    ///
    /// The computation runs outside the lock; concurrent callers may
    /// duplicate work for the same key, which is tolerated.
    pub fn get_or_insert_with<F>(&self, key: IndexKey, compute: F) -> crate::error::Result<BucketIndices>
    where
        F: FnOnce() -> crate::error::Result<BucketIndices>,
    {
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        let indices = compute()?;
        self.insert(key, indices.clone());
        Ok(indices)
    }

    /// Get cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.lock().len(),
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop all entries. Subsequent lookups recompute; results are
    /// unchanged.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<IndexKey, BucketIndices>> {
        // The map is append-only, so it stays usable even if a holder
        // panicked mid-insert.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
