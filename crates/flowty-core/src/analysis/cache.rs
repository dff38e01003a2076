use crate::analysis::narrow::NarrowedTypes;
use crate::flow::InstrIndex;
use indexmap::IndexMap;
use std::sync::Arc;

/// Identifies one memoized narrowing answer. `version` is the value of the
/// cache's modification counter at compute time; bumping the counter makes
/// every older entry unreachable.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub flow: String,
    pub start: InstrIndex,
    pub usage: InstrIndex,
    pub version: u64,
}

#[derive(Debug, Clone, Default)]
pub struct CacheStatistics {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub invalidations: u64,
}

/// Memoizes query results per flow. Narrowing is deterministic over an
/// unchanged flow, so entries stay valid until the owner signals a
/// modification by bumping the version.
pub struct NarrowingCache {
    entries: IndexMap<CacheKey, Arc<NarrowedTypes>>,
    max_entries: usize,
    version: u64,
    stats: CacheStatistics,
}

impl NarrowingCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: IndexMap::new(),
            max_entries,
            version: 0,
            stats: CacheStatistics::default(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn key(&self, flow: &str, start: InstrIndex, usage: InstrIndex) -> CacheKey {
        CacheKey {
            flow: flow.to_string(),
            start,
            usage,
            version: self.version,
        }
    }

    pub fn get_or_compute(
        &mut self,
        key: CacheKey,
        compute: impl FnOnce() -> NarrowedTypes,
    ) -> Arc<NarrowedTypes> {
        if let Some(result) = self.entries.get(&key) {
            self.stats.hits += 1;
            return result.clone();
        }

        self.stats.misses += 1;
        let result = Arc::new(compute());

        while self.entries.len() >= self.max_entries {
            self.entries.shift_remove_index(0);
            self.stats.evictions += 1;
        }

        self.entries.insert(key, result.clone());
        result
    }

    /// Signals that flows may have changed; every cached answer becomes
    /// stale and is dropped.
    pub fn bump_version(&mut self) {
        self.version += 1;
        let stale = self.entries.len();
        self.entries.clear();
        self.stats.invalidations += stale as u64;
    }

    pub fn invalidate_flow(&mut self, flow: &str) {
        let before = self.entries.len();
        self.entries.retain(|key, _| key.flow != flow);
        self.stats.invalidations += (before - self.entries.len()) as u64;
    }

    pub fn statistics(&self) -> &CacheStatistics {
        &self.stats
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.stats.hits + self.stats.misses;
        if total == 0 {
            0.0
        } else {
            self.stats.hits as f64 / total as f64
        }
    }
}

impl Default for NarrowingCache {
    fn default() -> Self {
        Self::new(256)
    }
}
