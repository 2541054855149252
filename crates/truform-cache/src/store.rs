//! A fixed-capacity, content-addressed artifact store with LRU eviction
//! (spec §4.6). One instance is shared across `PartBuild`, `Mesh` and
//! `Export` artifacts — callers key each kind with the matching function in
//! [`crate::key`] so the address spaces never collide.

use std::collections::{BTreeMap, VecDeque};

use crate::key::CacheKey;

/// `get_or_insert_with` is the cache's only write path. Because truform
/// builds are single-threaded-per-build (spec §5), two lookups for the
/// same key never race inside one process; "coalescing" here is simply
/// that a hit short-circuits the (potentially expensive) compute closure
/// rather than running it again.
pub struct ArtifactCache<V: Clone> {
    capacity: usize,
    entries: BTreeMap<u64, V>,
    /// Most-recently-used key at the back; eviction pops the front.
    recency: VecDeque<u64>,
    pub hits: u64,
    pub misses: u64,
}

impl<V: Clone> ArtifactCache<V> {
    pub fn new(capacity: usize) -> Self {
        ArtifactCache {
            capacity: capacity.max(1),
            entries: BTreeMap::new(),
            recency: VecDeque::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&mut self, key: CacheKey) -> Option<V> {
        if let Some(v) = self.entries.get(&key.0).cloned() {
            self.touch(key.0);
            self.hits += 1;
            Some(v)
        } else {
            self.misses += 1;
            None
        }
    }

    pub fn insert(&mut self, key: CacheKey, value: V) {
        if !self.entries.contains_key(&key.0) {
            self.evict_if_full();
        }
        self.entries.insert(key.0, value);
        self.touch(key.0);
    }

    /// Look up `key`; on a miss, run `compute` and cache its output.
    /// `compute` never runs on a hit.
    pub fn get_or_insert_with<E>(&mut self, key: CacheKey, compute: impl FnOnce() -> Result<V, E>) -> Result<(V, bool), E> {
        if let Some(v) = self.get(key) {
            return Ok((v, true));
        }
        let v = compute()?;
        self.insert(key, v.clone());
        Ok((v, false))
    }

    fn touch(&mut self, raw: u64) {
        self.recency.retain(|k| *k != raw);
        self.recency.push_back(raw);
    }

    fn evict_if_full(&mut self) {
        while self.entries.len() >= self.capacity {
            match self.recency.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
    }
}
