//! Black-box contract coverage for the artifact cache and session store
//! (spec §4.6, §8 cache-soundness): behavior a caller depends on regardless
//! of the internal key/store representation.

use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use proptest::prelude::*;
use truform_cache::{content_hash, ArtifactCache, BuildSessionStore, CacheKey};

#[derive(serde::Serialize, Clone, Debug, PartialEq)]
struct Payload {
    values: BTreeMap<String, i64>,
}

proptest! {
    /// Two maps built by inserting the same key/value pairs in different
    /// orders serialize to the same canonical JSON, so they must hash
    /// identically — `BTreeMap` already discards insertion order, but this
    /// pins that the cache key construction never leaks it back in.
    #[test]
    fn insertion_order_never_changes_the_hash(
        pairs in prop::collection::vec(("[a-e]{1,3}", -1000i64..1000), 0..8),
    ) {
        let mut forward = BTreeMap::new();
        for (k, v) in &pairs {
            forward.insert(k.clone(), *v);
        }
        let mut backward = BTreeMap::new();
        for (k, v) in pairs.iter().rev() {
            backward.insert(k.clone(), *v);
        }
        let a = content_hash(&Payload { values: forward }).unwrap();
        let b = content_hash(&Payload { values: backward }).unwrap();
        assert_eq!(a, b);
    }

    /// Cache soundness (spec §8): a value stored under one key is never
    /// returned for a different key.
    #[test]
    fn distinct_keys_never_collide_in_the_store(
        a in 0u64..10_000,
        offset in 1u64..10_000,
        va in 0i32..1000,
        vb in 0i32..1000,
    ) {
        let b = a + offset;
        let mut cache: ArtifactCache<i32> = ArtifactCache::new(64);
        cache.insert(CacheKey(a), va);
        cache.insert(CacheKey(b), vb);
        assert_eq!(cache.get(CacheKey(a)), Some(va));
        assert_eq!(cache.get(CacheKey(b)), Some(vb));
    }
}

#[test]
fn cache_never_exceeds_its_configured_capacity() {
    let mut cache: ArtifactCache<i32> = ArtifactCache::new(16);
    for i in 0..500u64 {
        cache.insert(CacheKey(i), i as i32);
    }
    assert!(cache.len() <= 16);
}

#[test]
fn session_store_round_trip_across_create_touch_close() {
    let mut store = BuildSessionStore::with_defaults();
    let t0 = DateTime::<Utc>::UNIX_EPOCH;
    let id = store.create("doc-a", t0).unwrap();

    let key = content_hash(&"part1/depth=2").unwrap();
    store.touch(id, t0 + Duration::seconds(1)).unwrap().record_part_build("part1", key);
    assert!(store.get(id).unwrap().can_reuse("part1", key));

    store.close(id);
    assert!(store.get(id).is_err());
}

#[test]
fn expired_session_is_not_reachable_even_if_never_closed() {
    let mut store = BuildSessionStore::new(Duration::seconds(30), 4);
    let t0 = DateTime::<Utc>::UNIX_EPOCH;
    let id = store.create("doc-a", t0).unwrap();
    store.expire_stale(t0 + Duration::seconds(31));
    assert!(store.get(id).is_err());
}
