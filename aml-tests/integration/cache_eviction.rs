//! Bounded-cache eviction and hit/miss accounting.

use aml_core::cache::{Cache, CachePolicy};
use aml_test_utils::sample_pattern;
use uuid::Uuid;

#[test]
fn an_lru_cache_evicts_the_least_recently_used_entry_once_full() {
    let mut cache: Cache<Uuid, String> = Cache::new(CachePolicy::Lru, 2, None);
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    cache.set(a, "a".to_string());
    cache.set(b, "b".to_string());
    cache.get(&a); // touch a, so b becomes the least-recently-used entry
    cache.set(c, "c".to_string());

    assert!(cache.has(&a));
    assert!(!cache.has(&b));
    assert!(cache.has(&c));
    assert_eq!(cache.len(), 2);
}

#[test]
fn hits_and_misses_are_accounted_accurately() {
    let mut cache: Cache<Uuid, String> = Cache::new(CachePolicy::Lru, 4, None);
    let key = Uuid::new_v4();
    cache.set(key, "value".to_string());

    cache.get(&key);
    cache.get(&key);
    cache.get(&Uuid::new_v4());

    let stats = cache.stats();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 1);
}

#[test]
fn pattern_records_round_trip_through_the_cache() {
    let mut cache: Cache<Uuid, aml_core::types::Pattern> = Cache::new(CachePolicy::Lru, 8, None);
    let pattern = sample_pattern("scout", "react-opt");
    cache.set(pattern.id, pattern.clone());

    let fetched = cache.get(&pattern.id).expect("pattern should still be cached");
    assert_eq!(fetched.id, pattern.id);
}

#[test]
fn an_lfu_cache_evicts_the_least_frequently_used_entry() {
    let mut cache: Cache<Uuid, String> = Cache::new(CachePolicy::Lfu, 2, None);
    let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

    cache.set(a, "a".to_string());
    cache.set(b, "b".to_string());
    cache.get(&a);
    cache.get(&a);
    cache.get(&b);

    cache.set(c, "c".to_string());

    assert!(cache.has(&a));
    assert!(!cache.has(&b));
    assert!(cache.has(&c));
}
