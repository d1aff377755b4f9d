//! Cache Layer throughput: set/get/eviction cost for the LRU and
//! LFU policies at a cache size smaller than the working set, so every
//! benchmark run actually exercises eviction.

use aml_core::cache::{Cache, CachePolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use uuid::Uuid;

const WORKING_SET: usize = 4096;
const CACHE_SIZE: usize = 512;

fn bench_set_with_eviction(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_set_eviction");
    for policy in [CachePolicy::Lru, CachePolicy::Lfu] {
        group.bench_with_input(BenchmarkId::new("policy", format!("{policy:?}")), &policy, |b, &policy| {
                b.iter(|| {
                        let mut cache = Cache::<Uuid, Vec<u8>>::new(policy, CACHE_SIZE, None);
                        for i in 0..WORKING_SET {
                            let key = Uuid::from_u128(i as u128);
                            cache.set(key, black_box(vec![0u8; 64]));
                        }
                        black_box(cache.len())
                });
        });
    }
    group.finish();
}

fn bench_get_hot_vs_cold(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_get");
    for policy in [CachePolicy::Lru, CachePolicy::Lfu] {
        let mut cache = Cache::<Uuid, Vec<u8>>::new(policy, CACHE_SIZE, None);
        let keys: Vec<Uuid> = (0..CACHE_SIZE as u128).map(Uuid::from_u128).collect();
        for &key in &keys {
            cache.set(key, vec![0u8; 64]);
        }
        group.bench_with_input(BenchmarkId::new("policy", format!("{policy:?}")), &keys, |b, keys| {
                let mut idx = 0usize;
                b.iter(|| {
                        let key = keys[idx % keys.len()];
                        idx += 1;
                        black_box(cache.get(&key))
                });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_set_with_eviction, bench_get_hot_vs_cold);
criterion_main!(benches);
