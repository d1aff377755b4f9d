//! Storage Engine throughput: atomic put/get on the filesystem
//! backend, with and without compression/encryption, across a small
//! range of payload sizes.

use aml_core::storage::{EncryptionKey, FsStorageEngine, StorageKey, StorageOptions};
use aml_core::types::{AgentName, ProjectId};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use tempfile::TempDir;

fn payload(size: usize) -> Vec<u8> {
    (0..size).map(|i| (i % 256) as u8).collect()
}

fn open_engine(options: StorageOptions) -> (TempDir, FsStorageEngine) {
    let dir = TempDir::new().expect("tempdir");
    let key = options.encryption.then(|| EncryptionKey([42u8; 32]));
    let engine = FsStorageEngine::open(
        dir.path(),
        ProjectId::from("bench-project"),
        options,
        key,
        10.0,
    )
    .expect("open storage engine");
    (dir, engine)
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_put");
    let agent: AgentName = "bench-agent".into();

    for &size in &[256usize, 4096, 65536] {
        for (label, options) in [
            ("plain", StorageOptions { compression: false, encryption: false }),
            ("compressed", StorageOptions { compression: true, encryption: false }),
            ("encrypted", StorageOptions { compression: false, encryption: true }),
        ] {
            let (_dir, engine) = open_engine(options);
            let bytes = payload(size);
            group.bench_with_input(BenchmarkId::new(label, size), &bytes, |b, bytes| {
                    b.iter(|| {
                            let key = StorageKey::pattern(agent.clone(), uuid::Uuid::new_v4());
                            engine.put(&key, black_box(bytes)).expect("put");
                    });
            });
        }
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("storage_get");
    let agent: AgentName = "bench-agent".into();

    for &size in &[256usize, 4096, 65536] {
        let (_dir, engine) = open_engine(StorageOptions { compression: true, encryption: true });
        let key = StorageKey::pattern(agent.clone(), uuid::Uuid::new_v4());
        engine.put(&key, &payload(size)).expect("seed put");
        group.bench_with_input(BenchmarkId::new("compressed_encrypted", size), &key, |b, key| {
                b.iter(|| black_box(engine.get(key).expect("get")));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_get);
criterion_main!(benches);
