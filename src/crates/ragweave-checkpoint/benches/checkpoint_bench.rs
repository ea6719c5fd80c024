use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ragweave_checkpoint::{CheckpointStore, CipherKey, MemoryBackend, KEY_LEN};
use serde_json::json;
use std::sync::Arc;

fn bench_store() -> CheckpointStore {
    CheckpointStore::new(
        Arc::new(MemoryBackend::new()),
        CipherKey::from_bytes([0x42; KEY_LEN]),
    )
}

fn checkpoint_put_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint put", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = bench_store();
            let state = json!({
                "messages": [{"role": "user", "content": "benchmark message"}],
                "docs": [],
            });
            store.put("bench-run", "bench-user", black_box(state)).await.unwrap();
        });
    });
}

fn checkpoint_get_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();

    c.bench_function("checkpoint get", |b| {
        b.to_async(&runtime).iter(|| async {
            let store = bench_store();
            let state = json!({"messages": [{"role": "user", "content": "benchmark message"}]});
            store.put("bench-run", "bench-user", state).await.unwrap();

            store.get(black_box("bench-run")).await.unwrap();
        });
    });
}

criterion_group!(benches, checkpoint_put_benchmark, checkpoint_get_benchmark);
criterion_main!(benches);
