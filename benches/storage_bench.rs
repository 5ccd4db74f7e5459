use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use crawl_state_redis::{KeySpace, MemoryStore, Storage};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .unwrap()
}

fn storage(rt: &Runtime) -> Storage {
    rt.block_on(
        Storage::builder()
            .client(Arc::new(MemoryStore::new()))
            .prefix("bench")
            .expiration(Duration::from_secs(3600))
            .init(),
    )
    .unwrap()
}

// Key construction sits on every call path
fn bench_key_building(c: &mut Criterion) {
    let keys = KeySpace::new("colly");
    c.bench_function("visited_key", |b| {
        b.iter(|| black_box(keys.visited_key(black_box(18_446_744_073_709))))
    });
    c.bench_function("cookie_key", |b| {
        b.iter(|| black_box(keys.cookie_key(black_box("example.com:8080"))))
    });
}

fn bench_visited_roundtrip(c: &mut Criterion) {
    let rt = runtime();
    let storage = storage(&rt);

    c.bench_function("mark_then_check_visited", |b| {
        let mut id = 0u64;
        b.to_async(&rt).iter(|| {
            id += 1;
            let storage = storage.clone();
            async move {
                storage.visited().mark_visited(id).await.unwrap();
                black_box(storage.visited().is_visited(id).await.unwrap())
            }
        });
    });
}

fn bench_queue_batches(c: &mut Criterion) {
    let rt = runtime();
    let storage = storage(&rt);
    let mut group = c.benchmark_group("queue");

    for batch in [1usize, 16, 256] {
        let payloads: Vec<Vec<u8>> = (0..batch)
            .map(|i| format!("https://example.com/page{}", i).into_bytes())
            .collect();
        group.bench_with_input(BenchmarkId::new("push_drain", batch), &payloads, |b, payloads| {
            b.to_async(&rt).iter(|| {
                let storage = storage.clone();
                async move {
                    storage.queue().add_requests(payloads).await.unwrap();
                    while storage.queue().get_request().await.is_ok() {}
                }
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_building,
    bench_visited_roundtrip,
    bench_queue_batches
);
criterion_main!(benches);
