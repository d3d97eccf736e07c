use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use multistore_cache::{CacheConfig, CacheManager, MB, StorageStrategy};
use tokio::runtime::Runtime;

mod common;
use common::{BenchConfig, BenchUser, KeyGenerator};

const STRATEGIES: [StorageStrategy; 4] = [
    StorageStrategy::Memory,
    StorageStrategy::SessionPersisted,
    StorageStrategy::IndexedRecord,
    StorageStrategy::Hybrid,
];

async fn setup_cache(config: CacheConfig, keys: &[String]) -> CacheManager {
    let cache = CacheManager::new(CacheConfig {
        max_size: 100 * MB,
        ..config
    })
    .await
    .expect("Failed to create cache manager");

    for (i, key) in keys.iter().enumerate() {
        cache
            .set(key, &BenchUser::new(i as u64), None)
            .await
            .expect("Failed to populate cache");
    }
    cache
}

fn strategy_config(strategy: StorageStrategy) -> CacheConfig {
    CacheConfig {
        strategy,
        ..Default::default()
    }
}

/// Benchmark 1: Writes (fresh items, eviction never triggers)
fn bench_set(c: &mut Criterion, config: &BenchConfig) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("set");
    group.sample_size(config.sample_size);

    let keys = KeyGenerator::new(config.num_keys).sequential();
    group.throughput(Throughput::Elements(keys.len() as u64));

    for strategy in STRATEGIES {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy.as_str()),
            &strategy,
            |b, &strategy| {
                let cache = rt.block_on(setup_cache(strategy_config(strategy), &[]));
                let user = BenchUser::new(42);

                b.to_async(&rt).iter(|| async {
                    for key in &keys {
                        black_box(cache.set(key, &user, None).await.unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark 2: Hot Cache (Zipf reads, all hits)
fn bench_hot_cache(c: &mut Criterion, config: &BenchConfig) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("hot_cache");
    group.sample_size(config.sample_size);

    let key_gen = KeyGenerator::new(config.num_keys);
    let keys = key_gen.sequential();
    let reads = key_gen.zipf_random(config.num_keys);
    group.throughput(Throughput::Elements(reads.len() as u64));

    for strategy in STRATEGIES {
        group.bench_with_input(
            BenchmarkId::from_parameter(strategy.as_str()),
            &strategy,
            |b, &strategy| {
                let cache = rt.block_on(setup_cache(strategy_config(strategy), &keys));

                b.to_async(&rt).iter(|| async {
                    for key in &reads {
                        let _ = black_box(cache.get::<BenchUser>(key).await);
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark 3: Mixed Workload (hits and misses on the memory backend)
fn bench_mixed_workload(c: &mut Criterion, config: &BenchConfig) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("mixed_workload");
    group.sample_size(config.sample_size);

    let key_gen = KeyGenerator::new(config.num_keys);
    let keys = key_gen.sequential();
    let cache = rt.block_on(setup_cache(strategy_config(StorageStrategy::Memory), &keys));

    for hit_ratio in [0.5, 0.8, 0.95] {
        let reads = key_gen.mixed(hit_ratio, 1000);
        group.throughput(Throughput::Elements(reads.len() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}%_hits", (hit_ratio * 100.0) as u32)),
            &reads,
            |b, reads| {
                b.to_async(&rt).iter(|| async {
                    for key in reads {
                        let _ = black_box(cache.get::<BenchUser>(key).await);
                    }
                });
            },
        );
    }

    group.finish();
}

/// Benchmark 4: Serializer chain overhead
fn bench_serializer_chain(c: &mut Criterion, config: &BenchConfig) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("serializer_chain");
    group.sample_size(config.sample_size);

    let keys = KeyGenerator::new(config.num_keys).sequential();
    group.throughput(Throughput::Elements(keys.len() as u64));

    let variants = [
        ("plain", CacheConfig::default()),
        ("compressed", CacheConfig {
            compress: true,
            ..Default::default()
        }),
        ("encrypted", CacheConfig {
            encrypt: true,
            ..Default::default()
        }),
    ];

    for (name, cache_config) in variants {
        group.bench_function(name, |b| {
            let cache = rt.block_on(setup_cache(cache_config.clone(), &keys));

            b.to_async(&rt).iter(|| async {
                for key in &keys {
                    let _ = black_box(cache.get::<BenchUser>(key).await);
                }
            });
        });
    }

    group.finish();
}

fn run_benchmarks(c: &mut Criterion) {
    let config = BenchConfig::new();

    bench_set(c, &config);
    bench_hot_cache(c, &config);
    bench_mixed_workload(c, &config);
    bench_serializer_chain(c, &config);
}

criterion_group!(benches, run_benchmarks);
criterion_main!(benches);
