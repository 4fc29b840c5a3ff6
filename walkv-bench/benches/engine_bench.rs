//! Engine benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::TempDir;
use walkv_core::{Config, Engine};

fn create_test_engine(max_entries: usize) -> (TempDir, Config, Engine) {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.storage.data_dir = dir.path().to_path_buf();
    config.limits.max_entries = max_entries;
    let engine = Engine::open(&config).unwrap();
    (dir, config, engine)
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_write");

    for (name, durable) in [("no_fsync", false), ("fsync", true)] {
        let (_dir, _config, mut engine) = create_test_engine(100);
        let mut n = 0u64;

        group.throughput(Throughput::Elements(1));
        group.bench_function(name, |b| {
            b.iter(|| {
                n += 1;
                let key = format!("key-{}", n % 100);
                black_box(engine.write(&key, "value", durable).unwrap())
            });
        });
    }

    group.finish();
}

fn bench_recover(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine_recover");

    for writes in [100u64, 1000] {
        let (_dir, config, mut engine) = create_test_engine(1000);
        for i in 0..writes {
            engine
                .write(&format!("key-{}", i), "value", false)
                .unwrap();
        }

        group.throughput(Throughput::Elements(writes));
        group.bench_with_input(BenchmarkId::from_parameter(writes), &config, |b, config| {
            b.iter(|| {
                let mut engine = Engine::open(config).unwrap();
                black_box(engine.recover().unwrap())
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_write, bench_recover);

criterion_main!(benches);
