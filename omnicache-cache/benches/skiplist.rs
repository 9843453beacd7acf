//! Throughput benchmarks for the range cache index

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use omnicache_cache::skiplist::CacheSkipList;
use omnicache_cache::CacheConfig;
use omnicache_core::{BytewiseComparator, MemoryStore, MetricRegistry};
use std::sync::Arc;

fn new_list() -> Arc<CacheSkipList> {
    let config = CacheConfig {
        enabled: true,
        max_size_bytes: 1 << 30,
        ..Default::default()
    };
    Arc::new(
        CacheSkipList::new(
            config,
            Arc::new(BytewiseComparator),
            Arc::new(MemoryStore::new()),
            &MetricRegistry::disabled(),
        )
        .unwrap(),
    )
}

fn key(i: u32) -> Vec<u8> {
    format!("{:08}", i).into_bytes()
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    for size in [1_000u32, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let list = new_list();
                for i in 0..size {
                    let k = key(i);
                    list.insert(&k, &k);
                }
            });
        });
    }
    group.finish();
}

fn bench_append_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("append_run");
    for size in [1_000u32, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let list = new_list();
                let k = key(0);
                list.insert(&k, &k);
                for i in 1..size {
                    let k = key(i);
                    list.append(&k, &k);
                }
            });
        });
    }
    group.finish();
}

fn bench_seek_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("seek_hit");
    for size in [1_000u32, 10_000] {
        let list = new_list();
        let k0 = key(0);
        list.insert(&k0, &k0);
        for i in 1..size {
            let k = key(i);
            list.append(&k, &k);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            let target = key(size / 2);
            b.iter(|| {
                black_box(list.seek(&target).valid());
            });
        });
    }
    group.finish();
}

fn bench_scan_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("scan_run");
    for size in [1_000u32, 10_000] {
        let list = new_list();
        let k0 = key(0);
        list.insert(&k0, &k0);
        for i in 1..size {
            let k = key(i);
            list.append(&k, &k);
        }
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| {
                let mut iter = list.seek(&key(0));
                let mut count = 0u32;
                while iter.valid() {
                    count += 1;
                    iter.next();
                }
                black_box(count);
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_insert,
    bench_append_run,
    bench_seek_hit,
    bench_scan_run
);
criterion_main!(benches);
