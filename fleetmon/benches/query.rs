//! Microbenchmarks for the range-query read path.
//!
//! Measures start-index location plus the forward walk on regular series
//! (direct indexing) and gapped series (binary-search fallback), and the
//! ingest+finalize build cost.
//!
//! Run with: `cargo bench -p fleetmon -- query`

#![allow(missing_docs, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use fleetmon::{RangeRequest, RawRecord, SeriesStore, ServerKey, StoreConfig};

// 2014-10-31 00:00 UTC
const BASE_TS: i64 = 1_414_713_600;
const IP: &str = "192.168.1.10";

/// Builds a finalized store with one series of `len` minute slots.
/// `gap_every` drops every n-th slot to force the fallback path.
fn build_store(len: i64, gap_every: Option<i64>) -> (SeriesStore, ServerKey) {
    let mut store = SeriesStore::new(StoreConfig::default()).unwrap();
    for i in 0..len {
        if let Some(gap) = gap_every
            && i % gap == 0
            && i != 0
        {
            continue;
        }
        store
            .ingest(&RawRecord {
                timestamp: BASE_TS + i * 60,
                server_ip: IP.to_string(),
                cpu: 0,
                usage: (i % 100) as u8,
            })
            .unwrap();
    }
    store.finalize().unwrap();
    (store, IP.parse().unwrap())
}

fn bench_query_regular(c: &mut Criterion) {
    let mut group = c.benchmark_group("query/regular_series");

    for len in [1_000i64, 100_000, 1_000_000] {
        let (store, key) = build_store(len, None);
        // One-hour window starting mid-series.
        let start = BASE_TS + (len / 2) * 60;
        let req = RangeRequest::new(key, 0, start, start + 3600);

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let result = store.query(black_box(&req)).unwrap();
                black_box(result.count())
            });
        });
    }

    group.finish();
}

fn bench_query_gapped(c: &mut Criterion) {
    let mut group = c.benchmark_group("query/gapped_series");

    for len in [1_000i64, 100_000, 1_000_000] {
        let (store, key) = build_store(len, Some(7));
        let start = BASE_TS + (len / 2) * 60;
        let req = RangeRequest::new(key, 0, start, start + 3600);

        group.bench_with_input(BenchmarkId::from_parameter(len), &len, |b, _| {
            b.iter(|| {
                let result = store.query(black_box(&req)).unwrap();
                black_box(result.count())
            });
        });
    }

    group.finish();
}

fn bench_ingest_finalize(c: &mut Criterion) {
    c.bench_function("ingest_finalize/10k_rows", |b| {
        b.iter(|| {
            let (store, _key) = build_store(black_box(10_000), None);
            black_box(store.sample_count())
        });
    });
}

criterion_group!(
    benches,
    bench_query_regular,
    bench_query_gapped,
    bench_ingest_finalize,
);
criterion_main!(benches);
