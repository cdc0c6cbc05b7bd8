//! Benchmarks for arrayvault put/get paths

use arrayvault::{record, Archive};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

record! {
    #[derive(Debug, Default)]
    struct Sample {
        pub id: i64,
        pub weight: f32,
        pub values: Vec<f64>,
    }
}

fn sequence_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence");

    for len in [16usize, 1024, 65536] {
        let values: Vec<f64> = (0..len).map(|i| i as f64).collect();
        let archive = Archive::in_memory();

        group.bench_with_input(BenchmarkId::new("put", len), &values, |b, values| {
            b.iter(|| archive.put("seq", black_box(values)).unwrap())
        });

        archive.put("seq", &values).unwrap();
        group.bench_with_input(BenchmarkId::new("get", len), &len, |b, _| {
            let mut out: Vec<f64> = Vec::new();
            b.iter(|| {
                archive.get("seq", &mut out).unwrap();
                black_box(&out);
            })
        });
    }

    group.finish();
}

fn record_benchmarks(c: &mut Criterion) {
    let sample = Sample {
        id: 42,
        weight: 0.25,
        values: (0..256).map(|i| i as f64 * 0.5).collect(),
    };
    let archive = Archive::in_memory();

    c.bench_function("record/put", |b| {
        b.iter(|| archive.put("rec", black_box(&sample)).unwrap())
    });

    archive.put("rec", &sample).unwrap();
    c.bench_function("record/get", |b| {
        let mut out = Sample::default();
        b.iter(|| {
            archive.get("rec", &mut out).unwrap();
            black_box(&out);
        })
    });
}

criterion_group!(benches, sequence_benchmarks, record_benchmarks);
criterion_main!(benches);
