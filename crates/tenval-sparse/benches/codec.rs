//! Benchmarks for the reference tensor and the binary codec
//!
//! Run with:
//! ```bash
//! cargo bench --bench codec
//! ```

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::hint::black_box;
use tenval_core::{Aggr, JoinOp, Label, TensorSpec};
use tenval_sparse::{CodecFormat, SimpleTensor};

/// Mixed tensor with `labels` subspaces of 16 cells, pseudo-random values
fn mixed_tensor(labels: usize) -> SimpleTensor {
    let mut spec = TensorSpec::parse("tensor(cat{},x[16])").unwrap();
    let mut seed = 12345u64;
    for c in 0..labels {
        for x in 0..16 {
            seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
            let value = (seed % 10000) as f64 / 10000.0;
            spec.insert(
                tenval_core::address([("cat", Label::from(c.to_string())), ("x", Label::from(x))]),
                value,
            );
        }
    }
    SimpleTensor::create(&spec).expect("Failed to create tensor")
}

fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");

    for labels in [16usize, 256, 1024] {
        let tensor = mixed_tensor(labels);
        let bytes = tensor.encode(CodecFormat::Legacy).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", labels), &tensor, |b, t| {
            b.iter(|| black_box(t.encode(CodecFormat::Legacy).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", labels), &bytes, |b, bytes| {
            b.iter(|| black_box(SimpleTensor::decode(black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

fn bench_algebra(c: &mut Criterion) {
    let mut group = c.benchmark_group("simple_tensor");
    let tensor = mixed_tensor(256);
    let scale = SimpleTensor::from_double(0.5);

    group.bench_function("join_scalar", |b| {
        b.iter(|| black_box(SimpleTensor::join(&tensor, &scale, JoinOp::Mul).unwrap()));
    });
    group.bench_function("reduce_x", |b| {
        b.iter(|| black_box(tensor.reduce(Aggr::Sum, &["x"]).unwrap()));
    });

    group.finish();
}

criterion_group!(benches, bench_codec, bench_algebra);
criterion_main!(benches);
