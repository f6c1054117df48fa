//! Benchmarks for the share-link codec.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use mermaidpad::samples::DEFAULT_SOURCE;
use mermaidpad::share::{decode, encode};

fn large_source() -> String {
    let mut source = String::from("graph LR\n");
    for i in 0..1000 {
        source.push_str(&format!("    A{i}[Step {i}] --> A{}\n", i + 1));
    }
    source
}

fn bench_encode(c: &mut Criterion) {
    let large = large_source();
    c.bench_function("encode_default", |b| b.iter(|| encode(black_box(DEFAULT_SOURCE))));
    c.bench_function("encode_large", |b| b.iter(|| encode(black_box(&large))));
}

fn bench_decode(c: &mut Criterion) {
    let token = encode(&large_source());
    c.bench_function("decode_large", |b| {
        b.iter(|| decode(black_box(&token)).unwrap());
    });
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
