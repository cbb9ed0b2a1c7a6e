//! Benchmarks for the lexical similarity blend.

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use examforge_core::similarity::{fingerprint, similarity};

const STEM_A: &str = "Explain the difference between optimistic and pessimistic concurrency \
                      control and when each is preferable under contention";
const STEM_B: &str = "Describe how optimistic concurrency control differs from pessimistic \
                      locking and which workloads favour each approach";

fn bench_similarity(c: &mut Criterion) {
    c.bench_function("similarity_paraphrase_pair", |b| {
        b.iter(|| similarity(black_box(STEM_A), black_box(STEM_B)))
    });

    c.bench_function("similarity_identical_pair", |b| {
        b.iter(|| similarity(black_box(STEM_A), black_box(STEM_A)))
    });

    let long_a = STEM_A.repeat(20);
    let long_b = STEM_B.repeat(20);
    c.bench_function("similarity_long_text", |b| {
        b.iter(|| similarity(black_box(&long_a), black_box(&long_b)))
    });

    c.bench_function("fingerprint", |b| {
        b.iter(|| fingerprint(black_box(STEM_A)))
    });
}

criterion_group!(benches, bench_similarity);
criterion_main!(benches);
