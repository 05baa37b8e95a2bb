use criterion::{criterion_group, criterion_main, Criterion};
use search_core::document::process_all;
use search_core::index::build_index;
use search_core::tokenizer::normalize;
use search_core::{NormalizerOptions, RawDocument};

const SAMPLE: &str = "Elastic waist cotton blend track pants with zip pockets. \
    Regular fit, machine washable, café-style drawstring and ribbed cuffs for everyday comfort.";

fn catalog(n: usize) -> Vec<RawDocument> {
    (0..n)
        .map(|i| RawDocument {
            pid: format!("P{i}"),
            title: format!("Solid track pants {}", i % 17),
            description: Some(SAMPLE.to_string()),
            brand: Some(format!("Brand{}", i % 5)),
            ..Default::default()
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    c.bench_function("normalize_description", |b| b.iter(|| normalize(SAMPLE)));
}

fn bench_build(c: &mut Criterion) {
    let docs = process_all(catalog(1_000), NormalizerOptions::default());
    c.bench_function("build_index_1k", |b| b.iter(|| build_index(&docs)));
}

criterion_group!(benches, bench_normalize, bench_build);
criterion_main!(benches);
