use indexer::{build, corpus_map, evaluate_benchmark, load_benchmark, load_corpus, open_engine, resolve_method, BenchmarkQuery};
use search_core::{BlendTarget, NormalizerOptions, RankMethod};
use std::fs;
use tempfile::tempdir;

const CATALOG: &str = r#"{"pid": "D1", "title": "Red cotton shirt", "average_rating": "4.5", "selling_price": "₹1,299"}
{"pid": "D2", "title": "Blue cotton shirt", "average_rating": 3.0}

{"pid": "D3", "title": "Red silk dress", "product_details": {"Fabric": "Silk", "Sleeves": 3}}
"#;

fn write_catalog(dir: &std::path::Path) -> std::path::PathBuf {
    let input = dir.join("catalog");
    fs::create_dir_all(&input).unwrap();
    fs::write(input.join("part-0.jsonl"), CATALOG).unwrap();
    fs::write(input.join("notes.txt"), "ignored").unwrap();
    input
}

#[test]
fn builds_and_searches_from_disk() {
    let dir = tempdir().unwrap();
    let input = write_catalog(dir.path());
    let out = dir.path().join("index");

    let meta = build(&input, &out, NormalizerOptions::default()).unwrap();
    assert_eq!(meta.num_docs, 3);

    let docs = load_corpus(&input).unwrap();
    assert_eq!(docs[0].selling_price, Some(1299.0));
    let corpus = corpus_map(&docs);
    let engine = open_engine(&out, &corpus, None).unwrap();

    assert_eq!(engine.search("red cotton", &corpus, RankMethod::TfIdf, 10), vec!["D1"]);
    assert_eq!(engine.search("red cotton", &corpus, RankMethod::Bm25, 10), vec!["D1"]);
    assert_eq!(engine.search("cotton shirt", &corpus, RankMethod::Custom, 10), vec!["D1", "D2"]);
    assert_eq!(engine.search("silk", &corpus, RankMethod::TfIdf, 10), vec!["D3"]);
    // Embeddings were never loaded.
    assert_eq!(engine.search("red cotton", &corpus, RankMethod::Embedding, 10), vec!["D1"]);
}

#[test]
fn missing_embedding_file_disables_method() {
    let dir = tempdir().unwrap();
    let input = write_catalog(dir.path());
    let out = dir.path().join("index");
    build(&input, &out, NormalizerOptions::default()).unwrap();
    let corpus = corpus_map(&load_corpus(&input).unwrap());
    let engine = open_engine(&out, &corpus, Some(&dir.path().join("missing.vec"))).unwrap();
    assert!(!engine.supports(RankMethod::Embedding));
}

#[test]
fn embeddings_from_text_file() {
    let dir = tempdir().unwrap();
    let input = write_catalog(dir.path());
    let out = dir.path().join("index");
    build(&input, &out, NormalizerOptions::default()).unwrap();
    let vectors = dir.path().join("vectors.txt");
    fs::write(&vectors, "2 2\nsilk 1 0\ncotton 0 1\n").unwrap();

    let corpus = corpus_map(&load_corpus(&input).unwrap());
    let engine = open_engine(&out, &corpus, Some(&vectors)).unwrap();
    assert!(engine.supports(RankMethod::Embedding));
    let ranked = engine.search("silk", &corpus, RankMethod::Embedding, 1);
    assert_eq!(ranked, vec!["D3"]);
}

#[test]
fn resolves_method_names() {
    assert_eq!(resolve_method("bm25", None, None).unwrap(), RankMethod::Bm25);
    assert_eq!(resolve_method("whatever", None, None).unwrap(), RankMethod::TfIdf);
    assert_eq!(
        resolve_method("blended", Some(4.0), None).unwrap(),
        RankMethod::Blended(BlendTarget { rating: 4.0, price: 0.0 })
    );
}

#[test]
fn blended_without_targets_is_rejected() {
    let err = resolve_method("blended", None, None).unwrap_err();
    assert!(err.to_string().contains("--target-rating"));
    assert_eq!(
        resolve_method("Blended", None, Some(30.0)).unwrap(),
        RankMethod::Blended(BlendTarget { rating: 0.0, price: 30.0 })
    );
}

#[test]
fn evaluates_benchmark_file() {
    let dir = tempdir().unwrap();
    let input = write_catalog(dir.path());
    let out = dir.path().join("index");
    build(&input, &out, NormalizerOptions::default()).unwrap();
    let corpus = corpus_map(&load_corpus(&input).unwrap());
    let engine = open_engine(&out, &corpus, None).unwrap();

    let bench_path = dir.path().join("bench.json");
    fs::write(
        &bench_path,
        r#"[{"query": "red cotton", "relevant": ["D1"]}, {"query": "red", "relevant": ["D3", "D9"]}]"#,
    )
    .unwrap();
    let queries: Vec<BenchmarkQuery> = load_benchmark(&bench_path).unwrap();
    let report = evaluate_benchmark(&engine, &corpus, &queries, RankMethod::TfIdf, 10, 2);

    assert_eq!(report.queries.len(), 2);
    assert_eq!(report.queries[0].precision, 1.0);
    assert_eq!(report.queries[1].precision, 0.5);
    assert!(report.mrr > 0.0 && report.mrr <= 1.0);
}
