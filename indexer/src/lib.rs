use anyhow::{bail, Context, Result};
use search_core::document::process_all;
use search_core::eval::{evaluate, EvaluationReport, QueryRun};
use search_core::index::build_index;
use search_core::persist::{load_index, save_index, IndexPaths, MetaFile};
use search_core::{BlendTarget, Corpus, EmbeddingIndex, NormalizerOptions, RankMethod, RawDocument, SearchEngine, WordVectors};
use serde::Deserialize;
use walkdir::WalkDir;

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One benchmark query with its relevant pids.
#[derive(Debug, Deserialize)]
pub struct BenchmarkQuery {
    pub query: String,
    pub relevant: Vec<String>,
}

/// `.json` and `.jsonl` files under `input` (or `input` itself), in path order.
pub fn input_files(input: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).sort_by_file_name().into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
    } else if input.is_file() {
        files.push(input.to_path_buf());
    }
    files
}

pub fn load_corpus(input: &Path) -> Result<Vec<RawDocument>> {
    let mut docs = Vec::new();
    for file in input_files(input) {
        if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
            load_jsonl(&file, &mut docs)?;
        } else {
            load_json(&file, &mut docs)?;
        }
    }
    tracing::info!(num_docs = docs.len(), input = %input.display(), "loaded corpus");
    Ok(docs)
}

fn load_jsonl(file: &Path, docs: &mut Vec<RawDocument>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() { continue; }
        let doc: RawDocument = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}", file.display(), lineno + 1))?;
        docs.push(doc);
    }
    Ok(())
}

fn load_json(file: &Path, docs: &mut Vec<RawDocument>) -> Result<()> {
    let f = File::open(file).with_context(|| format!("opening {}", file.display()))?;
    let reader = BufReader::new(f);
    let json: serde_json::Value = serde_json::from_reader(reader)
        .with_context(|| format!("parsing {}", file.display()))?;
    match json {
        serde_json::Value::Array(arr) => {
            for v in arr {
                docs.push(serde_json::from_value(v)?);
            }
        }
        serde_json::Value::Object(_) => docs.push(serde_json::from_value(json)?),
        _ => tracing::warn!(file = %file.display(), "skipping file without documents"),
    }
    Ok(())
}

pub fn corpus_map(docs: &[RawDocument]) -> Corpus {
    docs.iter().map(|d| (d.pid.clone(), d.clone())).collect()
}

pub fn build(input: &Path, output: &Path, options: NormalizerOptions) -> Result<MetaFile> {
    let docs = load_corpus(input)?;
    let processed = process_all(docs, options);
    let index = build_index(&processed);
    let meta = save_index(&IndexPaths::new(output), &index, options)?;
    tracing::info!(output = %output.display(), "index build complete");
    Ok(meta)
}

/// Load the persisted index and, when a table path is given, the embeddings.
/// A table that fails to load leaves the embedding method unavailable.
pub fn open_engine(index_dir: &Path, corpus: &Corpus, embeddings: Option<&Path>) -> Result<SearchEngine> {
    let bundle = load_index(&IndexPaths::new(index_dir))?;
    let index = Arc::new(bundle.index);
    let mut engine = SearchEngine::new(index.clone(), bundle.options);
    if let Some(path) = embeddings {
        match WordVectors::load(path) {
            Ok(table) => {
                let embedded = EmbeddingIndex::build(table, &index, corpus);
                engine = engine.with_embeddings(Arc::new(embedded));
            }
            Err(err) => tracing::warn!(error = %err, "embeddings unavailable"),
        }
    }
    Ok(engine)
}

/// Map a method name plus optional blend targets to a ranking method.
/// `blended` needs at least one target; a missing one counts as 0.
pub fn resolve_method(name: &str, target_rating: Option<f64>, target_price: Option<f64>) -> Result<RankMethod> {
    if name.trim().eq_ignore_ascii_case("blended") {
        if target_rating.is_none() && target_price.is_none() {
            bail!("method 'blended' needs --target-rating and/or --target-price");
        }
        return Ok(RankMethod::Blended(BlendTarget {
            rating: target_rating.unwrap_or(0.0),
            price: target_price.unwrap_or(0.0),
        }));
    }
    let method = RankMethod::from_name(name);
    if method == RankMethod::TfIdf && !name.trim().eq_ignore_ascii_case("tfidf") {
        tracing::warn!(name, "unknown ranking method, using tfidf");
    }
    Ok(method)
}

pub fn load_benchmark(path: &Path) -> Result<Vec<BenchmarkQuery>> {
    let f = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let queries: Vec<BenchmarkQuery> = serde_json::from_reader(BufReader::new(f))
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(queries)
}

pub fn evaluate_benchmark(
    engine: &SearchEngine,
    corpus: &Corpus,
    queries: &[BenchmarkQuery],
    method: RankMethod,
    top_n: usize,
    k: usize,
) -> EvaluationReport {
    let runs: Vec<QueryRun> = queries
        .iter()
        .map(|q| QueryRun {
            query: q.query.clone(),
            ranking: engine.search(&q.query, corpus, method, top_n),
            relevant: q.relevant.clone(),
        })
        .collect();
    evaluate(&runs, k)
}
