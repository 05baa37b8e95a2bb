//! Ranked-retrieval metrics with binary relevance.
//!
//! `docs` is a ranking (best first), `benchmark` the relevant ids. All metrics
//! return values in `[0, 1]` and 0 where a denominator would be zero.

use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

fn as_set<T: Eq + Hash>(items: &[T]) -> HashSet<&T> { items.iter().collect() }

pub fn precision_at_k<T: Eq + Hash>(docs: &[T], benchmark: &[T], k: usize) -> f64 {
    if k == 0 || docs.is_empty() {
        return 0.0;
    }
    let k = k.min(docs.len());
    let relevant = as_set(benchmark);
    let hits = docs[..k].iter().filter(|d| relevant.contains(d)).count();
    hits as f64 / k as f64
}

/// Share of the first `k` benchmark entries found anywhere in `docs`.
///
/// The benchmark itself is truncated to `k`; this keeps scores comparable with
/// historical evaluation runs. See [`standard_recall_at_k`] for the textbook form.
pub fn recall_at_k<T: Eq + Hash>(docs: &[T], benchmark: &[T], k: usize) -> f64 {
    if k == 0 || benchmark.is_empty() {
        return 0.0;
    }
    let k = k.min(benchmark.len());
    let retrieved = as_set(docs);
    let hits = benchmark[..k].iter().filter(|b| retrieved.contains(b)).count();
    hits as f64 / k as f64
}

/// `|docs[:k] ∩ benchmark| / |benchmark|`.
pub fn standard_recall_at_k<T: Eq + Hash>(docs: &[T], benchmark: &[T], k: usize) -> f64 {
    if k == 0 || benchmark.is_empty() {
        return 0.0;
    }
    let relevant = as_set(benchmark);
    let k = k.min(docs.len());
    let hits = docs[..k].iter().filter(|d| relevant.contains(d)).count();
    hits as f64 / relevant.len() as f64
}

pub fn average_precision_at_k<T: Eq + Hash>(docs: &[T], benchmark: &[T], k: usize) -> f64 {
    let relevant = as_set(benchmark);
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, doc) in docs.iter().take(k).enumerate() {
        if relevant.contains(doc) {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    if hits == 0 { 0.0 } else { sum / hits as f64 }
}

pub fn f1_at_k<T: Eq + Hash>(docs: &[T], benchmark: &[T], k: usize) -> f64 {
    let p = precision_at_k(docs, benchmark, k);
    let r = recall_at_k(docs, benchmark, k);
    if p == 0.0 && r == 0.0 {
        return 0.0;
    }
    2.0 * p * r / (p + r)
}

/// Reciprocal of the 1-based rank of the first relevant document; 0 if none.
pub fn reciprocal_rank<T: Eq + Hash>(docs: &[T], benchmark: &[T]) -> f64 {
    let relevant = as_set(benchmark);
    docs.iter()
        .position(|d| relevant.contains(d))
        .map(|i| 1.0 / (i + 1) as f64)
        .unwrap_or(0.0)
}

/// Mean average precision with `k = ranking.len()`, over all rankings. A
/// ranking without a benchmark entry counts as 0.
pub fn mean_average_precision<T: Eq + Hash>(rankings: &[Vec<T>], benchmarks: &[Vec<T>]) -> f64 {
    if rankings.is_empty() {
        return 0.0;
    }
    let total: f64 = rankings
        .iter()
        .zip(benchmarks)
        .map(|(ranking, rel)| average_precision_at_k(ranking, rel, ranking.len()))
        .sum();
    total / rankings.len() as f64
}

/// Mean reciprocal rank over all rankings, with the same denominator as
/// [`mean_average_precision`].
pub fn mean_reciprocal_rank<T: Eq + Hash>(rankings: &[Vec<T>], benchmarks: &[Vec<T>]) -> f64 {
    if rankings.is_empty() {
        return 0.0;
    }
    let total: f64 = rankings.iter().zip(benchmarks).map(|(ranking, rel)| reciprocal_rank(ranking, rel)).sum();
    total / rankings.len() as f64
}

/// Binary-relevance NDCG over the whole ranking.
pub fn ndcg<T: Eq + Hash>(docs: &[T], benchmark: &[T]) -> f64 {
    let relevant = as_set(benchmark);
    let dcg: f64 = docs
        .iter()
        .enumerate()
        .filter(|(_, d)| relevant.contains(d))
        .map(|(i, _)| 1.0 / ((i + 2) as f64).log2())
        .sum();
    let idcg: f64 = (1..=benchmark.len()).map(|i| 1.0 / ((i + 1) as f64).log2()).sum();
    if idcg > 0.0 { dcg / idcg } else { 0.0 }
}

/// One query's ranking against its relevance judgements.
#[derive(Debug, Clone)]
pub struct QueryRun {
    pub query: String,
    pub ranking: Vec<String>,
    pub relevant: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryEvaluation {
    pub query: String,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub average_precision: f64,
    pub reciprocal_rank: f64,
    pub ndcg: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub k: usize,
    pub queries: Vec<QueryEvaluation>,
    pub map: f64,
    pub mrr: f64,
}

pub fn evaluate(runs: &[QueryRun], k: usize) -> EvaluationReport {
    let queries = runs
        .iter()
        .map(|run| QueryEvaluation {
            query: run.query.clone(),
            precision: precision_at_k(&run.ranking, &run.relevant, k),
            recall: recall_at_k(&run.ranking, &run.relevant, k),
            f1: f1_at_k(&run.ranking, &run.relevant, k),
            average_precision: average_precision_at_k(&run.ranking, &run.relevant, k),
            reciprocal_rank: reciprocal_rank(&run.ranking, &run.relevant),
            ndcg: ndcg(&run.ranking, &run.relevant),
        })
        .collect();
    let rankings: Vec<Vec<String>> = runs.iter().map(|r| r.ranking.clone()).collect();
    let benchmarks: Vec<Vec<String>> = runs.iter().map(|r| r.relevant.clone()).collect();
    EvaluationReport {
        k,
        queries,
        map: mean_average_precision(&rankings, &benchmarks),
        mrr: mean_reciprocal_rank(&rankings, &benchmarks),
    }
}
