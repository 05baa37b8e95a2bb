//! Scoring models over a built [`SearchIndex`].
//!
//! Every lexical model first restricts the corpus to the candidate set: the
//! documents containing *all* query terms. A query term missing from the index
//! therefore yields no results rather than partial matches.

use crate::config::{BM25_B, BM25_K1};
use crate::document::Corpus;
use crate::index::{DocId, SearchIndex, TermEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredDoc {
    pub doc_id: DocId,
    pub score: f64,
}

/// Query-side signals for [`RankMethod::Blended`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BlendTarget {
    pub rating: f64,
    pub price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RankMethod {
    /// Cosine between idf-weighted query and tf-idf document vectors.
    TfIdf,
    Bm25,
    /// TF-IDF cosine boosted by `1 + rating / 10`.
    Custom,
    /// Even mix of TF-IDF cosine and rating/price cosine against a target.
    Blended(BlendTarget),
    /// Cosine between mean word embeddings of query and document.
    Embedding,
}

impl RankMethod {
    /// Parse a method name. Unknown names rank with TF-IDF.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "bm25" => RankMethod::Bm25,
            "custom" => RankMethod::Custom,
            "embedding" | "word2vec" => RankMethod::Embedding,
            _ => RankMethod::TfIdf,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RankMethod::TfIdf => "tfidf",
            RankMethod::Bm25 => "bm25",
            RankMethod::Custom => "custom",
            RankMethod::Blended(_) => "blended",
            RankMethod::Embedding => "embedding",
        }
    }
}

impl Default for RankMethod {
    fn default() -> Self { RankMethod::TfIdf }
}

impl fmt::Display for RankMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

#[derive(Debug, Error, PartialEq)]
pub enum RankError {
    #[error("embedding table is not loaded")]
    EmbeddingsUnavailable,
    #[error("term '{term}' has no idf entry")]
    MissingIdf { term: String },
    #[error("average document length is zero")]
    DegenerateLength,
    #[error("non-finite score for document {pid}")]
    NonFiniteScore { pid: String },
}

/// Documents containing every query term, ascending by doc id. Empty when the
/// query has no terms or any term is unknown to the index.
pub fn candidate_set(index: &SearchIndex, terms: &[String]) -> Vec<DocId> {
    let mut candidates: Option<Vec<DocId>> = None;
    for term in terms {
        let Some(entry) = index.term(term) else {
            return Vec::new();
        };
        let next = match candidates {
            None => entry.postings.iter().map(|p| p.doc_id).collect(),
            Some(current) => current.into_iter().filter(|&d| entry.slot_of(d).is_some()).collect::<Vec<_>>(),
        };
        if next.is_empty() {
            return Vec::new();
        }
        candidates = Some(next);
    }
    candidates.unwrap_or_default()
}

fn distinct_terms(terms: &[String]) -> Vec<&str> {
    let mut seen = HashSet::new();
    terms.iter().map(String::as_str).filter(|t| seen.insert(*t)).collect()
}

/// Cosine similarity; 0 when either vector has zero norm.
pub fn cosine(a: &[f64], b: &[f64]) -> f64 {
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f64>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Score descending, then pid ascending so equal scores order reproducibly.
pub(crate) fn sort_scored(index: &SearchIndex, scored: &mut [ScoredDoc]) {
    scored.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| index.pid(a.doc_id).cmp(&index.pid(b.doc_id)))
    });
}

pub fn rank_tfidf(index: &SearchIndex, terms: &[String]) -> Vec<ScoredDoc> {
    let candidates = candidate_set(index, terms);
    if candidates.is_empty() {
        return Vec::new();
    }
    // Candidates exist, so every query term is in the index.
    let entries: Vec<&TermEntry> = distinct_terms(terms).into_iter().filter_map(|t| index.term(t)).collect();
    let query_vec: Vec<f64> = entries.iter().map(|e| e.idf).collect();

    let mut scored: Vec<ScoredDoc> = candidates
        .into_iter()
        .map(|doc_id| {
            let doc_vec: Vec<f64> = entries
                .iter()
                .map(|e| e.slot_of(doc_id).map(|slot| e.tf[slot] * e.idf).unwrap_or(0.0))
                .collect();
            ScoredDoc { doc_id, score: cosine(&query_vec, &doc_vec) }
        })
        .collect();
    sort_scored(index, &mut scored);
    scored
}

/// BM25 contribution of a single term occurring `freq` times in a document.
pub fn bm25_term(freq: f64, doc_len: f64, avg_len: f64, idf: f64) -> f64 {
    let numerator = freq * (BM25_K1 + 1.0);
    let denominator = freq + BM25_K1 * (1.0 - BM25_B + BM25_B * (doc_len / avg_len));
    idf * (numerator / denominator)
}

/// BM25 over the candidate set. Repeated query terms contribute once per occurrence.
pub fn rank_bm25(index: &SearchIndex, terms: &[String]) -> Result<Vec<ScoredDoc>, RankError> {
    let candidates = candidate_set(index, terms);
    if candidates.is_empty() {
        return Ok(Vec::new());
    }
    let avg_len = index.average_doc_length();
    if avg_len <= 0.0 {
        return Err(RankError::DegenerateLength);
    }

    let mut entries: Vec<&TermEntry> = Vec::with_capacity(terms.len());
    for term in terms {
        match index.term(term) {
            Some(entry) if entry.df > 0 && entry.idf.is_finite() => entries.push(entry),
            _ => return Err(RankError::MissingIdf { term: term.clone() }),
        }
    }

    let mut scored = Vec::with_capacity(candidates.len());
    for doc_id in candidates {
        let doc_len = index.doc(doc_id).map(|d| d.length as f64).unwrap_or(0.0);
        let score: f64 = entries
            .iter()
            .filter_map(|e| e.slot_of(doc_id).map(|slot| (e, e.postings[slot].freq())))
            .map(|(e, freq)| bm25_term(freq as f64, doc_len, avg_len, e.idf))
            .sum();
        if !score.is_finite() {
            let pid = index.pid(doc_id).unwrap_or_default().to_string();
            return Err(RankError::NonFiniteScore { pid });
        }
        scored.push(ScoredDoc { doc_id, score });
    }
    sort_scored(index, &mut scored);
    Ok(scored)
}

/// TF-IDF cosine boosted by the document's average rating; unrated documents keep their score.
pub fn rank_rating_boost(index: &SearchIndex, terms: &[String], corpus: &Corpus) -> Vec<ScoredDoc> {
    let mut scored = rank_tfidf(index, terms);
    for hit in scored.iter_mut() {
        let rating = index
            .pid(hit.doc_id)
            .and_then(|pid| corpus.get(pid))
            .and_then(|doc| doc.average_rating);
        if let Some(rating) = rating {
            hit.score *= 1.0 + rating / 10.0;
        }
    }
    sort_scored(index, &mut scored);
    scored
}

/// `0.5 * text cosine + 0.5 * cosine((rating, price), target)`. Missing
/// rating or selling price count as 0.
pub fn rank_blended(index: &SearchIndex, terms: &[String], corpus: &Corpus, target: BlendTarget) -> Vec<ScoredDoc> {
    let mut scored = rank_tfidf(index, terms);
    let query_vec = [target.rating, target.price];
    for hit in scored.iter_mut() {
        let doc = index.pid(hit.doc_id).and_then(|pid| corpus.get(pid));
        let doc_vec = [
            doc.and_then(|d| d.average_rating).unwrap_or(0.0),
            doc.and_then(|d| d.selling_price).unwrap_or(0.0),
        ];
        hit.score = 0.5 * hit.score + 0.5 * cosine(&query_vec, &doc_vec);
    }
    sort_scored(index, &mut scored);
    scored
}
