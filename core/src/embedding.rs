use crate::document::Corpus;
use crate::index::{DocId, SearchIndex};
use crate::rank::{sort_scored, ScoredDoc};
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Word → fixed-length vector lookup.
pub trait EmbeddingTable {
    fn dim(&self) -> usize;
    fn lookup(&self, word: &str) -> Option<&[f32]>;
}

/// In-memory embedding table.
#[derive(Debug, Default)]
pub struct WordVectors {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectors {
    pub fn new(dim: usize) -> Self {
        Self { dim, vectors: HashMap::new() }
    }

    /// Insert a vector; returns false (and stores nothing) if its width is wrong.
    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) -> bool {
        if vector.len() != self.dim {
            return false;
        }
        self.vectors.insert(word.into(), vector);
        true
    }

    pub fn len(&self) -> usize { self.vectors.len() }
    pub fn is_empty(&self) -> bool { self.vectors.is_empty() }

    /// Parse the word2vec text format: an optional `count dim` header, then one
    /// `word v1 .. vd` line per word. Lines of the wrong width are skipped.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self> {
        let mut table: Option<WordVectors> = None;
        let mut skipped = 0usize;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let Some(word) = parts.next() else { continue };
            let values: Vec<&str> = parts.collect();

            if lineno == 0 && values.len() == 1 {
                if let (Ok(_), Ok(dim)) = (word.parse::<usize>(), values[0].parse::<usize>()) {
                    table = Some(WordVectors::new(dim));
                    continue;
                }
            }

            let vector: Vec<f32> = match values.iter().map(|v| v.parse::<f32>()).collect() {
                Ok(v) => v,
                Err(_) => {
                    skipped += 1;
                    continue;
                }
            };
            let target = table.get_or_insert_with(|| WordVectors::new(vector.len()));
            if !target.insert(word, vector) {
                skipped += 1;
            }
        }
        if skipped > 0 {
            tracing::warn!(skipped, "skipped malformed embedding lines");
        }
        let table = table.unwrap_or_default();
        tracing::info!(words = table.len(), dim = table.dim, "loaded word vectors");
        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("opening embeddings {}", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }
}

impl EmbeddingTable for WordVectors {
    fn dim(&self) -> usize { self.dim }
    fn lookup(&self, word: &str) -> Option<&[f32]> { self.vectors.get(word).map(Vec::as_slice) }
}

/// Mean of the vectors of the lowercase whitespace-separated words of `text`,
/// skipping unknown words. `None` if no word is known.
pub fn mean_vector(table: &dyn EmbeddingTable, text: &str) -> Option<Vec<f32>> {
    let mut sum = vec![0f32; table.dim()];
    let mut known = 0usize;
    for word in text.to_lowercase().split_whitespace() {
        if let Some(v) = table.lookup(word) {
            for (acc, x) in sum.iter_mut().zip(v) {
                *acc += x;
            }
            known += 1;
        }
    }
    if known == 0 {
        return None;
    }
    for acc in sum.iter_mut() {
        *acc /= known as f32;
    }
    Some(sum)
}

fn cosine_f32(a: &[f32], b: &[f32]) -> f64 {
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Precomputed document embeddings (title + description) for one index snapshot.
pub struct EmbeddingIndex {
    table: Box<dyn EmbeddingTable + Send + Sync>,
    doc_vectors: Vec<(DocId, Vec<f32>)>,
}

impl EmbeddingIndex {
    pub fn build<T>(table: T, index: &SearchIndex, corpus: &Corpus) -> Self
    where
        T: EmbeddingTable + Send + Sync + 'static,
    {
        let mut doc_vectors = Vec::new();
        for (doc_id, entry) in index.docs() {
            let Some(doc) = corpus.get(&entry.pid) else { continue };
            let text = match doc.description.as_deref() {
                Some(desc) => format!("{} {}", doc.title, desc),
                None => doc.title.clone(),
            };
            if let Some(v) = mean_vector(&table, &text) {
                doc_vectors.push((doc_id, v));
            }
        }
        tracing::info!(
            embedded = doc_vectors.len(),
            without_vector = index.num_docs() - doc_vectors.len(),
            "built document embeddings"
        );
        Self { table: Box::new(table), doc_vectors }
    }

    pub fn num_vectors(&self) -> usize { self.doc_vectors.len() }

    /// Cosine between the query's mean vector and every embedded document.
    /// Documents without a vector are never returned.
    pub fn rank(&self, index: &SearchIndex, query: &str) -> Vec<ScoredDoc> {
        let Some(query_vec) = mean_vector(self.table.as_ref(), query) else {
            return Vec::new();
        };
        let mut scored: Vec<ScoredDoc> = self
            .doc_vectors
            .iter()
            .map(|(doc_id, v)| ScoredDoc { doc_id: *doc_id, score: cosine_f32(&query_vec, v) })
            .collect();
        sort_scored(index, &mut scored);
        scored
    }
}
