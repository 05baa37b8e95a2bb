use crate::config::NormalizerOptions;
use crate::document::Corpus;
use crate::embedding::EmbeddingIndex;
use crate::index::SearchIndex;
use crate::rank::{rank_blended, rank_bm25, rank_rating_boost, rank_tfidf, RankError, RankMethod, ScoredDoc};
use crate::tokenizer::normalize_with;
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub pid: String,
    pub title: String,
    pub score: f64,
}

/// Read-only search state: one index snapshot plus optional embeddings.
pub struct SearchEngine {
    index: Arc<SearchIndex>,
    options: NormalizerOptions,
    embeddings: Option<Arc<EmbeddingIndex>>,
}

impl SearchEngine {
    pub fn new(index: Arc<SearchIndex>, options: NormalizerOptions) -> Self {
        Self { index, options, embeddings: None }
    }

    pub fn with_embeddings(mut self, embeddings: Arc<EmbeddingIndex>) -> Self {
        self.embeddings = Some(embeddings);
        self
    }

    pub fn index(&self) -> &SearchIndex { &self.index }
    pub fn options(&self) -> NormalizerOptions { self.options }

    pub fn supports(&self, method: RankMethod) -> bool {
        !matches!(method, RankMethod::Embedding) || self.embeddings.is_some()
    }

    /// Rank with exactly `method`, reporting failures instead of recovering.
    pub fn rank(&self, query: &str, corpus: &Corpus, method: RankMethod) -> Result<Vec<ScoredDoc>, RankError> {
        let terms = normalize_with(query, self.options);
        tracing::debug!(query, ?terms, %method, "ranking query");
        match method {
            RankMethod::TfIdf => Ok(rank_tfidf(&self.index, &terms)),
            RankMethod::Bm25 => rank_bm25(&self.index, &terms),
            RankMethod::Custom => Ok(rank_rating_boost(&self.index, &terms, corpus)),
            RankMethod::Blended(target) => Ok(rank_blended(&self.index, &terms, corpus, target)),
            RankMethod::Embedding => match &self.embeddings {
                Some(embeddings) => Ok(embeddings.rank(&self.index, query)),
                None => Err(RankError::EmbeddingsUnavailable),
            },
        }
    }

    /// Rank with `method`; any failure is logged and answered with TF-IDF cosine.
    pub fn rank_or_fallback(&self, query: &str, corpus: &Corpus, method: RankMethod) -> Vec<ScoredDoc> {
        match self.rank(query, corpus, method) {
            Ok(ranked) => ranked,
            Err(err) => {
                tracing::warn!(%err, %method, "ranking failed, falling back to tfidf");
                rank_tfidf(&self.index, &normalize_with(query, self.options))
            }
        }
    }

    /// Top `top_n` pids for `query`.
    pub fn search(&self, query: &str, corpus: &Corpus, method: RankMethod, top_n: usize) -> Vec<String> {
        self.rank_or_fallback(query, corpus, method)
            .into_iter()
            .take(top_n)
            .filter_map(|hit| self.index.pid(hit.doc_id).map(str::to_string))
            .collect()
    }

    pub fn search_hits(&self, query: &str, corpus: &Corpus, method: RankMethod, top_n: usize) -> Vec<SearchHit> {
        self.rank_or_fallback(query, corpus, method)
            .into_iter()
            .take(top_n)
            .filter_map(|hit| {
                let doc = self.index.doc(hit.doc_id)?;
                Some(SearchHit { pid: doc.pid.clone(), title: doc.title.clone(), score: hit.score })
            })
            .collect()
    }
}

/// Shared pointer to the live engine. Readers clone a snapshot; a rebuilt
/// engine replaces it in one step without disturbing in-flight queries.
pub struct EngineHandle {
    current: RwLock<Arc<SearchEngine>>,
}

impl EngineHandle {
    pub fn new(engine: SearchEngine) -> Self {
        Self { current: RwLock::new(Arc::new(engine)) }
    }

    pub fn snapshot(&self) -> Arc<SearchEngine> { self.current.read().clone() }

    /// Install `engine`, returning the one it replaced.
    pub fn swap(&self, engine: SearchEngine) -> Arc<SearchEngine> {
        let next = Arc::new(engine);
        let prev = std::mem::replace(&mut *self.current.write(), next);
        tracing::info!(num_docs = self.current.read().index().num_docs(), "swapped search engine");
        prev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{process_all, RawDocument};
    use crate::embedding::WordVectors;
    use crate::index::build_index;

    fn corpus() -> (Vec<RawDocument>, Corpus) {
        let docs = vec![
            RawDocument { pid: "D1".into(), title: "red cotton shirt".into(), ..Default::default() },
            RawDocument { pid: "D2".into(), title: "blue cotton shirt".into(), ..Default::default() },
            RawDocument { pid: "D3".into(), title: "red silk dress".into(), ..Default::default() },
        ];
        let map = docs.iter().cloned().map(|d| (d.pid.clone(), d)).collect();
        (docs, map)
    }

    fn engine(docs: Vec<RawDocument>) -> SearchEngine {
        let options = NormalizerOptions::default();
        let index = build_index(&process_all(docs, options));
        SearchEngine::new(Arc::new(index), options)
    }

    #[test]
    fn embedding_without_table_falls_back() {
        let (docs, map) = corpus();
        let engine = engine(docs);
        assert!(!engine.supports(RankMethod::Embedding));
        assert_eq!(engine.rank("red cotton", &map, RankMethod::Embedding), Err(RankError::EmbeddingsUnavailable));
        assert_eq!(engine.search("red cotton", &map, RankMethod::Embedding, 10), vec!["D1"]);
    }

    #[test]
    fn embedding_ranks_by_mean_vector() {
        let (docs, map) = corpus();
        let engine = engine(docs);
        let mut table = WordVectors::new(2);
        table.insert("red", vec![1.0, 0.0]);
        table.insert("blue", vec![0.0, 1.0]);
        let embeddings = EmbeddingIndex::build(table, engine.index(), &map);
        let engine = engine.with_embeddings(Arc::new(embeddings));
        let ranked = engine.search("blue", &map, RankMethod::Embedding, 10);
        assert_eq!(ranked, vec!["D2", "D1", "D3"]);
    }

    #[test]
    fn bm25_failure_falls_back_to_tfidf() {
        let (docs, map) = corpus();
        let options = NormalizerOptions::default();
        let mut index = build_index(&process_all(docs, options));
        index.term_mut("red").unwrap().idf = f64::NAN;
        let engine = SearchEngine::new(Arc::new(index), options);

        assert!(engine.rank("red shirt", &map, RankMethod::Bm25).is_err());
        let fallback = engine.search("red shirt", &map, RankMethod::Bm25, 10);
        assert_eq!(fallback, engine.search("red shirt", &map, RankMethod::TfIdf, 10));
        assert_eq!(fallback, vec!["D1"]);

        let mut index = build_index(&process_all(corpus().0, options));
        for doc_id in 0..3 {
            index.doc_mut(doc_id).unwrap().length = 0;
        }
        let engine = SearchEngine::new(Arc::new(index), options);
        assert_eq!(engine.rank("shirt", &map, RankMethod::Bm25), Err(RankError::DegenerateLength));
        assert_eq!(engine.search("shirt", &map, RankMethod::Bm25, 10), vec!["D1", "D2"]);
    }

    #[test]
    fn top_n_truncates() {
        let (docs, map) = corpus();
        let engine = engine(docs);
        assert_eq!(engine.search("shirt", &map, RankMethod::TfIdf, 1).len(), 1);
        assert!(engine.search("shirt", &map, RankMethod::TfIdf, 0).is_empty());
    }

    #[test]
    fn swap_replaces_engine_but_keeps_old_snapshots() {
        let (docs, map) = corpus();
        let handle = EngineHandle::new(engine(docs.clone()));
        let before = handle.snapshot();
        handle.swap(engine(docs[..1].to_vec()));
        assert_eq!(before.index().num_docs(), 3);
        assert_eq!(handle.snapshot().index().num_docs(), 1);
        assert!(handle.snapshot().search("blue", &map, RankMethod::TfIdf, 10).is_empty());
    }
}
