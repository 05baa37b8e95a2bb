pub mod config;
pub mod document;
pub mod embedding;
pub mod engine;
pub mod eval;
pub mod index;
pub mod persist;
pub mod rank;
pub mod tokenizer;

pub use config::NormalizerOptions;
pub use document::{parse_numeric, Corpus, ProcessedDocument, RawDocument};
pub use embedding::{EmbeddingIndex, EmbeddingTable, WordVectors};
pub use engine::{EngineHandle, SearchEngine, SearchHit};
pub use index::{build_index, DocEntry, DocId, Posting, SearchIndex, TermEntry, TermId};
pub use rank::{BlendTarget, RankError, RankMethod, ScoredDoc};
