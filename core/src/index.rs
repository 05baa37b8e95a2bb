use crate::config::round_score;
use anyhow::{bail, Result};
use crate::document::ProcessedDocument;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type TermId = u32;
pub type DocId = u32;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocEntry {
    pub pid: String,
    pub title: String,
    /// Number of tokens in the document's search text.
    pub length: u32,
}

/// One document's occurrences of a term. Positions live in the index-wide
/// arena; `start..start + count` addresses them.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    start: u32,
    count: u32,
}

impl Posting {
    /// Raw number of occurrences of the term in this document.
    pub fn freq(&self) -> u32 { self.count }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TermEntry {
    /// Sorted by doc id (document processing order).
    pub postings: Vec<Posting>,
    /// L2-normalized term frequency, aligned with `postings`.
    pub tf: Vec<f64>,
    pub df: u32,
    pub idf: f64,
}

impl TermEntry {
    /// Slot of `doc_id` in this term's postings, if the document contains the term.
    pub fn slot_of(&self, doc_id: DocId) -> Option<usize> {
        self.postings.binary_search_by_key(&doc_id, |p| p.doc_id).ok()
    }
}

/// Immutable inverted index over one corpus snapshot.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct SearchIndex {
    dictionary: HashMap<String, TermId>,
    terms: Vec<TermEntry>,
    positions: Vec<u32>,
    docs: Vec<DocEntry>,
    doc_ids: HashMap<String, DocId>,
}

impl SearchIndex {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> usize { self.docs.len() }
    pub fn num_terms(&self) -> usize { self.terms.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn term(&self, term: &str) -> Option<&TermEntry> {
        self.dictionary.get(term).map(|&id| &self.terms[id as usize])
    }

    pub fn contains_term(&self, term: &str) -> bool { self.dictionary.contains_key(term) }

    /// Every (term, entry) pair; iteration order is unspecified.
    pub fn terms(&self) -> impl Iterator<Item = (&str, &TermEntry)> + '_ {
        self.dictionary.iter().map(move |(t, &id)| (t.as_str(), &self.terms[id as usize]))
    }

    /// Sorted token positions of a posting within its document's search text.
    pub fn positions(&self, posting: &Posting) -> &[u32] {
        let start = posting.start as usize;
        &self.positions[start..start + posting.count as usize]
    }

    pub fn doc(&self, doc_id: DocId) -> Option<&DocEntry> { self.docs.get(doc_id as usize) }

    pub fn docs(&self) -> impl Iterator<Item = (DocId, &DocEntry)> + '_ {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }

    pub fn doc_id(&self, pid: &str) -> Option<DocId> { self.doc_ids.get(pid).copied() }

    pub fn pid(&self, doc_id: DocId) -> Option<&str> { self.doc(doc_id).map(|d| d.pid.as_str()) }

    pub fn title(&self, pid: &str) -> Option<&str> {
        self.doc_id(pid).and_then(|id| self.doc(id)).map(|d| d.title.as_str())
    }

    /// Mean token count over documents that appear in at least one posting list.
    pub fn average_doc_length(&self) -> f64 {
        let (count, total) = self
            .docs
            .iter()
            .filter(|d| d.length > 0)
            .fold((0u64, 0u64), |(c, t), d| (c + 1, t + d.length as u64));
        if count == 0 { 0.0 } else { total as f64 / count as f64 }
    }

    /// Check the cross-table invariants lookups rely on. A decoded bundle must
    /// pass before it is searched.
    pub fn validate(&self) -> Result<()> {
        if self.dictionary.len() != self.terms.len() {
            bail!("dictionary has {} terms, term table has {}", self.dictionary.len(), self.terms.len());
        }
        if self.doc_ids.len() != self.docs.len() {
            bail!("pid map has {} entries, document table has {}", self.doc_ids.len(), self.docs.len());
        }
        for (pid, &doc_id) in &self.doc_ids {
            match self.docs.get(doc_id as usize) {
                Some(doc) if doc.pid == *pid => {}
                _ => bail!("pid '{pid}' maps to document {doc_id}, which does not carry it"),
            }
        }
        for (term, &term_id) in &self.dictionary {
            let Some(entry) = self.terms.get(term_id as usize) else {
                bail!("term '{term}' has id {term_id} outside the term table");
            };
            if entry.tf.len() != entry.postings.len() || entry.postings.len() != entry.df as usize {
                bail!(
                    "term '{term}': {} postings, {} tf values, df {}",
                    entry.postings.len(),
                    entry.tf.len(),
                    entry.df
                );
            }
            if !entry.postings.windows(2).all(|w| w[0].doc_id < w[1].doc_id) {
                bail!("term '{term}': postings are not sorted by document");
            }
            for posting in &entry.postings {
                if posting.doc_id as usize >= self.docs.len() {
                    bail!("term '{term}': posting for unknown document {}", posting.doc_id);
                }
                let end = posting.start as u64 + posting.count as u64;
                if end > self.positions.len() as u64 {
                    bail!("term '{term}': positions {}..{end} exceed arena of {}", posting.start, self.positions.len());
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
impl SearchIndex {
    pub(crate) fn term_mut(&mut self, term: &str) -> Option<&mut TermEntry> {
        let id = *self.dictionary.get(term)?;
        self.terms.get_mut(id as usize)
    }

    pub(crate) fn doc_mut(&mut self, doc_id: DocId) -> Option<&mut DocEntry> {
        self.docs.get_mut(doc_id as usize)
    }
}

/// Build the inverted index, TF/DF/IDF tables and title lookup in one pass
/// over `documents`, in order.
pub fn build_index(documents: &[ProcessedDocument]) -> SearchIndex {
    let mut index = SearchIndex::new();

    for doc in documents {
        if index.doc_ids.contains_key(doc.pid()) {
            tracing::warn!(pid = doc.pid(), "duplicate pid, skipping document");
            continue;
        }
        let doc_id = index.docs.len() as DocId;
        index.doc_ids.insert(doc.pid().to_string(), doc_id);
        index.docs.push(DocEntry {
            pid: doc.pid().to_string(),
            title: doc.title().to_string(),
            length: doc.search_text.len() as u32,
        });

        // Group positions by term, keeping first-occurrence order so term ids are reproducible.
        let mut slots: HashMap<&str, usize> = HashMap::new();
        let mut grouped: Vec<(&str, Vec<u32>)> = Vec::new();
        for (pos, term) in doc.search_text.iter().enumerate() {
            let slot = *slots.entry(term.as_str()).or_insert_with(|| {
                grouped.push((term.as_str(), Vec::new()));
                grouped.len() - 1
            });
            grouped[slot].1.push(pos as u32);
        }

        let norm = grouped.iter().map(|(_, p)| (p.len() as f64).powi(2)).sum::<f64>().sqrt();

        for (term, positions) in grouped {
            let count = positions.len();
            let tf = if norm > 0.0 { round_score(count as f64 / norm) } else { 0.0 };
            let term_id = match index.dictionary.get(term) {
                Some(&id) => id,
                None => {
                    let id = index.terms.len() as TermId;
                    index.dictionary.insert(term.to_string(), id);
                    index.terms.push(TermEntry::default());
                    id
                }
            };
            let start = index.positions.len() as u32;
            index.positions.extend(positions);
            let entry = &mut index.terms[term_id as usize];
            entry.postings.push(Posting { doc_id, start, count: count as u32 });
            entry.tf.push(tf);
            entry.df += 1;
        }
    }

    let n = index.docs.len() as f64;
    for entry in index.terms.iter_mut() {
        if entry.df > 0 {
            entry.idf = round_score((n / entry.df as f64).ln());
        }
    }

    tracing::info!(num_docs = index.num_docs(), num_terms = index.num_terms(), "built inverted index");
    index
}
