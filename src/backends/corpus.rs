//! Retrieval corpus
//!
//! Shared by the Document and WebAccess tabs: source texts are split into
//! overlapping chunks and the most query-relevant chunks are selected by
//! term overlap. No embedding index is built; bounding the context this
//! way keeps the heavy lifting in the external model service.

use std::collections::HashSet;

/// Characters per chunk
pub const CHUNK_SIZE: usize = 1000;
/// Characters of overlap between consecutive chunks
pub const CHUNK_OVERLAP: usize = 200;
/// Chunks handed to the model per query
pub const TOP_K: usize = 2;

/// One source text and its display label (URL or filename)
#[derive(Debug, Clone)]
pub struct SourceDoc {
    /// Label shown in source references
    pub label: String,
    /// Full extracted text
    pub text: String,
}

/// A chunk of a source document
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Label of the source this chunk came from
    pub label: String,
    /// Chunk text
    pub text: String,
}

/// Chunked corpus built from a set of source documents
#[derive(Debug, Clone)]
pub struct Corpus {
    chunks: Vec<Chunk>,
}

impl Corpus {
    /// Split the given documents into overlapping chunks
    pub fn build(docs: Vec<SourceDoc>) -> Self {
        let mut chunks = Vec::new();
        for doc in docs {
            for text in split_chunks(&doc.text) {
                chunks.push(Chunk {
                    label: doc.label.clone(),
                    text,
                });
            }
        }
        Self { chunks }
    }

    /// Select up to `k` chunks most relevant to the query
    ///
    /// Relevance is the count of shared terms. When nothing overlaps the
    /// first chunks are returned so an answer is still attempted.
    pub fn select(&self, query: &str, k: usize) -> Vec<&Chunk> {
        let query_terms = terms(query);
        let mut scored: Vec<(usize, &Chunk)> = self
            .chunks
            .iter()
            .map(|chunk| {
                let chunk_terms = terms(&chunk.text);
                let score = query_terms.intersection(&chunk_terms).count();
                (score, chunk)
            })
            .collect();
        // Stable sort keeps document order among ties
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().take(k).map(|(_, chunk)| chunk).collect()
    }

    /// Number of chunks in the corpus
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the corpus holds no chunks
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// Split text into overlapping chunks on character boundaries
fn split_chunks(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return Vec::new();
    }
    let step = CHUNK_SIZE - CHUNK_OVERLAP;
    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + CHUNK_SIZE).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}

/// Lowercased alphanumeric terms of length > 2
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2)
        .map(|w| w.to_lowercase())
        .collect()
}
