//! Read-only access to the candidate chunk set.

use std::sync::Arc;

use crate::codec::StoredEmbedding;
use crate::error::Result;

/// A stored chunk together with its parent document metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkRecord {
    pub id: i64,
    pub document_id: i64,
    pub text: String,
    /// `None` when the chunk was stored without an embedding.
    pub embedding: Option<StoredEmbedding>,
    pub document_title: Option<String>,
    pub document_source: Option<String>,
}

impl ChunkRecord {
    pub fn new(id: i64, document_id: i64, text: impl Into<String>) -> Self {
        Self {
            id,
            document_id,
            text: text.into(),
            embedding: None,
            document_title: None,
            document_source: None,
        }
    }

    pub fn with_embedding(mut self, embedding: StoredEmbedding) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_document(mut self, title: impl Into<String>, source: impl Into<String>) -> Self {
        self.document_title = Some(title.into());
        self.document_source = Some(source.into());
        self
    }
}

/// Source of retrieval candidates.
///
/// Implementations return every stored chunk, in a stable order, on each call.
/// Any locking or connection handling needed to read the store lives here.
pub trait CorpusAccessor: Send + Sync {
    fn fetch_all_chunks(&self) -> Result<Vec<ChunkRecord>>;
}

impl<T: CorpusAccessor + ?Sized> CorpusAccessor for Arc<T> {
    fn fetch_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        (**self).fetch_all_chunks()
    }
}

impl<T: CorpusAccessor + ?Sized> CorpusAccessor for &T {
    fn fetch_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        (**self).fetch_all_chunks()
    }
}

/// Corpus held entirely in memory; enumeration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemoryCorpus {
    chunks: Vec<ChunkRecord>,
}

impl MemoryCorpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: ChunkRecord) {
        self.chunks.push(chunk);
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl FromIterator<ChunkRecord> for MemoryCorpus {
    fn from_iter<I: IntoIterator<Item = ChunkRecord>>(iter: I) -> Self {
        Self {
            chunks: iter.into_iter().collect(),
        }
    }
}

impl CorpusAccessor for MemoryCorpus {
    fn fetch_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        Ok(self.chunks.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_corpus_keeps_insertion_order() {
        let mut corpus = MemoryCorpus::new();
        corpus.push(ChunkRecord::new(3, 1, "third"));
        corpus.push(ChunkRecord::new(1, 1, "first"));
        let ids: Vec<i64> = corpus
            .fetch_all_chunks()
            .unwrap()
            .iter()
            .map(|chunk| chunk.id)
            .collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn shared_corpus_delegates() {
        let corpus: Arc<MemoryCorpus> = Arc::new(
            vec![ChunkRecord::new(1, 1, "a").with_document("Guide", "docs/guide.md")]
                .into_iter()
                .collect(),
        );
        let chunks = corpus.fetch_all_chunks().unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].document_title.as_deref(), Some("Guide"));
    }
}
