use tracing::{debug, info};

use crate::codec::EmbeddingEncoding;
use crate::embedder::EmbeddingProvider;
use crate::error::Result;
use crate::utils::{SourceDocument, split_into_chunks};
use crate::vector_db::{NewChunk, VectorDb};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub documents: usize,
    pub chunks: usize,
}

/// Chunks, embeds and stores documents.
pub struct Ingestor<'a, E> {
    db: &'a VectorDb,
    embedder: &'a E,
    encoding: EmbeddingEncoding,
    max_chunk_chars: usize,
}

impl<'a, E: EmbeddingProvider> Ingestor<'a, E> {
    pub fn new(
        db: &'a VectorDb,
        embedder: &'a E,
        encoding: EmbeddingEncoding,
        max_chunk_chars: usize,
    ) -> Self {
        Self {
            db,
            embedder,
            encoding,
            max_chunk_chars,
        }
    }

    pub fn ingest(&self, documents: &[SourceDocument]) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for document in documents {
            let chunks = split_into_chunks(&document.content, self.max_chunk_chars)
                .into_iter()
                .map(|content| {
                    let vector = self.embedder.embed(&content)?;
                    Ok(NewChunk {
                        embedding: Some(self.encoding.encode(&vector)),
                        content,
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            let document_id = self
                .db
                .add_document(&document.title, &document.source, &chunks)?;
            debug!(
                document_id,
                source = %document.source,
                chunks = chunks.len(),
                "stored document"
            );

            report.documents += 1;
            report.chunks += chunks.len();
        }

        info!(
            documents = report.documents,
            chunks = report.chunks,
            "ingestion finished"
        );
        Ok(report)
    }
}
