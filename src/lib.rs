//! Vector similarity retrieval over a chunked document corpus.
//!
//! A [`Retriever`] reads every candidate chunk from a [`CorpusAccessor`],
//! decodes its stored embedding, scores it by cosine similarity against the
//! query vector and keeps the best `k`. Chunks with unusable embeddings are
//! skipped and reported; only an invalid query fails the call.

pub mod codec;
pub mod config;
pub mod corpus;
pub mod embedder;
pub mod error;
pub mod ingest;
pub mod retriever;
pub mod selector;
pub mod similarity;
pub mod telemetry;
pub mod utils;
pub mod vector_db;

pub use codec::{EmbeddingEncoding, StoredEmbedding};
pub use corpus::{ChunkRecord, CorpusAccessor, MemoryCorpus};
pub use embedder::{EmbeddingProvider, HashingEmbedder};
pub use error::{Result, RetrievalError};
pub use retriever::Retriever;
pub use selector::{RetrievalOptions, ScoredCandidate, Selection, SkippedCandidate, select_top_k};
pub use similarity::cosine_similarity;
pub use vector_db::{CorpusStats, VectorDb};
