//! SQLite-backed chunk store.
//!
//! The `embedding` column is declared without a type so JSON text and packed
//! `f32` blobs can live side by side; the SQLite storage class of each value
//! decides how it is decoded.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, params};
use serde::Serialize;

use crate::codec::StoredEmbedding;
use crate::corpus::{ChunkRecord, CorpusAccessor};
use crate::error::{Result, RetrievalError};

const SCHEMA_SQL: &str = r"
CREATE TABLE IF NOT EXISTS documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT,
    source TEXT,
    created_at TEXT NOT NULL DEFAULT (STRFTIME('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES documents(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding
);
CREATE INDEX IF NOT EXISTS idx_chunks_document ON chunks(document_id);
";

/// Chunk counts reported by [`VectorDb::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub documents: u64,
    pub chunks: u64,
    pub chunks_without_embedding: u64,
}

/// A chunk waiting to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewChunk {
    pub content: String,
    pub embedding: Option<StoredEmbedding>,
}

pub struct VectorDb {
    conn: Mutex<Connection>,
}

impl VectorDb {
    /// Opens or creates the database at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Self::init(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", 1)?;
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        // A panic while holding the lock cannot leave a half-applied write:
        // every write runs inside a transaction.
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stores a document and its chunks atomically, returning the document id.
    pub fn add_document(&self, title: &str, source: &str, chunks: &[NewChunk]) -> Result<i64> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO documents (title, source) VALUES (?1, ?2)",
            params![title, source],
        )?;
        let document_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (document_id, chunk_index, content, embedding)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (index, chunk) in chunks.iter().enumerate() {
                let embedding = chunk.embedding.as_ref().map(to_sql_value);
                stmt.execute(params![document_id, index as i64, chunk.content, embedding])?;
            }
        }

        tx.commit()?;
        Ok(document_id)
    }

    pub fn stats(&self) -> Result<CorpusStats> {
        let conn = self.conn();
        let documents: i64 =
            conn.query_row("SELECT COUNT(*) FROM documents", [], |row| row.get(0))?;
        let (chunks, without): (i64, i64) = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(CASE WHEN embedding IS NULL
                                        OR LENGTH(embedding) = 0
                                        OR (TYPEOF(embedding) = 'text'
                                            AND TRIM(embedding, ' ' || char(9, 10, 11, 12, 13)) = '')
                                      THEN 1 ELSE 0 END), 0)
             FROM chunks",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(CorpusStats {
            documents: count_to_u64(documents)?,
            chunks: count_to_u64(chunks)?,
            chunks_without_embedding: count_to_u64(without)?,
        })
    }

    /// Removes every document and chunk.
    pub fn clear(&self) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks", [])?;
        tx.execute("DELETE FROM documents", [])?;
        tx.commit()?;
        Ok(())
    }
}

impl CorpusAccessor for VectorDb {
    fn fetch_all_chunks(&self) -> Result<Vec<ChunkRecord>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.document_id, c.content, c.embedding, d.title, d.source
             FROM chunks c
             JOIN documents d ON d.id = c.document_id
             ORDER BY c.id ASC",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok(ChunkRecord {
                id: row.get(0)?,
                document_id: row.get(1)?,
                text: row.get(2)?,
                embedding: stored_embedding(row.get_ref(3)?),
                document_title: row.get(4)?,
                document_source: row.get(5)?,
            })
        })?;

        let chunks = rows.collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chunks)
    }
}

fn to_sql_value(embedding: &StoredEmbedding) -> Value {
    match embedding {
        StoredEmbedding::Json(text) => Value::Text(text.clone()),
        StoredEmbedding::Binary(bytes) => Value::Blob(bytes.clone()),
    }
}

/// Maps the storage class of the embedding column onto the codec's variants.
///
/// Bare numbers are kept as their text form, which fails to decode as an array.
fn stored_embedding(value: ValueRef<'_>) -> Option<StoredEmbedding> {
    match value {
        ValueRef::Null => None,
        ValueRef::Text(text) => Some(StoredEmbedding::Json(
            String::from_utf8_lossy(text).into_owned(),
        )),
        ValueRef::Blob(bytes) => Some(StoredEmbedding::Binary(bytes.to_vec())),
        ValueRef::Integer(number) => Some(StoredEmbedding::Json(number.to_string())),
        ValueRef::Real(number) => Some(StoredEmbedding::Json(number.to_string())),
    }
}

fn count_to_u64(count: i64) -> Result<u64> {
    u64::try_from(count).map_err(|_| {
        RetrievalError::Storage(rusqlite::Error::IntegralValueOutOfRange(0, count))
    })
}
