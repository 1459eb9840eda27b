use thiserror::Error;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Debug, Error)]
pub enum RetrievalError {
    /// The query itself is unusable. Fatal to the call.
    #[error("invalid query: {0}")]
    Validation(String),
    #[error("could not decode embedding for chunk {}: {reason}", display_id(.chunk_id))]
    Decode {
        chunk_id: Option<i64>,
        reason: String,
    },
    #[error("chunk {} has no stored embedding", display_id(.chunk_id))]
    MissingEmbedding { chunk_id: Option<i64> },
    #[error("vector length mismatch: {expected} != {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RetrievalError {
    pub fn validation(msg: impl Into<String>) -> Self {
        RetrievalError::Validation(msg.into())
    }

    pub fn decode(chunk_id: Option<i64>, reason: impl std::fmt::Display) -> Self {
        RetrievalError::Decode {
            chunk_id,
            reason: reason.to_string(),
        }
    }

    /// Errors scoped to a single candidate. The selector drops the candidate
    /// and keeps going instead of failing the whole retrieval.
    pub fn is_candidate_error(&self) -> bool {
        matches!(
            self,
            RetrievalError::Decode { .. }
                | RetrievalError::MissingEmbedding { .. }
                | RetrievalError::DimensionMismatch { .. }
        )
    }
}

fn display_id(chunk_id: &Option<i64>) -> String {
    match chunk_id {
        Some(id) => id.to_string(),
        None => "<unknown>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_errors_are_classified() {
        assert!(RetrievalError::decode(Some(4), "bad json").is_candidate_error());
        assert!(RetrievalError::MissingEmbedding { chunk_id: None }.is_candidate_error());
        assert!(
            RetrievalError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
            .is_candidate_error()
        );
        assert!(!RetrievalError::validation("empty").is_candidate_error());
    }

    #[test]
    fn messages_name_the_chunk() {
        let err = RetrievalError::decode(Some(7), "trailing bytes");
        assert_eq!(
            err.to_string(),
            "could not decode embedding for chunk 7: trailing bytes"
        );
        let err = RetrievalError::MissingEmbedding { chunk_id: None };
        assert_eq!(err.to_string(), "chunk <unknown> has no stored embedding");
    }
}
