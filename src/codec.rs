//! Conversion between persisted embeddings and in-memory vectors.
//!
//! Two on-disk encodings are understood: a JSON array of numbers stored as
//! text, and a packed little-endian `f32` blob. The variant is fixed at the
//! storage boundary, so decoding is a plain match.

use serde::{Deserialize, Serialize};

use crate::error::{Result, RetrievalError};

const F32_WIDTH: usize = std::mem::size_of::<f32>();

/// Persisted form of an embedding vector.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredEmbedding {
    Json(String),
    Binary(Vec<u8>),
}

/// Encoding used when writing new embeddings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingEncoding {
    Json,
    #[default]
    Binary,
}

impl EmbeddingEncoding {
    pub fn encode(self, vector: &[f64]) -> StoredEmbedding {
        match self {
            EmbeddingEncoding::Json => StoredEmbedding::json(vector),
            EmbeddingEncoding::Binary => StoredEmbedding::binary(vector),
        }
    }
}

impl std::str::FromStr for EmbeddingEncoding {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(EmbeddingEncoding::Json),
            "binary" | "blob" => Ok(EmbeddingEncoding::Binary),
            other => Err(format!("unknown embedding encoding `{other}`")),
        }
    }
}

impl StoredEmbedding {
    pub fn json(vector: &[f64]) -> Self {
        // Serializing a slice of floats cannot fail; non-finite values become `null`
        // and are rejected again on decode.
        let text = serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string());
        StoredEmbedding::Json(text)
    }

    /// Packs the vector as little-endian `f32`, narrowing each component.
    pub fn binary(vector: &[f64]) -> Self {
        let bytes = vector
            .iter()
            .flat_map(|value| (*value as f32).to_le_bytes())
            .collect();
        StoredEmbedding::Binary(bytes)
    }

    /// Empty text or an empty blob carries no vector at all.
    pub fn is_empty(&self) -> bool {
        match self {
            StoredEmbedding::Json(text) => text.trim().is_empty(),
            StoredEmbedding::Binary(bytes) => bytes.is_empty(),
        }
    }

    pub fn decode(&self, chunk_id: Option<i64>) -> Result<Vec<f64>> {
        if self.is_empty() {
            return Err(RetrievalError::MissingEmbedding { chunk_id });
        }

        let vector = match self {
            StoredEmbedding::Json(text) => decode_json(text, chunk_id)?,
            StoredEmbedding::Binary(bytes) => decode_binary(bytes, chunk_id)?,
        };

        if let Some(position) = vector.iter().position(|value| !value.is_finite()) {
            return Err(RetrievalError::decode(
                chunk_id,
                format!("component {position} is not a finite number"),
            ));
        }
        Ok(vector)
    }
}

/// Decodes an optional stored embedding; absence is reported separately from
/// malformed data.
pub fn decode_embedding(
    stored: Option<&StoredEmbedding>,
    chunk_id: Option<i64>,
) -> Result<Vec<f64>> {
    match stored {
        Some(embedding) => embedding.decode(chunk_id),
        None => Err(RetrievalError::MissingEmbedding { chunk_id }),
    }
}

fn decode_json(text: &str, chunk_id: Option<i64>) -> Result<Vec<f64>> {
    serde_json::from_str::<Vec<f64>>(text.trim())
        .map_err(|err| RetrievalError::decode(chunk_id, err))
}

fn decode_binary(bytes: &[u8], chunk_id: Option<i64>) -> Result<Vec<f64>> {
    if bytes.len() % F32_WIDTH != 0 {
        return Err(RetrievalError::decode(
            chunk_id,
            format!(
                "blob length {} is not a multiple of {F32_WIDTH}",
                bytes.len()
            ),
        ));
    }

    Ok(bytes
        .chunks_exact(F32_WIDTH)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_json_text() {
        let stored = StoredEmbedding::Json("[0.5, -1, 2.25]".to_string());
        assert_eq!(stored.decode(Some(1)).unwrap(), vec![0.5, -1.0, 2.25]);
    }

    #[test]
    fn decodes_little_endian_blob() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1.5f32.to_le_bytes());
        bytes.extend_from_slice(&(-0.25f32).to_le_bytes());
        let stored = StoredEmbedding::Binary(bytes);
        assert_eq!(stored.decode(Some(1)).unwrap(), vec![1.5, -0.25]);
    }

    #[test]
    fn binary_encoding_narrows_to_f32() {
        let stored = EmbeddingEncoding::Binary.encode(&[1.0, 0.1]);
        let StoredEmbedding::Binary(bytes) = &stored else {
            panic!("expected a blob");
        };
        assert_eq!(bytes.len(), 8);
        let decoded = stored.decode(None).unwrap();
        assert_eq!(decoded[0], 1.0);
        assert!((decoded[1] - 0.1).abs() < 1e-6);
    }

    #[test]
    fn json_encoding_is_a_text_array() {
        let stored = EmbeddingEncoding::Json.encode(&[1.0, 0.5]);
        assert_eq!(stored, StoredEmbedding::Json("[1.0,0.5]".to_string()));
    }

    #[test]
    fn malformed_json_reports_chunk_id() {
        let stored = StoredEmbedding::Json("[1.0, oops]".to_string());
        match stored.decode(Some(42)) {
            Err(RetrievalError::Decode { chunk_id, .. }) => assert_eq!(chunk_id, Some(42)),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn json_object_is_not_a_vector() {
        let stored = StoredEmbedding::Json(r#"{"values": [1, 2]}"#.to_string());
        assert!(matches!(
            stored.decode(Some(3)),
            Err(RetrievalError::Decode { .. })
        ));
    }

    #[test]
    fn ragged_blob_is_rejected() {
        let stored = StoredEmbedding::Binary(vec![0, 0, 128, 63, 1]);
        assert!(matches!(
            stored.decode(Some(5)),
            Err(RetrievalError::Decode { chunk_id: Some(5), .. })
        ));
    }

    #[test]
    fn non_finite_blob_component_is_rejected() {
        let stored = StoredEmbedding::Binary(f32::NAN.to_le_bytes().to_vec());
        assert!(matches!(
            stored.decode(Some(9)),
            Err(RetrievalError::Decode { .. })
        ));
    }

    #[test]
    fn absent_and_empty_values_are_missing() {
        assert!(matches!(
            decode_embedding(None, Some(2)),
            Err(RetrievalError::MissingEmbedding { chunk_id: Some(2) })
        ));
        assert!(matches!(
            StoredEmbedding::Json("  ".to_string()).decode(Some(2)),
            Err(RetrievalError::MissingEmbedding { .. })
        ));
        assert!(matches!(
            StoredEmbedding::Binary(Vec::new()).decode(Some(2)),
            Err(RetrievalError::MissingEmbedding { .. })
        ));
    }

    #[test]
    fn encoding_names_parse() {
        assert_eq!("JSON".parse::<EmbeddingEncoding>(), Ok(EmbeddingEncoding::Json));
        assert_eq!("blob".parse::<EmbeddingEncoding>(), Ok(EmbeddingEncoding::Binary));
        assert!("yaml".parse::<EmbeddingEncoding>().is_err());
    }
}
