//! Local embedding provider used for ingestion and query vectors.

use std::hash::Hasher;

use lazy_static::lazy_static;
use regex::Regex;
use rustc_hash::{FxHashMap, FxHashSet, FxHasher};
use unicode_normalization::UnicodeNormalization;

use crate::error::{Result, RetrievalError};

pub const DEFAULT_DIMENSIONS: usize = 384;

/// Turns text into a fixed-length vector.
pub trait EmbeddingProvider: Send + Sync {
    fn dimensions(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vec<f64>>;
}

/// Bag-of-words embedder using the hashing trick.
///
/// Term frequencies are folded into `dimensions` buckets and L2-normalised, so
/// vectors are comparable without a shared vocabulary.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(RetrievalError::validation(
                "embedding dimensions must be at least 1",
            ));
        }
        Ok(Self { dimensions })
    }

    fn bucket(&self, token: &str) -> usize {
        let mut hasher = FxHasher::default();
        hasher.write(token.as_bytes());
        (hasher.finish() % self.dimensions as u64) as usize
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self {
            dimensions: DEFAULT_DIMENSIONS,
        }
    }
}

impl EmbeddingProvider for HashingEmbedder {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn embed(&self, text: &str) -> Result<Vec<f64>> {
        let tokens = tokenize(text);
        let mut vector = vec![0.0; self.dimensions];
        if tokens.is_empty() {
            return Ok(vector);
        }

        let mut term_freq: FxHashMap<&str, f64> = FxHashMap::default();
        for token in &tokens {
            *term_freq.entry(token.as_str()).or_insert(0.0) += 1.0;
        }

        let tokens_count = tokens.len() as f64;
        for (term, freq) in term_freq {
            vector[self.bucket(term)] += freq / tokens_count;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        Ok(vector)
    }
}

/// Lowercased, NFC-normalised word tokens with punctuation and stop words removed.
pub fn tokenize(text: &str) -> Vec<String> {
    lazy_static! {
        static ref STOP_WORDS: FxHashSet<&'static str> = {
            let words = vec![
                "a", "an", "and", "are", "as", "at", "be", "by", "for", "from",
                "has", "he", "in", "is", "it", "its", "of", "on", "that", "the",
                "to", "was", "were", "will", "with"
            ];
            words.into_iter().collect()
        };
        static ref PUNCTUATION: Regex = Regex::new(r"[^\w\s]").expect("valid punctuation regex");
    }

    let text = text.nfc().collect::<String>().to_lowercase();
    let text = PUNCTUATION.replace_all(&text, " ");

    text.split_whitespace()
        .filter(|&token| !STOP_WORDS.contains(token))
        .map(|token| token.to_string())
        .collect()
}
