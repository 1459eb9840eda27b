//! Ranking of candidate chunks against a query vector.

use serde::Serialize;
use tracing::{debug, warn};

use crate::codec::decode_embedding;
use crate::corpus::ChunkRecord;
use crate::error::{Result, RetrievalError};
use crate::similarity::cosine_similarity;

pub const DEFAULT_TOP_K: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalOptions {
    pub k: usize,
    /// Candidates scoring strictly below this are dropped. `None` keeps everything.
    pub min_similarity: Option<f64>,
}

impl Default for RetrievalOptions {
    fn default() -> Self {
        Self {
            k: DEFAULT_TOP_K,
            min_similarity: None,
        }
    }
}

impl RetrievalOptions {
    pub fn top_k(k: usize) -> Self {
        Self {
            k,
            ..Self::default()
        }
    }

    pub fn with_min_similarity(mut self, threshold: f64) -> Self {
        self.min_similarity = Some(threshold);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(RetrievalError::validation("k must be at least 1"));
        }
        if let Some(threshold) = self.min_similarity {
            if !threshold.is_finite() {
                return Err(RetrievalError::validation(
                    "min_similarity must be a finite number",
                ));
            }
        }
        Ok(())
    }
}

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredCandidate {
    pub id: i64,
    pub document_id: i64,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_source: Option<String>,
    pub similarity: f64,
}

impl ScoredCandidate {
    fn from_record(record: &ChunkRecord, similarity: f64) -> Self {
        Self {
            id: record.id,
            document_id: record.document_id,
            text: record.text.clone(),
            document_title: record.document_title.clone(),
            document_source: record.document_source.clone(),
            similarity,
        }
    }
}

/// A candidate left out of the ranking because its stored vector was unusable.
#[derive(Debug)]
pub struct SkippedCandidate {
    pub chunk_id: i64,
    pub error: RetrievalError,
}

/// Outcome of one selection pass.
#[derive(Debug, Default)]
pub struct Selection {
    /// Best candidates, similarity descending.
    pub results: Vec<ScoredCandidate>,
    pub skipped: Vec<SkippedCandidate>,
    considered: usize,
}

impl Selection {
    /// Number of candidates scanned, including skipped ones.
    pub fn considered(&self) -> usize {
        self.considered
    }
}

/// Rejects a query vector that would make every comparison meaningless.
pub fn validate_query(query: &[f64]) -> Result<()> {
    if query.is_empty() {
        return Err(RetrievalError::validation("query vector is empty"));
    }
    if let Some(position) = query.iter().position(|value| !value.is_finite()) {
        return Err(RetrievalError::validation(format!(
            "query vector component {position} is not a finite number"
        )));
    }
    Ok(())
}

/// Scores every candidate against `query` and keeps the best `options.k`.
///
/// Candidates whose embedding is missing, malformed, or of the wrong length are
/// reported in [`Selection::skipped`] and never abort the pass. Equal scores
/// keep their input order.
pub fn select_top_k(
    query: &[f64],
    candidates: &[ChunkRecord],
    options: &RetrievalOptions,
) -> Result<Selection> {
    validate_query(query)?;
    options.validate()?;

    let mut scored = Vec::with_capacity(candidates.len());
    let mut skipped = Vec::new();

    for record in candidates {
        let outcome = decode_embedding(record.embedding.as_ref(), Some(record.id))
            .and_then(|vector| cosine_similarity(query, &vector));

        match outcome {
            Ok(similarity) => {
                if options
                    .min_similarity
                    .is_some_and(|threshold| similarity < threshold)
                {
                    continue;
                }
                scored.push((similarity, record));
            }
            Err(error) => {
                warn!(chunk_id = record.id, %error, "skipping retrieval candidate");
                skipped.push(SkippedCandidate {
                    chunk_id: record.id,
                    error,
                });
            }
        }
    }

    // `sort_by` is stable, so ties stay in enumeration order.
    scored.sort_by(|left, right| right.0.total_cmp(&left.0));
    scored.truncate(options.k);

    debug!(
        considered = candidates.len(),
        skipped = skipped.len(),
        returned = scored.len(),
        "top-k selection finished"
    );

    Ok(Selection {
        results: scored
            .into_iter()
            .map(|(similarity, record)| ScoredCandidate::from_record(record, similarity))
            .collect(),
        skipped,
        considered: candidates.len(),
    })
}
