use tracing::{debug, instrument};

use crate::corpus::CorpusAccessor;
use crate::error::Result;
use crate::selector::{RetrievalOptions, ScoredCandidate, Selection, select_top_k, validate_query};

/// Linear-scan retrieval over a corpus.
///
/// Every call re-reads the full candidate set, so freshly stored chunks are
/// visible immediately. The engine holds no state besides its corpus handle.
pub struct Retriever<C> {
    corpus: C,
}

impl<C: CorpusAccessor> Retriever<C> {
    pub fn new(corpus: C) -> Self {
        Retriever { corpus }
    }

    pub fn corpus(&self) -> &C {
        &self.corpus
    }

    /// Returns the best `options.k` chunks for `query`, similarity descending.
    pub fn retrieve(
        &self,
        query: &[f64],
        options: &RetrievalOptions,
    ) -> Result<Vec<ScoredCandidate>> {
        self.retrieve_with_report(query, options)
            .map(|selection| selection.results)
    }

    /// Like [`Retriever::retrieve`], also reporting which candidates were skipped.
    #[instrument(level = "debug", skip_all, fields(k = options.k, dims = query.len()))]
    pub fn retrieve_with_report(
        &self,
        query: &[f64],
        options: &RetrievalOptions,
    ) -> Result<Selection> {
        // Checked before the corpus is read.
        validate_query(query)?;
        options.validate()?;

        let candidates = self.corpus.fetch_all_chunks()?;
        debug!(candidates = candidates.len(), "fetched corpus");

        select_top_k(query, &candidates, options)
    }
}
