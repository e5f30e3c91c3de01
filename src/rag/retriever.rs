//! Query-time retrieval over the vector index.

use std::sync::Arc;

use super::error::Result;
use super::index::VectorIndex;
use super::models::RetrievalResult;

pub struct Retriever {
    index: Arc<VectorIndex>,
    default_top_k: usize,
}

impl Retriever {
    pub fn new(index: Arc<VectorIndex>, default_top_k: usize) -> Self {
        Self {
            index,
            default_top_k,
        }
    }

    pub fn default_top_k(&self) -> usize {
        self.default_top_k
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    /// Up to `top_k` records ranked by descending similarity to `query`.
    ///
    /// Records with equal similarity come back in insertion order.
    pub async fn search(&self, query: &str, top_k: usize) -> Result<Vec<RetrievalResult>> {
        let embedding = self.index.embed(query).await?;
        let results = self.index.query(&embedding, top_k)?;
        log::debug!(
            "Retrieved {} result(s) for query of {} chars (top_k = {})",
            results.len(),
            query.chars().count(),
            top_k
        );
        Ok(results)
    }

    /// [`Retriever::search`] with the configured default `top_k`.
    pub async fn search_default(&self, query: &str) -> Result<Vec<RetrievalResult>> {
        self.search(query, self.default_top_k).await
    }
}
