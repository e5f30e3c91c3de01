//! Vector index: the embed-and-store write path over a persistent collection.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use uuid::Uuid;

use super::collection::{self, Collection};
use super::embedder::Embedder;
use super::error::{EmbeddingError, RagError, Result};
use super::models::{Chunk, IndexRecord, RetrievalResult};
use crate::config::{EmbeddingConfig, StoreConfig};

/// Owns the persisted collection; all writes go through here.
///
/// Embeddings are computed concurrently, writes are serialized behind a
/// mutex that is never held across an `.await`.
pub struct VectorIndex {
    collection: Mutex<Collection>,
    embedder: Arc<dyn Embedder>,
    concurrency: usize,
    timeout: Duration,
}

impl VectorIndex {
    pub fn new(
        collection: Collection,
        embedder: Arc<dyn Embedder>,
        concurrency: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            collection: Mutex::new(collection),
            embedder,
            concurrency: concurrency.max(1),
            timeout,
        }
    }

    /// Open the configured collection, creating it if needed.
    pub fn open(
        store: &StoreConfig,
        embedding: &EmbeddingConfig,
        embedder: Arc<dyn Embedder>,
    ) -> collection::Result<Self> {
        let collection = Collection::open(&store.path, &store.collection)?;
        Ok(Self::new(
            collection,
            embedder,
            embedding.concurrency,
            embedding.deadline(),
        ))
    }

    fn lock(&self) -> MutexGuard<'_, Collection> {
        // A panic mid-write leaves SQLite's transaction rolled back, so the
        // collection behind a poisoned lock is still consistent.
        self.collection.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn collection_name(&self) -> String {
        self.lock().name().to_string()
    }

    pub fn db_path(&self) -> PathBuf {
        self.lock().db_path().to_path_buf()
    }

    /// Embed a single text, bounded by the configured deadline.
    pub async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, EmbeddingError> {
        match tokio::time::timeout(self.timeout, self.embedder.embed(text)).await {
            Ok(result) => result,
            Err(_) => Err(EmbeddingError::Timeout(self.timeout)),
        }
    }

    /// Embed and persist `chunks`, returning how many records were written.
    ///
    /// All-or-nothing: the first embedding failure aborts the call before
    /// anything is written, and the records are inserted in one transaction.
    pub async fn add_chunks(&self, chunks: &[Chunk]) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let embeddings: Vec<Vec<f32>> = stream::iter(chunks)
            .map(|chunk| self.embed(&chunk.content))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        let records: Vec<IndexRecord> = chunks
            .iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| IndexRecord {
                id: Uuid::new_v4().to_string(),
                content: chunk.content.clone(),
                metadata: chunk.metadata(),
                embedding,
            })
            .collect();

        let mut collection = self.lock();
        collection
            .add_batch(&records)
            .map_err(RagError::IndexWrite)?;
        log::info!(
            "Indexed {} chunk(s) into collection '{}'",
            records.len(),
            collection.name()
        );
        Ok(records.len())
    }

    /// Delete every record by dropping and recreating the collection.
    pub fn clear(&self) -> Result<()> {
        let mut collection = self.lock();
        collection.delete_collection().map_err(RagError::IndexWrite)?;
        collection.create_collection().map_err(RagError::IndexWrite)?;
        log::info!("Cleared collection '{}'", collection.name());
        Ok(())
    }

    /// Number of persisted records.
    pub fn count(&self) -> Result<u64> {
        self.lock().count().map_err(RagError::IndexQuery)
    }

    /// Nearest records to a precomputed query embedding.
    pub fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.lock()
            .query(embedding, top_k)
            .map_err(RagError::IndexQuery)
    }
}
