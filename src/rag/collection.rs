//! Named, persistent vector collections stored in SQLite.
//!
//! Embeddings are stored as little-endian `f32` blobs and searched by
//! brute-force cosine similarity.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

use super::models::{ChunkMetadata, IndexRecord, RetrievalResult};

/// File name of the database inside the store directory.
pub const DB_FILE: &str = "collections.sqlite3";

const COLLECTION_DESCRIPTION: &str = "Course material vector collection";

#[derive(Error, Debug)]
pub enum CollectionError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid collection name: {0:?}")]
    InvalidName(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Corrupt embedding stored for record {0}")]
    CorruptEmbedding(String),
}

pub type Result<T> = std::result::Result<T, CollectionError>;

/// Handle on one named collection.
pub struct Collection {
    conn: Connection,
    name: String,
    db_path: PathBuf,
}

impl Collection {
    /// Open the store under `dir` and get or create the collection `name`.
    pub fn open(dir: &Path, name: &str) -> Result<Self> {
        if name.trim().is_empty() {
            return Err(CollectionError::InvalidName(name.to_string()));
        }
        std::fs::create_dir_all(dir)?;

        let db_path = dir.join(DB_FILE);
        let conn = Connection::open(&db_path)?;
        conn.busy_timeout(Duration::from_secs(5))?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                description TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- seq preserves insertion order and breaks similarity ties
            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                collection TEXT NOT NULL
                    REFERENCES collections(name) ON DELETE CASCADE,
                content TEXT NOT NULL,
                metadata TEXT NOT NULL,
                embedding BLOB NOT NULL,
                dimensions INTEGER NOT NULL,
                created_at TEXT DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_records_collection ON records(collection);
            "#,
        )?;

        let mut collection = Self {
            conn,
            name: name.to_string(),
            db_path,
        };
        collection.create_collection()?;
        Ok(collection)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the database path.
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Register the collection if it does not exist yet.
    pub fn create_collection(&mut self) -> Result<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO collections (name, description, created_at) VALUES (?1, ?2, ?3)",
            params![
                self.name,
                COLLECTION_DESCRIPTION,
                chrono::Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    /// Drop the collection; its records go with it through the cascade.
    pub fn delete_collection(&mut self) -> Result<()> {
        self.conn
            .execute("DELETE FROM collections WHERE name = ?1", params![self.name])?;
        Ok(())
    }

    /// Number of records in the collection.
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            params![self.name],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Embedding length shared by the stored records, if any exist.
    pub fn dimensions(&self) -> Result<Option<usize>> {
        let dims: Option<i64> = self
            .conn
            .query_row(
                "SELECT dimensions FROM records WHERE collection = ?1 LIMIT 1",
                params![self.name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(dims.map(|d| d as usize))
    }

    /// Insert records in one transaction; nothing is written if any insert fails.
    pub fn add_batch(&mut self, records: &[IndexRecord]) -> Result<()> {
        let Some(first) = records.first() else {
            return Ok(());
        };

        let expected = self.dimensions()?.unwrap_or(first.embedding.len());
        for record in records {
            if record.embedding.len() != expected || expected == 0 {
                return Err(CollectionError::DimensionMismatch {
                    expected,
                    actual: record.embedding.len(),
                });
            }
        }

        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO records (id, collection, content, metadata, embedding, dimensions) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in records {
                let metadata_json = serde_json::to_string(&record.metadata)?;
                stmt.execute(params![
                    record.id,
                    self.name,
                    record.content,
                    metadata_json,
                    serialize_embedding(&record.embedding),
                    record.embedding.len() as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// The `top_k` records most similar to `embedding`, nearest first.
    ///
    /// Equal scores keep insertion order.
    pub fn query(&self, embedding: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.conn.prepare(
            "SELECT id, content, metadata, embedding FROM records WHERE collection = ?1 ORDER BY seq",
        )?;

        let rows = stmt
            .query_map(params![self.name], |row| {
                Ok((
                    row.get::<_, String>(0)?,  // id
                    row.get::<_, String>(1)?,  // content
                    row.get::<_, String>(2)?,  // metadata
                    row.get::<_, Vec<u8>>(3)?, // embedding
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut scored = Vec::with_capacity(rows.len());
        for (id, content, metadata_json, embedding_bytes) in rows {
            let stored = deserialize_embedding(&embedding_bytes)
                .ok_or_else(|| CollectionError::CorruptEmbedding(id.clone()))?;
            if stored.len() != embedding.len() {
                return Err(CollectionError::DimensionMismatch {
                    expected: stored.len(),
                    actual: embedding.len(),
                });
            }
            let metadata: ChunkMetadata = serde_json::from_str(&metadata_json)?;
            let score = cosine_similarity(embedding, &stored);
            scored.push(RetrievalResult {
                id,
                content,
                metadata,
                score,
            });
        }

        // Stable sort: ties stay in insertion order.
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        Ok(scored)
    }
}

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Deserialize embedding from binary blob.
fn deserialize_embedding(bytes: &[u8]) -> Option<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

/// Calculate cosine similarity between two vectors.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot_product = 0.0;
    let mut norm_a = 0.0;
    let mut norm_b = 0.0;

    for (x, y) in a.iter().zip(b.iter()) {
        dot_product += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denominator = (norm_a * norm_b).sqrt();
    if denominator == 0.0 {
        return 0.0;
    }

    dot_product / denominator
}
