//! Course material retrieval: document loading, chunking, a persistent
//! vector index and grounded question answering.

pub mod config;
pub mod loader;
pub mod pipeline;
pub mod providers;
pub mod rag;

pub use config::{ChunkingConfig, ConfigError, RagConfig};
pub use loader::{DocumentLoader, LoadError, LoadOutcome};
pub use pipeline::{ingest, IngestError, IngestFailure, IngestOptions, IngestReport};
