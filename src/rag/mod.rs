//! RAG (Retrieval-Augmented Generation) module: chunking, indexing, retrieval
//! and grounded answering.

mod aggregate;
mod assistant;
mod chunker;
pub mod collection;
mod embedder;
mod error;
mod index;
mod models;
mod retriever;

#[cfg(test)]
pub(crate) mod testing;

pub use aggregate::{aggregate, aggregate_parallel, chunk_document};
pub use assistant::{format_context, source_tag, Answer, CourseAssistant, DEFAULT_SYSTEM_PROMPT};
pub use chunker::Chunker;
pub use collection::{Collection, CollectionError};
pub use embedder::{ChatMessage, ChatModel, Embedder, Role};
pub use error::{CompletionError, EmbeddingError, RagError};
pub use index::VectorIndex;
pub use models::{Chunk, ChunkMetadata, Document, FileType, IndexRecord, RetrievalResult};
pub use retriever::Retriever;
