//! Error types for the embedding, indexing and answering paths.

use std::time::Duration;

use thiserror::Error;

use super::collection::CollectionError;

/// The embedding service was unreachable or rejected the input.
#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Embedding service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Malformed embedding response: {0}")]
    Malformed(String),

    #[error("Embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid embedding client configuration: {0}")]
    Config(String),
}

/// The chat-completion service failed to produce an answer.
#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Chat service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Chat response contained no message")]
    EmptyResponse,

    #[error("Chat request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid chat client configuration: {0}")]
    Config(String),
}

/// Failures surfaced by the vector index, retriever and assistant.
#[derive(Error, Debug)]
pub enum RagError {
    #[error("Embedding failed: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Index write failed: {0}")]
    IndexWrite(#[source] CollectionError),

    #[error("Index query failed: {0}")]
    IndexQuery(#[source] CollectionError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),
}

pub type Result<T> = std::result::Result<T, RagError>;
