//! Data models for RAG operations.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source document kinds understood by the loader and the aggregator.
///
/// Serialized as the lowercase file extension with its leading dot, which is
/// also what gets stored in record metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileType {
    #[serde(rename = ".pdf")]
    Pdf,
    #[serde(rename = ".pptx")]
    Pptx,
    #[serde(rename = ".docx")]
    Docx,
    #[serde(rename = ".txt")]
    Txt,
}

impl FileType {
    pub const ALL: [FileType; 4] = [FileType::Pdf, FileType::Pptx, FileType::Docx, FileType::Txt];

    /// Resolve a file type from a path's extension, case-insensitively.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|ft| ft.as_str().trim_start_matches('.') == ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::Pdf => ".pdf",
            FileType::Pptx => ".pptx",
            FileType::Docx => ".docx",
            FileType::Txt => ".txt",
        }
    }

    /// Page/slide-level kinds arrive pre-split and are never re-chunked.
    pub fn is_paginated(&self) -> bool {
        matches!(self, FileType::Pdf | FileType::Pptx)
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of extracted text as supplied by the document loader.
///
/// Paginated kinds carry one record per page or slide (`page_number >= 1`);
/// free-text kinds carry the whole file with `page_number == 0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    pub filename: String,
    pub filepath: String,
    pub filetype: FileType,
    pub page_number: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

/// A bounded piece of document text with provenance, the unit of embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// The text content of the chunk
    pub content: String,
    pub filename: String,
    pub filepath: String,
    pub filetype: FileType,
    /// 1-based page/slide index, or 0 for unpaginated text
    pub page_number: u32,
    /// Position of this chunk within its parent document
    pub chunk_id: u32,
    /// Auxiliary image references, empty for every current parser
    pub images: Vec<String>,
}

impl Chunk {
    /// The single chunk of a page or slide.
    ///
    /// Returns `None` when the document is not a paginated kind, has no page
    /// number, or has blank content.
    pub fn from_page(doc: &Document) -> Option<Self> {
        if !doc.filetype.is_paginated() || doc.page_number == 0 || doc.content.trim().is_empty() {
            return None;
        }
        Some(Self {
            content: doc.content.clone(),
            filename: doc.filename.clone(),
            filepath: doc.filepath.clone(),
            filetype: doc.filetype,
            page_number: doc.page_number,
            chunk_id: 0,
            images: doc.images.clone(),
        })
    }

    /// The `chunk_id`-th piece of a free-text document.
    ///
    /// Returns `None` for paginated documents or blank content.
    pub fn from_piece(doc: &Document, chunk_id: u32, content: String) -> Option<Self> {
        if doc.filetype.is_paginated() || content.trim().is_empty() {
            return None;
        }
        Some(Self {
            content,
            filename: doc.filename.clone(),
            filepath: doc.filepath.clone(),
            filetype: doc.filetype,
            page_number: 0,
            chunk_id,
            images: Vec::new(),
        })
    }

    /// Metadata persisted alongside the chunk content.
    pub fn metadata(&self) -> ChunkMetadata {
        ChunkMetadata {
            filename: self.filename.clone(),
            filepath: self.filepath.clone(),
            filetype: self.filetype,
            page_number: self.page_number,
            chunk_id: self.chunk_id,
            has_images: !self.images.is_empty(),
        }
    }
}

/// Metadata for a stored chunk, capturing its source context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub filename: String,
    pub filepath: String,
    pub filetype: FileType,
    pub page_number: u32,
    pub chunk_id: u32,
    pub has_images: bool,
}

/// A record as written to the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexRecord {
    pub id: String,
    pub content: String,
    pub metadata: ChunkMetadata,
    pub embedding: Vec<f32>,
}

/// Result from a similarity search, nearest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    /// Identifier assigned when the record was written
    pub id: String,
    /// The matched chunk content
    pub content: String,
    pub metadata: ChunkMetadata,
    /// Cosine similarity to the query (higher is more similar)
    pub score: f32,
}
