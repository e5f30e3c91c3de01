//! Chunk aggregation: applies the per-type chunking policy to loaded documents.

use rayon::prelude::*;

use super::chunker::Chunker;
use super::models::{Chunk, Document};

/// Chunk one document.
///
/// Pages and slides pass through as a single chunk regardless of length;
/// free-text documents are split and numbered from 0.
pub fn chunk_document(chunker: &Chunker, doc: &Document) -> Vec<Chunk> {
    if doc.filetype.is_paginated() {
        return Chunk::from_page(doc).into_iter().collect();
    }

    chunker
        .split(&doc.content)
        .into_iter()
        .enumerate()
        .filter_map(|(index, piece)| Chunk::from_piece(doc, index as u32, piece))
        .collect()
}

/// Chunk every document in order.
pub fn aggregate(chunker: &Chunker, documents: &[Document]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    for (i, doc) in documents.iter().enumerate() {
        let produced = chunk_document(chunker, doc);
        log::debug!(
            "Chunked {} (page {}) into {} chunk(s) [{}/{}]",
            doc.filename,
            doc.page_number,
            produced.len(),
            i + 1,
            documents.len()
        );
        chunks.extend(produced);
    }
    log::info!(
        "Chunked {} document(s) into {} chunk(s)",
        documents.len(),
        chunks.len()
    );
    chunks
}

/// Same output as [`aggregate`], with documents chunked on the rayon pool.
pub fn aggregate_parallel(chunker: &Chunker, documents: &[Document]) -> Vec<Chunk> {
    let chunks: Vec<Chunk> = documents
        .par_iter()
        .map(|doc| chunk_document(chunker, doc))
        .collect::<Vec<_>>()
        .into_iter()
        .flatten()
        .collect();
    log::info!(
        "Chunked {} document(s) into {} chunk(s)",
        documents.len(),
        chunks.len()
    );
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ChunkingConfig;
    use crate::rag::models::FileType;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(ChunkingConfig::new(size, overlap).unwrap())
    }

    fn doc(filename: &str, filetype: FileType, page_number: u32, content: &str) -> Document {
        Document {
            content: content.to_string(),
            filename: filename.to_string(),
            filepath: format!("data/{}", filename),
            filetype,
            page_number,
            images: Vec::new(),
        }
    }

    #[test]
    fn test_pdf_pages_are_never_split() {
        let long_page = "这一页很长。".repeat(50);
        let docs = vec![
            doc("lecture.pdf", FileType::Pdf, 1, "--- 第 1 页 ---\n短。\n"),
            doc("lecture.pdf", FileType::Pdf, 2, &long_page),
            doc("lecture.pdf", FileType::Pdf, 3, "--- 第 3 页 ---\n结束。\n"),
        ];

        let chunks = aggregate(&chunker(10, 3), &docs);
        assert_eq!(chunks.len(), 3);
        assert_eq!(
            chunks.iter().map(|c| c.page_number).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert!(chunks.iter().all(|c| c.chunk_id == 0));
        assert_eq!(chunks[1].content, long_page);
    }

    #[test]
    fn test_text_documents_are_split_and_numbered() {
        let docs = vec![doc("notes.txt", FileType::Txt, 0, "第一句。第二句。第三句。")];
        let chunks = aggregate(&chunker(10, 3), &docs);

        assert_eq!(chunks.len(), 2);
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_id, i as u32);
            assert_eq!(chunk.page_number, 0);
            assert_eq!(chunk.filename, "notes.txt");
            assert_eq!(chunk.filepath, "data/notes.txt");
            assert_eq!(chunk.filetype, FileType::Txt);
            assert!(chunk.images.is_empty());
        }
    }

    #[test]
    fn test_empty_document_is_omitted() {
        let docs = vec![
            doc("empty.docx", FileType::Docx, 0, "   "),
            doc("slides.pptx", FileType::Pptx, 1, "--- 幻灯片 1 ---\n标题\n"),
        ];
        let chunks = aggregate(&chunker(100, 10), &docs);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].filename, "slides.pptx");
    }

    #[test]
    fn test_chunk_ids_restart_per_document() {
        let docs = vec![
            doc("a.txt", FileType::Txt, 0, "Alpha one. Alpha two. Alpha three."),
            doc("b.txt", FileType::Txt, 0, "Beta one. Beta two. Beta three."),
        ];
        let chunks = aggregate(&chunker(12, 0), &docs);

        let ids_for = |name: &str| {
            chunks
                .iter()
                .filter(|c| c.filename == name)
                .map(|c| c.chunk_id)
                .collect::<Vec<_>>()
        };
        let a = ids_for("a.txt");
        let b = ids_for("b.txt");
        assert_eq!(a, (0..a.len() as u32).collect::<Vec<_>>());
        assert_eq!(b, (0..b.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_aggregate_is_idempotent_and_parallel_matches() {
        let docs = vec![
            doc("a.txt", FileType::Txt, 0, "Self-attention mixes tokens. Heads specialise. Layers stack."),
            doc("b.pdf", FileType::Pdf, 1, "page one"),
            doc("c.docx", FileType::Docx, 0, "Embeddings map text to vectors.\n\nSimilar text lands nearby."),
        ];
        let chunker = chunker(30, 5);

        let first = aggregate(&chunker, &docs);
        let second = aggregate(&chunker, &docs);
        let parallel = aggregate_parallel(&chunker, &docs);

        assert_eq!(first, second);
        assert_eq!(first, parallel);
    }
}
