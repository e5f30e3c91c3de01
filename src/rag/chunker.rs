//! Content chunking for RAG indexing.
//!
//! Text is segmented into sentences, sentences are packed greedily into
//! chunks of at most `chunk_size` characters with a `chunk_overlap` character
//! tail carried into the next chunk, and a final pass merges consecutive small
//! chunks. All lengths count Unicode scalar values, not bytes.

use crate::config::ChunkingConfig;

/// Characters that close a sentence on their own.
const SENTENCE_TERMINATORS: &[char] = &['。', '！', '？', '.', '!', '?'];

/// Splits free text into overlapping, size-bounded chunks.
#[derive(Debug, Clone, Copy)]
pub struct Chunker {
    config: ChunkingConfig,
}

impl Chunker {
    pub fn new(config: ChunkingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> ChunkingConfig {
        self.config
    }

    /// Split `text` into chunks.
    ///
    /// The size bound is soft: a single sentence longer than `chunk_size` is
    /// emitted whole rather than cut mid-sentence.
    pub fn split(&self, text: &str) -> Vec<String> {
        let chunk_size = self.config.chunk_size();
        let chunk_overlap = self.config.chunk_overlap();

        if text.is_empty() {
            return Vec::new();
        }

        let mut sentences = split_sentences(text);
        if sentences.is_empty() {
            sentences = fixed_slices(text, chunk_size);
        }

        let chunks = pack_sentences(&sentences, chunk_size, chunk_overlap);

        // The merge pass concatenates whole chunks, so any overlap seeded in
        // `pack_sentences` is kept verbatim but no new overlap is introduced
        // between merged groups.
        if chunks.len() > 1 {
            merge_small_chunks(chunks, chunk_size)
        } else {
            chunks
        }
    }
}

fn is_terminator(ch: char) -> bool {
    SENTENCE_TERMINATORS.contains(&ch)
}

/// Segment text into trimmed, non-empty sentences.
///
/// A sentence closes on a terminator or on the first newline of a `\n\n`
/// paragraph break. A run of the same closing character stays with the
/// sentence it closes (`"!!!"`, `"\n\n\n"`), a different one starts anew.
///
/// A lone `\n` is an ordinary character: hard-wrapped lines of one sentence
/// stay together instead of becoming a sentence per line.
fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    let mut i = 0;
    while i < chars.len() {
        let ch = chars[i];
        current.push(ch);

        let paragraph_break = ch == '\n' && chars.get(i + 1) == Some(&'\n');
        if is_terminator(ch) || paragraph_break {
            while chars.get(i + 1) == Some(&ch) {
                i += 1;
                current.push(ch);
            }
            push_trimmed(&mut sentences, &current);
            current.clear();
        }
        i += 1;
    }

    push_trimmed(&mut sentences, &current);
    sentences
}

fn push_trimmed(out: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        out.push(trimmed.to_string());
    }
}

/// Fixed-width character slices with no overlap.
fn fixed_slices(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(size).map(|c| c.iter().collect()).collect()
}

/// The last `n` characters of `text`, or all of it when shorter.
fn tail_chars(text: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Greedily pack sentences, seeding each new chunk with the tail of the last.
fn pack_sentences(sentences: &[String], size: usize, overlap: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;
    let mut overlap_text = String::new();

    for sentence in sentences {
        let sentence_len = sentence.chars().count();

        if current_len + sentence_len > size && !current.is_empty() {
            push_trimmed(&mut chunks, &current);
            current = format!("{}{}", overlap_text, sentence);
        } else {
            current.push_str(sentence);
        }

        current_len = current.chars().count();
        overlap_text = tail_chars(&current, overlap).to_string();
    }

    push_trimmed(&mut chunks, &current);
    chunks
}

/// Concatenate consecutive chunks while the result stays within `size`.
fn merge_small_chunks(chunks: Vec<String>, size: usize) -> Vec<String> {
    let mut merged = Vec::new();
    let mut buffer = String::new();
    let mut buffer_len = 0usize;

    for chunk in chunks {
        let len = chunk.chars().count();
        if buffer_len + len <= size {
            buffer.push_str(&chunk);
            buffer_len += len;
        } else {
            if !buffer.is_empty() {
                merged.push(std::mem::take(&mut buffer));
            }
            buffer = chunk;
            buffer_len = len;
        }
    }

    if !buffer.is_empty() {
        merged.push(buffer);
    }
    merged
}
