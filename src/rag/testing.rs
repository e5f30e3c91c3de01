//! Deterministic stand-ins for the network services, shared by unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::embedder::{ChatMessage, ChatModel, Embedder};
use super::error::{CompletionError, EmbeddingError};

pub const DIMENSIONS: usize = 32;

/// Bag-of-characters embedding: texts sharing characters land close together.
pub fn char_histogram(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for ch in text.chars().filter(|c| !c.is_whitespace()) {
        vector[(ch as usize) % DIMENSIONS] += 1.0;
    }
    vector
}

#[derive(Default)]
pub struct HistogramEmbedder {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Embedder for HistogramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(char_histogram(text))
    }
}

/// Fails for any text containing `marker`.
pub struct FailingEmbedder {
    pub marker: &'static str,
}

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.contains(self.marker) {
            return Err(EmbeddingError::Service {
                status: 429,
                message: "quota exceeded".to_string(),
            });
        }
        Ok(char_histogram(text))
    }
}

/// Never answers within any reasonable deadline.
pub struct StalledEmbedder;

#[async_trait]
impl Embedder for StalledEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, EmbeddingError> {
        tokio::time::sleep(Duration::from_secs(30)).await;
        Ok(vec![1.0; DIMENSIONS])
    }
}

/// Records the prompts it receives and replies with a canned answer.
pub struct ScriptedChat {
    pub reply: Result<String, u16>,
    pub received: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedChat {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(status: u16) -> Self {
        Self {
            reply: Err(status),
            received: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        self.received.lock().unwrap().push(messages.to_vec());
        match &self.reply {
            Ok(reply) => Ok(reply.clone()),
            Err(status) => Err(CompletionError::Service {
                status: *status,
                message: "upstream unavailable".to_string(),
            }),
        }
    }
}
