use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use syllabus_lib::providers::{OpenAiChat, OpenAiEmbedder};
use syllabus_lib::rag::{CourseAssistant, Retriever, VectorIndex};
use syllabus_lib::RagConfig;

/// Shared application state for CLI commands
pub struct App {
    pub config: RagConfig,
    pub index: Arc<VectorIndex>,
}

impl App {
    /// Load configuration and open the configured collection
    pub fn new(config_path: Option<&Path>) -> Result<Self> {
        let config = RagConfig::load(config_path).context("Failed to load configuration")?;

        let embedder = OpenAiEmbedder::new(&config.embedding)
            .context("Failed to create embedding client")?;
        let index = VectorIndex::open(&config.store, &config.embedding, Arc::new(embedder))
            .with_context(|| {
                format!(
                    "Failed to open collection '{}' in {}",
                    config.store.collection,
                    config.store.path.display()
                )
            })?;

        Ok(Self {
            config,
            index: Arc::new(index),
        })
    }

    pub fn retriever(&self) -> Retriever {
        Retriever::new(self.index.clone(), self.config.retrieval.top_k)
    }

    /// Assistant wired to the configured chat endpoint
    pub fn assistant(&self) -> Result<CourseAssistant> {
        let chat = OpenAiChat::new(&self.config.chat).context("Failed to create chat client")?;
        Ok(CourseAssistant::new(Arc::new(self.retriever()), Arc::new(chat)))
    }
}
