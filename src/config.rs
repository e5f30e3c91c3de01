//! Configuration for ingestion, indexing and retrieval.
//!
//! Values come from a TOML file, then environment overrides. Every component
//! receives the section it needs through its constructor.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "SYLLABUS_CONFIG";

/// Environment variable supplying the API key for both HTTP services.
pub const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable overriding the base URL for both HTTP services.
pub const API_BASE_ENV: &str = "OPENAI_API_BASE";

const DEFAULT_API_BASE: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Directory scanned by the document loader.
    pub data_dir: PathBuf,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    pub chat: ChatConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            store: StoreConfig::default(),
            embedding: EmbeddingConfig::default(),
            chat: ChatConfig::default(),
        }
    }
}

/// Chunk size and overlap, both measured in characters.
///
/// Every value satisfies `chunk_size > 0` and `chunk_overlap < chunk_size`:
/// the fields are private and both [`ChunkingConfig::new`] and
/// deserialization go through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ChunkingFile")]
pub struct ChunkingConfig {
    chunk_size: usize,
    chunk_overlap: usize,
}

/// Unchecked `[chunking]` section as written in the file.
#[derive(Deserialize)]
#[serde(default)]
struct ChunkingFile {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Default for ChunkingFile {
    fn default() -> Self {
        let defaults = ChunkingConfig::default();
        Self {
            chunk_size: defaults.chunk_size,
            chunk_overlap: defaults.chunk_overlap,
        }
    }
}

impl TryFrom<ChunkingFile> for ChunkingConfig {
    type Error = ConfigError;

    fn try_from(file: ChunkingFile) -> Result<Self> {
        Self::new(file.chunk_size, file.chunk_overlap)
    }
}

impl ChunkingConfig {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "chunking.chunk_size must be greater than 0".to_string(),
            ));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::Invalid(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                chunk_overlap, chunk_size
            )));
        }
        Ok(Self {
            chunk_size,
            chunk_overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 128,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Default number of results a search returns.
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding the SQLite database.
    pub path: PathBuf,
    /// Name of the collection inside the database.
    pub collection: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./vector_db"),
            collection: "course_materials".to_string(),
        }
    }
}

/// Settings for the embedding service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Requested vector length, for models that support truncation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dimensions: Option<usize>,
    pub timeout_secs: u64,
    pub max_retries: usize,
    /// Maximum number of embedding requests in flight.
    pub concurrency: usize,
}

impl EmbeddingConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Number of HTTP attempts per embedding call.
    pub fn attempts(&self) -> usize {
        self.max_retries.max(1)
    }

    /// Upper bound for one embedding call: every attempt at full timeout
    /// plus the backoff sleeps between them.
    pub fn deadline(&self) -> Duration {
        let attempts = self.attempts();
        let backoff: Duration = (1..attempts).map(retry_backoff).sum();
        self.timeout() * attempts as u32 + backoff
    }
}

/// Sleep before retry number `attempt` (1-based): 500ms doubled per attempt,
/// capped at 16s.
pub fn retry_backoff(attempt: usize) -> Duration {
    let capped = attempt.min(5) as u32;
    Duration::from_millis(500 * (1 << capped))
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            model: "text-embedding-v3".to_string(),
            api_key: None,
            dimensions: None,
            timeout_secs: 30,
            max_retries: 3,
            concurrency: 4,
        }
    }
}

/// Settings for the chat-completion service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    pub base_url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl ChatConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_BASE.to_string(),
            model: "qwen3-max".to_string(),
            api_key: None,
            temperature: 0.7,
            max_tokens: 1500,
            timeout_secs: 120,
        }
    }
}

impl RagConfig {
    /// Load configuration, apply environment overrides and validate.
    ///
    /// With no explicit path the lookup order is `$SYLLABUS_CONFIG`,
    /// `./syllabus.toml`, then `<config dir>/syllabus/config.toml`. A missing
    /// file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::discover() {
                Some(found) => Self::from_file(&found)?,
                None => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML file without applying overrides.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn discover() -> Option<PathBuf> {
        if let Ok(explicit) = std::env::var(CONFIG_ENV) {
            return Some(PathBuf::from(explicit));
        }
        let local = PathBuf::from("syllabus.toml");
        if local.exists() {
            return Some(local);
        }
        dirs::config_dir()
            .map(|dir| dir.join("syllabus").join("config.toml"))
            .filter(|p| p.exists())
    }

    /// Fill API keys and base URLs from the environment.
    ///
    /// Keys already present in the file win; the base URL variable always wins.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV).filter(|k| !k.trim().is_empty()) {
            if self.embedding.api_key.is_none() {
                self.embedding.api_key = Some(key.clone());
            }
            if self.chat.api_key.is_none() {
                self.chat.api_key = Some(key);
            }
        }
        if let Some(base) = lookup(API_BASE_ENV).filter(|b| !b.trim().is_empty()) {
            self.embedding.base_url = base.clone();
            self.chat.base_url = base;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.top_k must be greater than 0".to_string(),
            ));
        }
        if self.store.collection.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "store.collection must not be empty".to_string(),
            ));
        }
        if self.embedding.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "embedding.concurrency must be greater than 0".to_string(),
            ));
        }
        for (section, url) in [
            ("embedding", &self.embedding.base_url),
            ("chat", &self.chat.base_url),
        ] {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err(ConfigError::Invalid(format!(
                    "{}.base_url must start with http:// or https://",
                    section
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_are_valid() {
        let config = RagConfig::default();
        config.validate().unwrap();
        assert_eq!(config.chunking.chunk_size(), 1024);
        assert_eq!(config.chunking.chunk_overlap(), 128);
        assert_eq!(config.retrieval.top_k, 10);
        assert_eq!(config.store.collection, "course_materials");
    }

    #[test]
    fn test_deadline_covers_retries_and_backoff() {
        let embedding = EmbeddingConfig::default();
        // 3 attempts of 30s, then 1s and 2s of backoff between them.
        assert_eq!(embedding.deadline(), Duration::from_secs(93));

        let single = EmbeddingConfig {
            max_retries: 0,
            timeout_secs: 5,
            ..EmbeddingConfig::default()
        };
        assert_eq!(single.attempts(), 1);
        assert_eq!(single.deadline(), Duration::from_secs(5));
    }

    #[test]
    fn test_retry_backoff_is_capped() {
        assert_eq!(retry_backoff(1), Duration::from_millis(1000));
        assert_eq!(retry_backoff(2), Duration::from_millis(2000));
        assert_eq!(retry_backoff(9), Duration::from_millis(16000));
    }

    #[test]
    fn test_chunking_rejects_zero_size() {
        assert!(ChunkingConfig::new(0, 0).is_err());
    }

    #[test]
    fn test_file_with_invalid_chunking_is_rejected() {
        let dir = TempDir::new().unwrap();
        let zero = dir.path().join("zero.toml");
        std::fs::write(&zero, "[chunking]\nchunk_size = 0\nchunk_overlap = 0\n").unwrap();
        assert!(matches!(
            RagConfig::from_file(&zero),
            Err(ConfigError::Parse { .. })
        ));

        let overlap = dir.path().join("overlap.toml");
        std::fs::write(&overlap, "[chunking]\nchunk_size = 64\nchunk_overlap = 64\n").unwrap();
        let err = RagConfig::from_file(&overlap).unwrap_err();
        assert!(err.to_string().contains("chunk_overlap"));

        let chunking: ChunkingConfig = toml::from_str("chunk_overlap = 16").unwrap();
        assert_eq!(chunking.chunk_size(), 1024);
        assert_eq!(chunking.chunk_overlap(), 16);
    }

    #[test]
    fn test_from_file_validates_other_sections() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_top_k.toml");
        std::fs::write(&path, "[retrieval]\ntop_k = 0\n").unwrap();
        assert!(matches!(
            RagConfig::from_file(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_chunking_rejects_overlap_not_smaller_than_size() {
        assert!(ChunkingConfig::new(10, 10).is_err());
        assert!(ChunkingConfig::new(10, 3).is_ok());
        assert!(ChunkingConfig::new(10, 0).is_ok());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("syllabus.toml");
        std::fs::write(
            &path,
            r#"
            data_dir = "/srv/course"

            [chunking]
            chunk_size = 500

            [store]
            collection = "nlp_2026"
            "#,
        )
        .unwrap();

        let config = RagConfig::from_file(&path).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/srv/course"));
        assert_eq!(config.chunking.chunk_size(), 500);
        assert_eq!(config.chunking.chunk_overlap(), 128);
        assert_eq!(config.store.collection, "nlp_2026");
        assert_eq!(config.store.path, PathBuf::from("./vector_db"));
        assert_eq!(config.embedding.model, "text-embedding-v3");
    }

    #[test]
    fn test_invalid_toml_reports_path() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "chunking = [").unwrap();

        let err = RagConfig::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RagConfig::default();
        config.chat.api_key = Some("file-key".to_string());
        config.apply_env(|key| match key {
            API_KEY_ENV => Some("env-key".to_string()),
            API_BASE_ENV => Some("http://localhost:11434/v1".to_string()),
            _ => None,
        });

        assert_eq!(config.embedding.api_key.as_deref(), Some("env-key"));
        assert_eq!(config.chat.api_key.as_deref(), Some("file-key"));
        assert_eq!(config.embedding.base_url, "http://localhost:11434/v1");
        assert_eq!(config.chat.base_url, "http://localhost:11434/v1");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = RagConfig::default();
        config.retrieval.top_k = 0;
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.store.collection = "  ".to_string();
        assert!(config.validate().is_err());

        let mut config = RagConfig::default();
        config.embedding.base_url = "ftp://example.com".to_string();
        assert!(config.validate().is_err());
    }
}
