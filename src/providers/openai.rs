//! OpenAI-compatible embedding and chat-completion clients.
//!
//! Both talk to any endpoint implementing the `/embeddings` and
//! `/chat/completions` routes (OpenAI, DashScope compatible mode, Ollama,
//! LM Studio).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{retry_backoff, ChatConfig, EmbeddingConfig};
use crate::rag::{ChatMessage, ChatModel, CompletionError, Embedder, EmbeddingError};

/// Embeddings client with retry on rate limiting and transient failures.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    endpoint: String,
    model: String,
    dimensions: Option<usize>,
    timeout: Duration,
    max_attempts: usize,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        if config.model.trim().is_empty() {
            return Err(EmbeddingError::Config("missing embedding model name".to_string()));
        }
        let headers = default_headers(config.api_key.as_deref())
            .map_err(EmbeddingError::Config)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            dimensions: config.dimensions,
            timeout: config.timeout(),
            max_attempts: config.attempts(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt = 0usize;
        loop {
            let request = EmbeddingRequest {
                model: &self.model,
                input: text,
                dimensions: self.dimensions,
                encoding_format: "float",
            };
            match self.client.post(&self.endpoint).json(&request).send().await {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        let parsed: EmbeddingResponse = resp.json().await?;
                        return parsed.into_embedding();
                    }

                    let body = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "<body unavailable>".to_string());
                    if should_retry(status) && attempt + 1 < self.max_attempts {
                        attempt += 1;
                        log::warn!(
                            "Embedding request returned {}, retrying ({}/{})",
                            status,
                            attempt,
                            self.max_attempts - 1
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    return Err(EmbeddingError::Service {
                        status: status.as_u16(),
                        message: body,
                    });
                }
                Err(err) => {
                    if is_retryable_error(&err) && attempt + 1 < self.max_attempts {
                        attempt += 1;
                        log::warn!(
                            "Embedding request failed: {}, retrying ({}/{})",
                            err,
                            attempt,
                            self.max_attempts - 1
                        );
                        tokio::time::sleep(retry_backoff(attempt)).await;
                        continue;
                    }
                    if err.is_timeout() {
                        return Err(EmbeddingError::Timeout(self.timeout));
                    }
                    return Err(err.into());
                }
            }
        }
    }
}

/// Chat-completion client. Requests are sent once; callers decide on retries.
#[derive(Clone)]
pub struct OpenAiChat {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
    timeout: Duration,
}

impl OpenAiChat {
    pub fn new(config: &ChatConfig) -> Result<Self, CompletionError> {
        if config.model.trim().is_empty() {
            return Err(CompletionError::Config("missing chat model name".to_string()));
        }
        let headers = default_headers(config.api_key.as_deref())
            .map_err(CompletionError::Config)?;
        let client = Client::builder()
            .timeout(config.timeout())
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiChat {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let resp = match self.client.post(&self.endpoint).json(&request).send().await {
            Ok(resp) => resp,
            Err(err) if err.is_timeout() => return Err(CompletionError::Timeout(self.timeout)),
            Err(err) => return Err(err.into()),
        };

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Service {
                status: status.as_u16(),
                message: resp.text().await.unwrap_or_default(),
            });
        }

        let parsed: ChatResponse = resp.json().await?;
        parsed.into_content()
    }
}

fn default_headers(api_key: Option<&str>) -> Result<HeaderMap, String> {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
        let auth = format!("Bearer {}", key);
        let value = HeaderValue::from_str(&auth).map_err(|_| "invalid API key".to_string())?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(headers)
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request() || err.is_body()
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

impl EmbeddingResponse {
    fn into_embedding(self) -> Result<Vec<f32>, EmbeddingError> {
        let mut data = self.data;
        data.sort_by_key(|entry| entry.index);
        let embedding = data
            .into_iter()
            .next()
            .map(|entry| entry.embedding)
            .ok_or_else(|| EmbeddingError::Malformed("response contained no embeddings".to_string()))?;
        if embedding.is_empty() {
            return Err(EmbeddingError::Malformed("embedding vector is empty".to_string()));
        }
        Ok(embedding)
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String, CompletionError> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}
