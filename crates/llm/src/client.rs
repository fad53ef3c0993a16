use articlevec_common::{ArticleVecError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use crate::llm_trait::LlmClient;
use crate::types::{EmbedRequest, EmbedResponse, GenerateRequest, GenerateResponse, ModelRequest};

const GENERATE_MAX_RETRIES: u32 = 3;

/// Ollama API client
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: String,
    client: Client,
    embed_max_retries: u32,
}

impl OllamaClient {
    /// Create new Ollama client
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 minutes for LLM calls
            .build()
            .map_err(|e| ArticleVecError::network(format!("Failed to create HTTP client: {}", e)))?;

        info!("Ollama client initialized: {}", base_url);
        Ok(Self {
            base_url,
            client,
            embed_max_retries: 1,
        })
    }

    /// Set the number of attempts per embedding request (minimum 1)
    pub fn with_embed_retries(mut self, attempts: u32) -> Self {
        self.embed_max_retries = attempts.max(1);
        self
    }

    /// Base URL the client talks to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Generate text with custom retry count
    async fn generate_with_retry(&self, request: GenerateRequest, max_retries: u32) -> Result<String> {
        let url = format!("{}/api/generate", self.base_url);

        debug!(
            "Sending generate request to Ollama - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.try_generate(&url, &request).await {
                Ok(response) => {
                    debug!("Received response from Ollama - Length: {}", response.len());
                    return Ok(response);
                }
                Err(e) => {
                    if attempt < max_retries {
                        let delay = std::time::Duration::from_secs(2u64.pow(attempt - 1));
                        warn!(
                            "Ollama request failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt, max_retries, e, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ArticleVecError::llm("All retries failed")))
    }

    /// Single attempt to generate text
    async fn try_generate(&self, url: &str, request: &GenerateRequest) -> Result<String> {
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ArticleVecError::llm(format!("Failed to send request: {}", e)))?
            .error_for_status()
            .map_err(|e| ArticleVecError::llm(format!("Ollama API error: {}", e)))?;

        let result: GenerateResponse = response
            .json()
            .await
            .map_err(|e| ArticleVecError::llm(format!("Failed to parse response: {}", e)))?;

        if result.response.trim().is_empty() {
            return Err(ArticleVecError::llm("Empty response from Ollama"));
        }

        Ok(result.response)
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ArticleVecError::network(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }

    /// Make sure `model` is available locally, pulling it when missing
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        let show_url = format!("{}/api/show", self.base_url);
        let show = self
            .client
            .post(&show_url)
            .json(&ModelRequest {
                name: model.to_string(),
                stream: None,
            })
            .send()
            .await
            .map_err(|e| ArticleVecError::network(format!("Failed to connect to Ollama: {}", e)))?;

        if show.status().is_success() {
            debug!("Model available: {}", model);
            return Ok(());
        }

        info!("Pulling model {}...", model);
        let pull_url = format!("{}/api/pull", self.base_url);
        self.client
            .post(&pull_url)
            .json(&ModelRequest {
                name: model.to_string(),
                stream: Some(false),
            })
            .send()
            .await
            .map_err(|e| ArticleVecError::network(format!("Failed to send pull request: {}", e)))?
            .error_for_status()
            .map_err(|e| ArticleVecError::embedding_service(format!("Model pull failed: {}", e)))?;

        info!("Model pulled: {}", model);
        Ok(())
    }

    /// Generate embedding with the configured attempt count
    async fn embed_with_retry(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Err(ArticleVecError::embedding_service("Cannot embed empty text"));
        }

        let url = format!("{}/api/embeddings", self.base_url);
        debug!("Generating embedding - Model: {}, Text length: {}", model, text.len());

        let request = EmbedRequest {
            model: model.to_string(),
            prompt: text.to_string(),
        };

        let max_retries = self.embed_max_retries;
        let mut last_error = None;

        for attempt in 1..=max_retries {
            match self.try_embed(&url, &request).await {
                Ok(embedding) => {
                    debug!("Received embedding - Dimension: {}", embedding.len());
                    return Ok(embedding);
                }
                Err(e) => {
                    if attempt < max_retries {
                        let delay = std::time::Duration::from_secs(2u64.pow(attempt - 1));
                        warn!(
                            "Embedding request failed (attempt {}/{}). Retrying in {:?}...",
                            attempt, max_retries, delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ArticleVecError::embedding_service("All retries failed")))
    }

    /// Single attempt to generate embedding
    async fn try_embed(&self, url: &str, request: &EmbedRequest) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                ArticleVecError::embedding_service(format!("Failed to send embedding request: {}", e))
            })?
            .error_for_status()
            .map_err(|e| ArticleVecError::embedding_service(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await.map_err(|e| {
            ArticleVecError::embedding_service(format!("Failed to parse embedding response: {}", e))
        })?;

        if result.embedding.is_empty() {
            return Err(ArticleVecError::embedding_service("Empty embedding from Ollama"));
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(&self, request: GenerateRequest) -> Result<String> {
        self.generate_with_retry(request, GENERATE_MAX_RETRIES).await
    }

    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>> {
        self.embed_with_retry(model, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OllamaClient::new("http://localhost:11434/").unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn test_embed_retries_floor() {
        let client = OllamaClient::new("http://localhost:11434")
            .unwrap()
            .with_embed_retries(0);
        assert_eq!(client.embed_max_retries, 1);
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        let err = client.test_connection().await.unwrap_err();
        assert!(matches!(err, ArticleVecError::Network(_)));
    }

    #[tokio::test]
    async fn test_empty_text_rejected_without_request() {
        // Port 9 (discard) is never contacted for blank input
        let client = OllamaClient::new("http://127.0.0.1:9").unwrap();
        let err = client.embed("all-minilm", "   ").await.unwrap_err();
        assert!(matches!(err, ArticleVecError::EmbeddingService(_)));
    }
}
