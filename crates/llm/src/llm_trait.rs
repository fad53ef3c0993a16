use articlevec_common::Result;
use crate::types::GenerateRequest;
use async_trait::async_trait;

/// Common trait for LLM clients
///
/// `embed` may return vectors of any length; callers normalize before
/// persisting. Any error is recoverable per item.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate text from a prompt
    async fn generate(&self, request: GenerateRequest) -> Result<String>;

    /// Generate embedding for text
    async fn embed(&self, model: &str, text: &str) -> Result<Vec<f32>>;
}
