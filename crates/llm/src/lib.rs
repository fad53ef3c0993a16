//! articlevec LLM Integration
//!
//! Ollama API client for embeddings and text generation, plus the period
//! report summarizer

mod client;
mod llm_trait;
mod prompts;
mod summarize;
mod types;

pub use client::OllamaClient;
pub use llm_trait::LlmClient;
pub use prompts::{report_prompt, REPORT_EXAMPLES, REPORT_PREFIX};
pub use summarize::{fallback_summary, ReportSummarizer, EMPTY_SUMMARY};
pub use types::{EmbedRequest, EmbedResponse, GenerateOptions, GenerateRequest, GenerateResponse, ModelRequest};
