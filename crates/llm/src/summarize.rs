use articlevec_common::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::llm_trait::LlmClient;
use crate::prompts::report_prompt;
use crate::types::{GenerateOptions, GenerateRequest};

/// Text returned when there is nothing to summarize
pub const EMPTY_SUMMARY: &str = "None";

/// Executive summary writer for period aggregates
///
/// Aggregates are taken as JSON so the summarizer stays independent of the
/// store's types; the expected keys are `total_articles`, `avg_impact`,
/// `impact_distribution`, `max_impact` and `top_spokesperson`.
pub struct ReportSummarizer {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl ReportSummarizer {
    /// Create new summarizer
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    /// Summarize aggregates, falling back to a plain rendering when the LLM fails
    pub async fn summarize(&self, aggregates: &Value) -> Result<String> {
        if is_empty(aggregates) {
            debug!("No aggregates to summarize");
            return Ok(EMPTY_SUMMARY.to_string());
        }

        match self.generate(aggregates).await {
            Ok(text) => {
                info!("Summary generated - Length: {} chars", text.len());
                Ok(text.trim().to_string())
            }
            Err(e) => {
                warn!("Summary generation failed, using fallback: {}", e);
                Ok(fallback_summary(aggregates))
            }
        }
    }

    async fn generate(&self, aggregates: &Value) -> Result<String> {
        let prompt = report_prompt(&serde_json::to_string(aggregates)?);

        let request = GenerateRequest {
            model: self.model.clone(),
            prompt,
            stream: Some(false),
            options: Some(GenerateOptions {
                temperature: Some(0.0),
                ..Default::default()
            }),
        };

        self.client.generate(request).await
    }
}

fn is_empty(aggregates: &Value) -> bool {
    match aggregates {
        Value::Null => true,
        Value::Object(map) => {
            map.is_empty() || map.get("total_articles").and_then(Value::as_u64) == Some(0)
        }
        _ => false,
    }
}

/// Deterministic summary built straight from the aggregate values
pub fn fallback_summary(aggs: &Value) -> String {
    let mut parts = Vec::new();

    if let Some(total) = aggs.get("total_articles").and_then(Value::as_u64) {
        parts.push(format!("Total articles: {}.", total));
    }

    if let Some(avg) = aggs.get("avg_impact").and_then(Value::as_f64) {
        parts.push(format!("Average impact: {:.2}.", avg));
    }

    if let Some(dist) = aggs.get("impact_distribution").and_then(Value::as_object) {
        if !dist.is_empty() {
            // serde_json maps iterate in key order
            let buckets: Vec<String> = dist.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
            parts.push(format!("Dist {}", buckets.join(", ")));
        }
    }

    if let Some(max_row) = aggs.get("max_impact").filter(|v| v.is_object()) {
        parts.push(format!(
            "Top {} {} {} {}",
            display(max_row.get("articleid")),
            display(max_row.get("impact")),
            display(max_row.get("issue")),
            display(max_row.get("spokespersonname")),
        ));
    }

    if let Some(top) = aggs.get("top_spokesperson").filter(|v| v.is_object()) {
        parts.push(format!(
            "Top spokesperson {} ({})",
            display(top.get("spokespersonname")),
            display(top.get("article_count")),
        ));
    }

    if parts.is_empty() {
        EMPTY_SUMMARY.to_string()
    } else {
        parts.join(" ")
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "not reported".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
