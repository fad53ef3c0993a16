use articlevec_common::{ArticleVecError, Result};
use articlevec_llm::LlmClient;
use articlevec_store::{ArticleStore, PendingComment};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::normalize::normalize;
use crate::types::EmbedStats;

/// Stored embeddings between progress log lines
const PROGRESS_EVERY: usize = 25;

/// Generates embeddings for articles that lack one
pub struct EmbeddingBatcher {
    store: Arc<dyn ArticleStore>,
    client: Arc<dyn LlmClient>,
    model: String,
}

impl EmbeddingBatcher {
    pub fn new(store: Arc<dyn ArticleStore>, client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            store,
            client,
            model: model.into(),
        }
    }

    /// Embed pending comments in batches of at most `batch_size`.
    ///
    /// A failed record is counted and skipped; only datastore errors end the
    /// run early.
    pub async fn embed_pending(&self, batch_size: usize, limit: Option<usize>) -> Result<EmbedStats> {
        let batch_size = batch_size.max(1);
        let candidates = self.store.pending_embeddings(limit).await?;
        let mut stats = EmbedStats::default();

        if candidates.is_empty() {
            info!("No pending embeddings.");
            return Ok(stats);
        }

        let batch_count = candidates.len().div_ceil(batch_size);
        info!(
            "Generating embeddings for {} rows in {} batches (model={})",
            candidates.len(),
            batch_count,
            self.model
        );

        let dimension = self.store.dimension();
        for (index, batch) in candidates.chunks(batch_size).enumerate() {
            debug!("Batch {}/{} - {} rows", index + 1, batch_count, batch.len());

            for candidate in batch {
                stats.attempted += 1;
                match self.embed_one(candidate).await {
                    Ok(raw) => {
                        if raw.len() != dimension {
                            debug!(
                                "Normalizing embedding for {} from {} to {} dimensions",
                                candidate.article_id,
                                raw.len(),
                                dimension
                            );
                        }
                        let vector = normalize(raw, dimension);
                        self.store.set_embedding(&candidate.article_id, &vector).await?;
                        stats.succeeded += 1;
                        if stats.succeeded % PROGRESS_EVERY == 0 {
                            info!("{} embeddings stored...", stats.succeeded);
                        }
                    }
                    Err(e) => {
                        stats.failed += 1;
                        warn!("Embed fail for {}: {}", candidate.article_id, e);
                    }
                }
            }

            info!(
                "Batch {}/{} done - stored: {}, failed: {}",
                index + 1,
                batch_count,
                stats.succeeded,
                stats.failed
            );
        }

        info!(
            "Stored {} embeddings ({} attempted, {} failed).",
            stats.succeeded, stats.attempted, stats.failed
        );
        Ok(stats)
    }

    async fn embed_one(&self, candidate: &PendingComment) -> Result<Vec<f32>> {
        let raw = self.client.embed(&self.model, &candidate.comment).await?;
        if raw.is_empty() {
            return Err(ArticleVecError::embedding_service("empty embedding"));
        }
        Ok(raw)
    }
}
