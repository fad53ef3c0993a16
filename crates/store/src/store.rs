use articlevec_common::Result;
use async_trait::async_trait;

use crate::types::{Article, ArticleRow, EmbeddingCounts, PendingComment, SearchHit, UpsertOutcome};

/// Capabilities the embedding subsystem needs from a datastore
///
/// Implementations hold exactly one record per identifier and a fixed
/// embedding width (`dimension`).
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Width of the embedding column
    fn dimension(&self) -> usize;

    /// Insert or overwrite the attributes of `row`.
    ///
    /// The stored embedding survives unless the comment text changed.
    async fn upsert(&self, row: &ArticleRow) -> Result<UpsertOutcome>;

    /// Fetch one article
    async fn get(&self, article_id: &str) -> Result<Option<Article>>;

    /// Articles with comment text and no embedding, by identifier ascending
    async fn pending_embeddings(&self, limit: Option<usize>) -> Result<Vec<PendingComment>>;

    /// Persist an embedding; its length must equal `dimension()`
    async fn set_embedding(&self, article_id: &str, embedding: &[f32]) -> Result<()>;

    /// Up to `k` embedded articles by ascending L2 distance, ties by identifier
    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>>;

    /// Total / embedded / pending counts
    async fn counts(&self) -> Result<EmbeddingCounts>;

    /// Every stored article, by identifier ascending
    async fn articles(&self) -> Result<Vec<Article>>;
}
