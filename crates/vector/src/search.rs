use articlevec_common::{ArticleVecError, Result};
use articlevec_llm::LlmClient;
use articlevec_store::{ArticleStore, SearchHit};
use std::sync::Arc;
use tracing::{debug, info};

use crate::normalize::normalize;

/// Nearest-neighbour lookup over stored comment embeddings
pub struct SimilaritySearcher {
    store: Arc<dyn ArticleStore>,
    client: Arc<dyn LlmClient>,
    model: String,
}

impl SimilaritySearcher {
    pub fn new(store: Arc<dyn ArticleStore>, client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            store,
            client,
            model: model.into(),
        }
    }

    /// Up to `k` articles closest to `query`, nearest first.
    ///
    /// Embedding failures are returned to the caller rather than producing
    /// an empty result.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        debug!("Searching for: {} (k={})", query, k);

        let raw = self.client.embed(&self.model, query).await?;
        if raw.is_empty() {
            return Err(ArticleVecError::embedding_service("empty query embedding"));
        }
        let query_vector = normalize(raw, self.store.dimension());

        let hits = self.store.nearest(&query_vector, k).await?;
        info!("Search completed - {} results", hits.len());
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlevec_llm::GenerateRequest;
    use articlevec_store::{ArticleFields, ArticleRow, MemoryArticleStore};
    use async_trait::async_trait;

    /// Maps a query to a fixed point; rejects blank text
    struct PointEmbedder(Vec<f32>);

    #[async_trait]
    impl LlmClient for PointEmbedder {
        async fn generate(&self, _request: GenerateRequest) -> Result<String> {
            Err(ArticleVecError::llm("not supported"))
        }

        async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
            if text.trim().is_empty() {
                return Err(ArticleVecError::embedding_service("empty input"));
            }
            Ok(self.0.clone())
        }
    }

    async fn store_with(points: &[(&str, [f32; 2])]) -> Arc<MemoryArticleStore> {
        let store = Arc::new(MemoryArticleStore::new(2));
        for (id, point) in points {
            store
                .upsert(&ArticleRow {
                    article_id: id.to_string(),
                    fields: ArticleFields {
                        comments: Some(format!("comment {}", id)),
                        ..Default::default()
                    },
                })
                .await
                .unwrap();
            store.set_embedding(id, point).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_ranked_by_distance_with_id_tiebreak() {
        let store = store_with(&[("c", [1.0, 0.0]), ("a", [0.0, 1.0]), ("b", [3.0, 0.0]), ("d", [0.0, 0.0])]).await;
        // query is truncated from 3 to 2 dimensions
        let searcher = SimilaritySearcher::new(store, Arc::new(PointEmbedder(vec![0.0, 0.0, 9.0])), "m");

        let hits = searcher.search("rates", 3).await.unwrap();
        let ids: Vec<_> = hits.iter().map(|h| h.article.article_id.as_str()).collect();
        assert_eq!(ids, vec!["d", "a", "c"]);
        assert_eq!(hits[0].distance, 0.0);
        assert_eq!(hits[1].distance, hits[2].distance);

        let again = searcher.search("rates", 3).await.unwrap();
        assert_eq!(hits, again);
    }

    #[tokio::test]
    async fn test_fewer_embedded_than_k() {
        let store = store_with(&[("1", [1.0, 1.0])]).await;
        store
            .upsert(&ArticleRow {
                article_id: "2".to_string(),
                fields: ArticleFields::default(),
            })
            .await
            .unwrap();
        let searcher = SimilaritySearcher::new(store, Arc::new(PointEmbedder(vec![0.0])), "m");

        assert_eq!(searcher.search("q", 10).await.unwrap().len(), 1);
        assert!(searcher.search("q", 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rejected_query_is_an_error() {
        let store = store_with(&[("1", [1.0, 1.0])]).await;
        let searcher = SimilaritySearcher::new(store, Arc::new(PointEmbedder(vec![0.0, 0.0])), "m");

        let err = searcher.search("  ", 5).await.unwrap_err();
        assert!(matches!(err, ArticleVecError::EmbeddingService(_)));
    }
}
