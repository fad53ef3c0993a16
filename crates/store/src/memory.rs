//! In-process article store
//!
//! Mirrors the Postgres store's semantics over a `BTreeMap`, which keeps
//! identifier order for free.

use articlevec_common::{ArticleVecError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::store::ArticleStore;
use crate::types::{Article, ArticleRow, EmbeddingCounts, PendingComment, SearchHit, UpsertOutcome};

/// Article store kept in memory
#[derive(Debug)]
pub struct MemoryArticleStore {
    dimension: usize,
    articles: RwLock<BTreeMap<String, Article>>,
}

impl MemoryArticleStore {
    /// Create an empty store with the given embedding width
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            articles: RwLock::new(BTreeMap::new()),
        }
    }
}

/// Euclidean distance, matching pgvector's `<->`
pub fn l2_distance(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = f64::from(*x) - f64::from(*y);
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

#[async_trait]
impl ArticleStore for MemoryArticleStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, row: &ArticleRow) -> Result<UpsertOutcome> {
        let now = Utc::now();
        let mut articles = self.articles.write().await;

        match articles.get_mut(&row.article_id) {
            Some(existing) => {
                let comment_changed = existing.fields.comments != row.fields.comments;
                let embedding_cleared = comment_changed && existing.embedding.is_some();
                if comment_changed {
                    existing.embedding = None;
                }
                existing.fields = row.fields.clone();
                existing.updated_at = now;
                Ok(UpsertOutcome::Updated { embedding_cleared })
            }
            None => {
                articles.insert(
                    row.article_id.clone(),
                    Article {
                        article_id: row.article_id.clone(),
                        fields: row.fields.clone(),
                        embedding: None,
                        created_at: now,
                        updated_at: now,
                    },
                );
                Ok(UpsertOutcome::Inserted)
            }
        }
    }

    async fn get(&self, article_id: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(article_id).cloned())
    }

    async fn pending_embeddings(&self, limit: Option<usize>) -> Result<Vec<PendingComment>> {
        let articles = self.articles.read().await;
        Ok(articles
            .values()
            .filter(|a| a.is_pending())
            .filter_map(|a| {
                a.fields.comment_text().map(|comment| PendingComment {
                    article_id: a.article_id.clone(),
                    comment: comment.to_string(),
                })
            })
            .take(limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn set_embedding(&self, article_id: &str, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(ArticleVecError::invalid_input(format!(
                "expected {} dimensions, not {}",
                self.dimension,
                embedding.len()
            )));
        }

        let mut articles = self.articles.write().await;
        let article = articles
            .get_mut(article_id)
            .ok_or_else(|| ArticleVecError::not_found(format!("article {}", article_id)))?;
        article.embedding = Some(embedding.to_vec());
        article.updated_at = Utc::now();
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        let articles = self.articles.read().await;
        let mut hits: Vec<SearchHit> = articles
            .values()
            .filter_map(|a| {
                a.embedding.as_ref().map(|emb| SearchHit {
                    distance: l2_distance(query, emb),
                    article: a.clone(),
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.article.article_id.cmp(&b.article.article_id))
        });
        hits.truncate(k);
        Ok(hits)
    }

    async fn counts(&self) -> Result<EmbeddingCounts> {
        let articles = self.articles.read().await;
        Ok(EmbeddingCounts {
            total: articles.len() as u64,
            embedded: articles.values().filter(|a| a.has_embedding()).count() as u64,
            pending: articles.values().filter(|a| a.is_pending()).count() as u64,
        })
    }

    async fn articles(&self) -> Result<Vec<Article>> {
        Ok(self.articles.read().await.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ArticleFields;

    fn row(id: &str, comment: Option<&str>) -> ArticleRow {
        ArticleRow {
            article_id: id.to_string(),
            fields: ArticleFields {
                comments: comment.map(str::to_string),
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_l2_distance() {
        assert_eq!(l2_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(l2_distance(&[1.0], &[1.0]), 0.0);
    }

    #[tokio::test]
    async fn test_upsert_keeps_embedding_when_comment_unchanged() {
        let store = MemoryArticleStore::new(2);
        assert_eq!(store.upsert(&row("1", Some("a"))).await.unwrap(), UpsertOutcome::Inserted);
        store.set_embedding("1", &[1.0, 2.0]).await.unwrap();

        let mut changed = row("1", Some("a"));
        changed.fields.issue = Some("Rates".to_string());
        assert_eq!(
            store.upsert(&changed).await.unwrap(),
            UpsertOutcome::Updated { embedding_cleared: false }
        );
        let article = store.get("1").await.unwrap().unwrap();
        assert_eq!(article.embedding, Some(vec![1.0, 2.0]));
        assert_eq!(article.fields.issue.as_deref(), Some("Rates"));
    }

    #[tokio::test]
    async fn test_upsert_clears_embedding_on_comment_change() {
        let store = MemoryArticleStore::new(2);
        store.upsert(&row("1", Some("a"))).await.unwrap();
        store.set_embedding("1", &[1.0, 2.0]).await.unwrap();

        assert_eq!(
            store.upsert(&row("1", Some("b"))).await.unwrap(),
            UpsertOutcome::Updated { embedding_cleared: true }
        );
        assert!(store.get("1").await.unwrap().unwrap().embedding.is_none());
        assert_eq!(store.articles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_set_embedding_rejects_wrong_width() {
        let store = MemoryArticleStore::new(3);
        store.upsert(&row("1", Some("a"))).await.unwrap();
        assert!(store.set_embedding("1", &[1.0]).await.is_err());
        assert!(store.set_embedding("missing", &[1.0, 2.0, 3.0]).await.is_err());
    }

    #[tokio::test]
    async fn test_pending_order_and_limit() {
        let store = MemoryArticleStore::new(1);
        for (id, comment) in [("3", Some("c")), ("1", Some("a")), ("2", None), ("4", Some(""))] {
            store.upsert(&row(id, comment)).await.unwrap();
        }

        let pending = store.pending_embeddings(None).await.unwrap();
        let ids: Vec<_> = pending.iter().map(|p| p.article_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3"]);

        let capped = store.pending_embeddings(Some(1)).await.unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped[0].article_id, "1");
    }
}
