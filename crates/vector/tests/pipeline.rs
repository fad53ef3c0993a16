//! Import, embed, search and status against the in-memory store

use articlevec_common::{ArticleVecError, Result};
use articlevec_llm::{GenerateRequest, LlmClient};
use articlevec_store::{ArticleStore, Ingestor, MemoryArticleStore, RawRow};
use articlevec_vector::{EmbedStats, EmbeddingBatcher, SimilaritySearcher, StatusReport, StatusReporter};
use async_trait::async_trait;
use std::sync::Arc;

const DIM: usize = 4;

/// Counts the letters a-d; fails on "boom"
struct LetterEmbedder;

#[async_trait]
impl LlmClient for LetterEmbedder {
    async fn generate(&self, _request: GenerateRequest) -> Result<String> {
        Err(ArticleVecError::llm("not supported"))
    }

    async fn embed(&self, _model: &str, text: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(ArticleVecError::embedding_service("empty input"));
        }
        if text.contains("boom") {
            return Err(ArticleVecError::embedding_service("model crashed"));
        }
        Ok(['a', 'b', 'c', 'd']
            .iter()
            .map(|letter| text.chars().filter(|c| c == letter).count() as f32)
            .collect())
    }
}

fn row(id: &str, comment: &str) -> RawRow {
    [("ArticleID", id), ("Comments", comment), ("Year", "2025")]
        .into_iter()
        .collect()
}

struct Pipeline {
    store: Arc<MemoryArticleStore>,
    ingestor: Ingestor,
    batcher: EmbeddingBatcher,
    searcher: SimilaritySearcher,
    reporter: StatusReporter,
}

fn pipeline() -> Pipeline {
    let store = Arc::new(MemoryArticleStore::new(DIM));
    let client: Arc<dyn LlmClient> = Arc::new(LetterEmbedder);
    Pipeline {
        ingestor: Ingestor::new(store.clone()),
        batcher: EmbeddingBatcher::new(store.clone(), client.clone(), "letters"),
        searcher: SimilaritySearcher::new(store.clone(), client, "letters"),
        reporter: StatusReporter::new(store.clone()),
        store,
    }
}

#[tokio::test]
async fn test_import_embed_and_reimport() {
    let p = pipeline();

    let stats = p
        .ingestor
        .ingest_rows(vec![row("1", "abc"), row("2", ""), row("3", "dd")])
        .await
        .unwrap();
    assert_eq!(stats.inserted, 3);
    assert_eq!(stats.errors, 0);

    let embedded = p.batcher.embed_pending(50, None).await.unwrap();
    assert_eq!(embedded, EmbedStats { attempted: 2, succeeded: 2, failed: 0 });
    assert_eq!(
        p.reporter.status().await.unwrap(),
        StatusReport { total: 3, embedded: 2, pending: 0, without_text: 1 }
    );

    // same comment keeps the embedding, a new one clears it
    let stats = p.ingestor.ingest_rows(vec![row("3", "dd"), row("1", "bbb")]).await.unwrap();
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.embeddings_cleared, 1);

    let status = p.reporter.status().await.unwrap();
    assert_eq!(status, StatusReport { total: 3, embedded: 1, pending: 1, without_text: 1 });

    let pending = p.store.pending_embeddings(None).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].article_id, "1");
    assert_eq!(pending[0].comment, "bbb");
}

#[tokio::test]
async fn test_reimport_is_idempotent() {
    let p = pipeline();
    let rows = || vec![row("1", "abc"), row("2", "cab")];

    p.ingestor.ingest_rows(rows()).await.unwrap();
    p.batcher.embed_pending(10, None).await.unwrap();
    let before = p.store.articles().await.unwrap();

    let stats = p.ingestor.ingest_rows(rows()).await.unwrap();
    assert_eq!(stats.inserted, 0);
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.embeddings_cleared, 0);

    let after = p.store.articles().await.unwrap();
    assert_eq!(after.len(), before.len());
    for (old, new) in before.iter().zip(after.iter()) {
        assert_eq!(old.article_id, new.article_id);
        assert_eq!(old.fields, new.fields);
        assert_eq!(old.embedding, new.embedding);
        assert_eq!(old.created_at, new.created_at);
    }
}

#[tokio::test]
async fn test_failed_records_stay_pending() {
    let p = pipeline();
    p.ingestor
        .ingest_rows(vec![
            row("1", "a"),
            row("2", "boom"),
            row("3", "b"),
            row("4", "boom again"),
            row("5", "c"),
        ])
        .await
        .unwrap();

    let stats = p.batcher.embed_pending(2, None).await.unwrap();
    assert_eq!(stats, EmbedStats { attempted: 5, succeeded: 3, failed: 2 });

    let status = p.reporter.status().await.unwrap();
    assert_eq!(status.embedded, 3);
    assert_eq!(status.pending, 2);
    assert_eq!(status.embedded + status.pending + status.without_text, status.total);

    // a second run only retries the failures
    let retry = p.batcher.embed_pending(2, None).await.unwrap();
    assert_eq!(retry, EmbedStats { attempted: 2, succeeded: 0, failed: 2 });
}

#[tokio::test]
async fn test_search_is_deterministic() {
    let p = pipeline();
    p.ingestor
        .ingest_rows(vec![
            row("20", "aa"),
            row("10", "bb"),
            row("30", "dddd"),
            row("40", "a"),
        ])
        .await
        .unwrap();
    p.batcher.embed_pending(50, None).await.unwrap();

    // "ab" is equidistant from "aa" and "bb"; the lower id ranks first
    let hits = p.searcher.search("ab", 3).await.unwrap();
    let ids: Vec<_> = hits.iter().map(|h| h.article.article_id.as_str()).collect();
    assert_eq!(ids, vec!["40", "10", "20"]);
    assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));

    assert_eq!(p.searcher.search("ab", 3).await.unwrap(), hits);
    assert_eq!(p.searcher.search("ab", 100).await.unwrap().len(), 4);
}

#[tokio::test]
async fn test_search_errors_surface() {
    let p = pipeline();
    p.ingestor.ingest_rows(vec![row("1", "abc")]).await.unwrap();
    p.batcher.embed_pending(50, None).await.unwrap();

    assert!(matches!(
        p.searcher.search("", 5).await,
        Err(ArticleVecError::EmbeddingService(_))
    ));
    assert!(p.searcher.search("boom", 5).await.is_err());
}
