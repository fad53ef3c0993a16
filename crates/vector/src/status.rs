use articlevec_common::Result;
use articlevec_store::ArticleStore;
use std::sync::Arc;
use tracing::debug;

use crate::types::StatusReport;

/// Reads embedding coverage counts
pub struct StatusReporter {
    store: Arc<dyn ArticleStore>,
}

impl StatusReporter {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    pub async fn status(&self) -> Result<StatusReport> {
        let counts = self.store.counts().await?;
        let report = StatusReport {
            total: counts.total,
            embedded: counts.embedded,
            pending: counts.pending,
            without_text: counts.total.saturating_sub(counts.embedded + counts.pending),
        };
        debug!("{:?}", report);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use articlevec_store::{ArticleFields, ArticleRow, MemoryArticleStore};

    #[tokio::test]
    async fn test_counts_partition_total() {
        let store = Arc::new(MemoryArticleStore::new(1));
        for (id, comment) in [("1", Some("a")), ("2", None), ("3", Some("c"))] {
            store
                .upsert(&ArticleRow {
                    article_id: id.to_string(),
                    fields: ArticleFields {
                        comments: comment.map(str::to_string),
                        ..Default::default()
                    },
                })
                .await
                .unwrap();
        }
        store.set_embedding("1", &[0.5]).await.unwrap();

        let report = StatusReporter::new(store).status().await.unwrap();
        assert_eq!(report, StatusReport { total: 3, embedded: 1, pending: 1, without_text: 1 });
        assert_eq!(report.embedded + report.pending + report.without_text, report.total);
    }

    #[tokio::test]
    async fn test_empty_store() {
        let report = StatusReporter::new(Arc::new(MemoryArticleStore::new(4)))
            .status()
            .await
            .unwrap();
        assert_eq!(report, StatusReport::default());
    }
}
