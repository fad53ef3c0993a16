//! articlevec article storage
//!
//! Schema descriptor, the [`ArticleStore`] capability trait with Postgres
//! and in-memory backends, CSV ingestion and period aggregates.

pub mod aggregate;
pub mod ingest;
pub mod memory;
pub mod period;
pub mod postgres;
pub mod schema;
mod store;
mod types;

pub use aggregate::{aggregate, Aggregates, MaxImpact, MonthlyCount, SpokespersonCount};
pub use ingest::{parse_row, Ingestor, RawRow};
pub use memory::MemoryArticleStore;
pub use period::Period;
pub use postgres::{ensure_database, PgArticleStore};
pub use store::ArticleStore;
pub use types::{
    Article, ArticleFields, ArticleRow, EmbeddingCounts, ImportStats, PendingComment, SearchHit,
    UpsertOutcome,
};
