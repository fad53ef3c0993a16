//! PostgreSQL + pgvector article store

use articlevec_common::{AppConfig, ArticleVecError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use pgvector::Vector;
use tokio_postgres::types::ToSql;
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, info, warn};

use crate::schema::{
    create_table_sql, index_sql, FieldKind, FieldValue, ARTICLES_TABLE, ARTICLE_SCHEMA,
    COMMENT_COLUMN, EMBEDDING_COLUMN, ID_COLUMN,
};
use crate::store::ArticleStore;
use crate::types::{
    Article, ArticleFields, ArticleRow, EmbeddingCounts, PendingComment, SearchHit, UpsertOutcome,
};

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// Whether a SQLSTATE rejects only the offending row.
///
/// Data exceptions (class 22) and integrity violations (class 23) are tied
/// to the values sent; everything else, including missing tables (42P01)
/// and privilege errors (42501), fails every following statement too.
fn is_row_level(sqlstate: &str) -> bool {
    sqlstate.starts_with("22") || sqlstate.starts_with("23")
}

fn map_pg_error(context: &str, err: tokio_postgres::Error) -> ArticleVecError {
    match err.code() {
        Some(state) if !err.is_closed() && is_row_level(state.code()) => {
            ArticleVecError::invalid_input(format!("{}: {}", context, err))
        }
        _ => ArticleVecError::datastore(format!("{}: {}", context, err)),
    }
}

async fn connect(conn_str: &str) -> Result<Client> {
    let (client, connection) = tokio_postgres::connect(conn_str, NoTls)
        .await
        .map_err(|e| ArticleVecError::datastore(format!("failed to connect to Postgres: {}", e)))?;
    tokio::spawn(async move {
        if let Err(err) = connection.await {
            tracing::error!("postgres connection error: {}", err);
        }
    });
    Ok(client)
}

/// Create the configured database when missing.
///
/// Returns whether the database was created. Failures (typically missing
/// privileges) are logged and skipped.
pub async fn ensure_database(config: &AppConfig) -> Result<bool> {
    let outcome = async {
        let client = connect(&config.connection_string_for("postgres")).await?;
        let exists = client
            .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&config.pg_db])
            .await
            .map_err(|e| map_pg_error("failed to look up database", e))?
            .is_some();
        if exists {
            return Ok(false);
        }
        client
            .batch_execute(&format!("CREATE DATABASE {}", quote_ident(&config.pg_db)))
            .await
            .map_err(|e| map_pg_error("failed to create database", e))?;
        Ok::<bool, ArticleVecError>(true)
    }
    .await;

    match outcome {
        Ok(true) => {
            info!("Created database {}", config.pg_db);
            Ok(true)
        }
        Ok(false) => {
            info!("Database {} exists", config.pg_db);
            Ok(false)
        }
        Err(e) => {
            warn!("Skipping database ensure (permissions?): {}", e);
            Ok(false)
        }
    }
}

/// Article store backed by a pgvector table
pub struct PgArticleStore {
    client: Client,
    dimension: usize,
}

impl PgArticleStore {
    /// Connect to the configured database
    pub async fn connect(config: &AppConfig) -> Result<Self> {
        let store = Self::connect_to(&config.connection_string(), config.embed_dim).await?;
        debug!("Connected to {}:{}/{}", config.pg_host, config.pg_port, config.pg_db);
        Ok(store)
    }

    /// Connect with an explicit connection string
    pub async fn connect_to(conn_str: &str, dimension: usize) -> Result<Self> {
        let client = connect(conn_str).await?;
        Ok(Self { client, dimension })
    }

    /// Ensure the vector extension, the table and its indexes exist
    pub async fn ensure_schema(&self) -> Result<()> {
        self.client
            .batch_execute("CREATE EXTENSION IF NOT EXISTS vector")
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to ensure pgvector extension: {}", e)))?;
        info!("pgvector extension ensured");

        self.client
            .batch_execute(&create_table_sql(self.dimension))
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to create table: {}", e)))?;
        for sql in index_sql() {
            self.client
                .batch_execute(&sql)
                .await
                .map_err(|e| ArticleVecError::datastore(format!("failed to create index: {}", e)))?;
        }
        info!("Table '{}' ensured", ARTICLES_TABLE);
        Ok(())
    }

    fn select_columns() -> String {
        let mut columns = vec![ID_COLUMN.to_string()];
        columns.extend(ARTICLE_SCHEMA.iter().map(|spec| spec.column.to_string()));
        columns.push(EMBEDDING_COLUMN.to_string());
        columns.push("created_at".to_string());
        columns.push("updated_at".to_string());
        columns.join(", ")
    }

    fn upsert_sql() -> String {
        let attr_columns: Vec<&str> = ARTICLE_SCHEMA.iter().map(|spec| spec.column).collect();
        let placeholders: Vec<String> = (1..=attr_columns.len() + 1).map(|i| format!("${}", i)).collect();
        let updates: Vec<String> = attr_columns
            .iter()
            .map(|c| format!("{c} = EXCLUDED.{c}", c = c))
            .collect();

        // The CTE snapshot still sees the pre-update row.
        format!(
            "WITH prev AS (
                SELECT {comment} AS comment, {embedding} IS NOT NULL AS had_embedding
                FROM {table} WHERE {id} = $1
            )
            INSERT INTO {table} ({id}, {columns}) VALUES ({placeholders})
            ON CONFLICT ({id}) DO UPDATE SET
                {updates},
                {embedding} = CASE
                    WHEN {table}.{comment} IS DISTINCT FROM EXCLUDED.{comment} THEN NULL
                    ELSE {table}.{embedding}
                END,
                updated_at = NOW()
            RETURNING (xmax = 0) AS inserted,
                COALESCE((SELECT had_embedding AND comment IS DISTINCT FROM {table}.{comment} FROM prev), false)
                    AS embedding_cleared",
            table = ARTICLES_TABLE,
            id = ID_COLUMN,
            comment = COMMENT_COLUMN,
            embedding = EMBEDDING_COLUMN,
            columns = attr_columns.join(", "),
            placeholders = placeholders.join(", "),
            updates = updates.join(",\n                "),
        )
    }

    fn to_param(value: FieldValue) -> Box<dyn ToSql + Sync + Send> {
        match value {
            FieldValue::Text(v) => Box::new(v),
            FieldValue::Int(v) => Box::new(v),
            FieldValue::Float(v) => Box::new(v),
            FieldValue::Date(v) => Box::new(v),
        }
    }

    fn decode_article(row: &Row) -> Result<Article> {
        let decode = |e: tokio_postgres::Error| ArticleVecError::datastore(format!("failed to decode row: {}", e));

        let mut fields = ArticleFields::default();
        for spec in ARTICLE_SCHEMA {
            let value = match spec.kind {
                FieldKind::Varchar(_) | FieldKind::Text => {
                    FieldValue::Text(row.try_get::<_, Option<String>>(spec.column).map_err(decode)?)
                }
                FieldKind::Int => FieldValue::Int(row.try_get::<_, Option<i32>>(spec.column).map_err(decode)?),
                FieldKind::Float => FieldValue::Float(row.try_get::<_, Option<f64>>(spec.column).map_err(decode)?),
                FieldKind::Date => {
                    FieldValue::Date(row.try_get::<_, Option<NaiveDate>>(spec.column).map_err(decode)?)
                }
            };
            fields.set(spec.column, value);
        }

        Ok(Article {
            article_id: row.try_get(ID_COLUMN).map_err(decode)?,
            fields,
            embedding: row
                .try_get::<_, Option<Vector>>(EMBEDDING_COLUMN)
                .map_err(decode)?
                .map(|v| v.to_vec()),
            created_at: row.try_get::<_, DateTime<Utc>>("created_at").map_err(decode)?,
            updated_at: row.try_get::<_, DateTime<Utc>>("updated_at").map_err(decode)?,
        })
    }
}

fn as_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[async_trait]
impl ArticleStore for PgArticleStore {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn upsert(&self, row: &ArticleRow) -> Result<UpsertOutcome> {
        let mut params: Vec<Box<dyn ToSql + Sync + Send>> = vec![Box::new(row.article_id.clone())];
        for spec in ARTICLE_SCHEMA {
            let value = row.fields.get(spec.column).unwrap_or_else(|| spec.kind.null());
            params.push(Self::to_param(value));
        }
        let refs: Vec<&(dyn ToSql + Sync)> = params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        let result = self
            .client
            .query_one(&Self::upsert_sql(), &refs)
            .await
            .map_err(|e| map_pg_error(&format!("failed to upsert article {}", row.article_id), e))?;

        let inserted: bool = result
            .try_get("inserted")
            .map_err(|e| ArticleVecError::datastore(e.to_string()))?;
        if inserted {
            Ok(UpsertOutcome::Inserted)
        } else {
            let embedding_cleared: bool = result
                .try_get("embedding_cleared")
                .map_err(|e| ArticleVecError::datastore(e.to_string()))?;
            Ok(UpsertOutcome::Updated { embedding_cleared })
        }
    }

    async fn get(&self, article_id: &str) -> Result<Option<Article>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE {} = $1",
            Self::select_columns(),
            ARTICLES_TABLE,
            ID_COLUMN
        );
        let row = self
            .client
            .query_opt(&sql, &[&article_id])
            .await
            .map_err(|e| map_pg_error("failed to fetch article", e))?;
        row.as_ref().map(Self::decode_article).transpose()
    }

    async fn pending_embeddings(&self, limit: Option<usize>) -> Result<Vec<PendingComment>> {
        let sql = format!(
            "SELECT {id}, {comment} FROM {table}
             WHERE {comment} IS NOT NULL AND btrim({comment}) <> '' AND {embedding} IS NULL
             ORDER BY {id}
             LIMIT $1",
            id = ID_COLUMN,
            comment = COMMENT_COLUMN,
            table = ARTICLES_TABLE,
            embedding = EMBEDDING_COLUMN,
        );
        // LIMIT NULL means no limit
        let limit = limit.map(as_i64);
        let rows = self
            .client
            .query(&sql, &[&limit])
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to select pending rows: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(PendingComment {
                    article_id: row.try_get(0).map_err(|e| ArticleVecError::datastore(e.to_string()))?,
                    comment: row.try_get(1).map_err(|e| ArticleVecError::datastore(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn set_embedding(&self, article_id: &str, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension {
            return Err(ArticleVecError::invalid_input(format!(
                "expected {} dimensions, not {}",
                self.dimension,
                embedding.len()
            )));
        }

        let sql = format!(
            "UPDATE {} SET {} = $1, updated_at = NOW() WHERE {} = $2",
            ARTICLES_TABLE, EMBEDDING_COLUMN, ID_COLUMN
        );
        let vector = Vector::from(embedding.to_vec());
        let updated = self
            .client
            .execute(&sql, &[&vector, &article_id])
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to store embedding for {}: {}", article_id, e)))?;
        if updated == 0 {
            return Err(ArticleVecError::not_found(format!("article {}", article_id)));
        }
        Ok(())
    }

    async fn nearest(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {columns}, {embedding} <-> $1 AS distance FROM {table}
             WHERE {embedding} IS NOT NULL
             ORDER BY distance, {id}
             LIMIT $2",
            columns = Self::select_columns(),
            embedding = EMBEDDING_COLUMN,
            table = ARTICLES_TABLE,
            id = ID_COLUMN,
        );
        let vector = Vector::from(query.to_vec());
        let rows = self
            .client
            .query(&sql, &[&vector, &as_i64(k)])
            .await
            .map_err(|e| ArticleVecError::datastore(format!("similarity query failed: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(SearchHit {
                    article: Self::decode_article(row)?,
                    distance: row
                        .try_get("distance")
                        .map_err(|e| ArticleVecError::datastore(e.to_string()))?,
                })
            })
            .collect()
    }

    async fn counts(&self) -> Result<EmbeddingCounts> {
        let sql = format!(
            "SELECT COUNT(*) AS total,
                    COUNT({embedding}) AS embedded,
                    COUNT(*) FILTER (
                        WHERE {embedding} IS NULL AND {comment} IS NOT NULL AND btrim({comment}) <> ''
                    ) AS pending
             FROM {table}",
            embedding = EMBEDDING_COLUMN,
            comment = COMMENT_COLUMN,
            table = ARTICLES_TABLE,
        );
        let row = self
            .client
            .query_one(&sql, &[])
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to count articles: {}", e)))?;

        let count = |name: &str| -> Result<u64> {
            row.try_get::<_, i64>(name)
                .map(|v| v.max(0) as u64)
                .map_err(|e| ArticleVecError::datastore(e.to_string()))
        };
        Ok(EmbeddingCounts {
            total: count("total")?,
            embedded: count("embedded")?,
            pending: count("pending")?,
        })
    }

    async fn articles(&self) -> Result<Vec<Article>> {
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {}",
            Self::select_columns(),
            ARTICLES_TABLE,
            ID_COLUMN
        );
        let rows = self
            .client
            .query(&sql, &[])
            .await
            .map_err(|e| ArticleVecError::datastore(format!("failed to list articles: {}", e)))?;
        rows.iter().map(Self::decode_article).collect()
    }
}
