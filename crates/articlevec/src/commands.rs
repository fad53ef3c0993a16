//! Command implementations shared by the subcommands and the default pipeline

use anyhow::{Context, Result};
use articlevec_common::AppConfig;
use articlevec_llm::{LlmClient, OllamaClient, ReportSummarizer};
use articlevec_store::{aggregate, ensure_database, ArticleStore, ImportStats, Ingestor, PgArticleStore, Period};
use articlevec_vector::{EmbedStats, EmbeddingBatcher, SimilaritySearcher, StatusReport, StatusReporter};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Characters of comment shown per search hit
const SNIPPET_CHARS: usize = 160;

pub async fn open_store(config: &AppConfig) -> Result<Arc<PgArticleStore>> {
    let store = PgArticleStore::connect(config)
        .await
        .with_context(|| format!("cannot reach database {}", config.pg_db))?;
    Ok(Arc::new(store))
}

fn ollama(config: &AppConfig) -> Result<Arc<OllamaClient>> {
    let client = OllamaClient::new(config.ollama_base_url.as_str())?.with_embed_retries(config.embed_max_retries);
    Ok(Arc::new(client))
}

/// Ollama client that has answered a health check
async fn checked_ollama(config: &AppConfig) -> Result<Arc<OllamaClient>> {
    let client = ollama(config)?;
    let healthy = client
        .test_connection()
        .await
        .with_context(|| format!("cannot reach Ollama at {}", client.base_url()))?;
    if !healthy {
        anyhow::bail!("Ollama at {} answered with an error status", client.base_url());
    }
    Ok(client)
}

/// Create the database when missing, then its extension, table and indexes
pub async fn create_db(config: &AppConfig) -> Result<Arc<PgArticleStore>> {
    if ensure_database(config).await? {
        println!("Created database {}", config.pg_db);
    } else {
        println!("Database {} ready", config.pg_db);
    }
    create_table(config).await
}

pub async fn create_table(config: &AppConfig) -> Result<Arc<PgArticleStore>> {
    let store = open_store(config).await?;
    store.ensure_schema().await?;
    println!("Table ready (vector dimension {})", store.dimension());
    Ok(store)
}

pub async fn import(store: Arc<dyn ArticleStore>, path: &Path) -> Result<ImportStats> {
    let stats = Ingestor::new(store).ingest_csv(path).await?;
    println!(
        "Imported {} rows from {} (inserted {}, updated {}, skipped {}, errors {})",
        stats.written(),
        path.display(),
        stats.inserted,
        stats.updated,
        stats.skipped,
        stats.errors
    );
    if stats.embeddings_cleared > 0 {
        println!("{} embeddings invalidated by changed comments", stats.embeddings_cleared);
    }
    Ok(stats)
}

pub async fn embed(
    config: &AppConfig,
    store: Arc<dyn ArticleStore>,
    batch_size: usize,
    limit: Option<usize>,
) -> Result<EmbedStats> {
    let client = checked_ollama(config).await?;
    if let Err(e) = client.ensure_model(&config.embed_model).await {
        warn!("Could not ensure model {}: {}", config.embed_model, e);
    }

    let batcher = EmbeddingBatcher::new(store, client, config.embed_model.as_str());
    let stats = batcher.embed_pending(batch_size, limit).await?;
    println!(
        "Embedded {} of {} pending articles ({} failed)",
        stats.succeeded, stats.attempted, stats.failed
    );
    Ok(stats)
}

pub async fn status(store: Arc<dyn ArticleStore>) -> Result<StatusReport> {
    let report = StatusReporter::new(store).status().await?;
    println!("{}", report);
    Ok(report)
}

pub async fn similar(config: &AppConfig, store: Arc<dyn ArticleStore>, query: &str, k: usize) -> Result<()> {
    let client = checked_ollama(config).await?;
    let searcher = SimilaritySearcher::new(store, client, config.embed_model.as_str());
    let hits = searcher
        .search(query, k)
        .await
        .context("similarity search failed")?;

    if hits.is_empty() {
        println!("No embedded articles.");
        return Ok(());
    }
    for hit in hits {
        let comment = hit.article.fields.comments.as_deref().unwrap_or_default();
        println!("{}\t{:.6}\t{}", hit.article.article_id, hit.distance, snippet(comment));
    }
    Ok(())
}

pub async fn report(config: &AppConfig, csv: Option<&Path>, period: Option<&str>) -> Result<()> {
    let period = period.map(Period::parse).transpose()?;
    let store: Arc<dyn ArticleStore> = create_table(config).await?;
    let mut errors = Vec::new();

    let csv = csv.unwrap_or(config.articles_csv.as_path());
    if csv.is_file() {
        let stats = import(store.clone(), csv).await?;
        if stats.errors > 0 {
            errors.push(format!("{} rows imported with errors", stats.errors));
        }
    } else {
        info!("No CSV at {}, reporting on stored articles", csv.display());
    }

    let articles = store.articles().await?;
    let aggregates = aggregate(&articles, period.as_ref());
    if aggregates.total_articles > 0 && aggregates.company_impact_field.is_none() {
        errors.push("no impact column detected".to_string());
    }

    let aggregates = serde_json::to_value(&aggregates)?;
    let client: Arc<dyn LlmClient> = ollama(config)?;
    let summary = ReportSummarizer::new(client, config.llm_model.as_str())
        .summarize(&aggregates)
        .await?;

    if let Some(period) = &period {
        println!("Period: {}", period);
    }
    println!("{}", serde_json::to_string_pretty(&aggregates)?);
    println!();
    println!("Summary:\n{}", summary);
    if !errors.is_empty() {
        println!();
        println!("Errors:");
        for error in &errors {
            println!("- {}", error);
        }
    }
    Ok(())
}

/// Run create, import, embed and status against the configured defaults
pub async fn default_pipeline(config: &AppConfig) -> Result<()> {
    let store: Arc<dyn ArticleStore> = create_db(config).await?;

    // a missing default CSV ends the run before any embedding work
    import(store.clone(), &config.articles_csv)
        .await
        .with_context(|| format!("default CSV import failed (ARTICLES_CSV={})", config.articles_csv.display()))?;

    embed(config, store.clone(), 50, config.auto_embed_limit).await?;
    status(store).await?;
    Ok(())
}

fn snippet(comment: &str) -> String {
    let flat = comment.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        flat
    } else {
        let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
        format!("{}...", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snippet() {
        assert_eq!(snippet("  short\n comment "), "short comment");

        let long = "word ".repeat(100);
        let cut = snippet(&long);
        assert!(cut.ends_with("..."));
        assert!(cut.chars().count() <= SNIPPET_CHARS + 3);
    }

    #[tokio::test]
    async fn test_unreachable_ollama_is_an_error() {
        // nothing listens on the discard port
        let config = AppConfig {
            ollama_base_url: "http://127.0.0.1:9".to_string(),
            ..Default::default()
        };
        let err = checked_ollama(&config).await.unwrap_err();
        assert!(err.to_string().contains("cannot reach Ollama"), "{}", err);
    }

    #[test]
    fn test_snippet_multibyte() {
        let long = "é".repeat(SNIPPET_CHARS + 10);
        assert_eq!(snippet(&long).chars().count(), SNIPPET_CHARS + 3);
    }
}
