//! Tabular article import with idempotent upsert

use articlevec_common::{ArticleVecError, Result};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::schema::{parse_cell, ARTICLE_SCHEMA, ID_HEADER};
use crate::store::ArticleStore;
use crate::types::{ArticleFields, ArticleRow, ImportStats, UpsertOutcome};

/// Rows between progress log lines
const PROGRESS_EVERY: usize = 200;

/// Row diagnostics logged before going quiet
const MAX_LOGGED_ROW_ERRORS: usize = 5;

/// One input row keyed by header
///
/// Header lookups ignore case, surrounding whitespace and a UTF-8 BOM.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    cells: HashMap<String, String>,
}

impl RawRow {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize_header(header: &str) -> String {
        header.trim_start_matches('\u{feff}').trim().to_lowercase()
    }

    /// Add or replace a cell
    pub fn insert(&mut self, header: &str, value: impl Into<String>) {
        self.cells.insert(Self::normalize_header(header), value.into());
    }

    /// Cell under `header`
    pub fn get(&self, header: &str) -> Option<&str> {
        self.cells.get(&Self::normalize_header(header)).map(String::as_str)
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for RawRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = RawRow::new();
        for (header, value) in iter {
            row.insert(header.as_ref(), value);
        }
        row
    }
}

/// Map a raw row onto the schema.
///
/// Returns `None` when the identifier is missing, otherwise the parsed row
/// and one `RowParse` error per cell that degraded to null.
pub fn parse_row(raw: &RawRow) -> Option<(ArticleRow, Vec<ArticleVecError>)> {
    let article_id = raw.get(ID_HEADER).map(str::trim).filter(|id| !id.is_empty())?;

    let mut fields = ArticleFields::default();
    let mut errors = Vec::new();
    for spec in ARTICLE_SCHEMA {
        let value = match parse_cell(spec.kind, raw.get(spec.header)) {
            Ok(value) => value,
            Err((null, reason)) => {
                errors.push(ArticleVecError::row_parse(format!(
                    "article {} column {}: {}",
                    article_id, spec.header, reason
                )));
                null
            }
        };
        fields.set(spec.column, value);
    }

    Some((
        ArticleRow {
            article_id: article_id.to_string(),
            fields,
        },
        errors,
    ))
}

/// Writes parsed rows into an [`ArticleStore`]
pub struct Ingestor {
    store: Arc<dyn ArticleStore>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Upsert every row, continuing past row-level failures.
    ///
    /// Only datastore failures abort the run.
    pub async fn ingest_rows<I>(&self, rows: I) -> Result<ImportStats>
    where
        I: IntoIterator<Item = RawRow>,
    {
        let mut stats = ImportStats::default();
        for raw in rows {
            self.ingest_row(&raw, &mut stats).await?;
        }
        info!(
            "Import finished - inserted: {}, updated: {}, skipped: {}, errors: {}",
            stats.inserted, stats.updated, stats.skipped, stats.errors
        );
        Ok(stats)
    }

    /// Import a CSV file with a header row
    pub async fn ingest_csv(&self, path: &Path) -> Result<ImportStats> {
        if !path.is_file() {
            return Err(ArticleVecError::not_found(format!("CSV not found: {}", path.display())));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| ArticleVecError::invalid_input(format!("failed to open {}: {}", path.display(), e)))?;
        let headers = reader
            .headers()
            .map_err(|e| ArticleVecError::invalid_input(format!("failed to read CSV header: {}", e)))?
            .clone();

        info!("Importing {}", path.display());
        let mut stats = ImportStats::default();
        for (index, record) in reader.records().enumerate() {
            match record {
                Ok(record) => {
                    let raw: RawRow = headers.iter().zip(record.iter()).collect();
                    self.ingest_row(&raw, &mut stats).await?;
                }
                Err(e) => {
                    stats.errors += 1;
                    if stats.errors <= MAX_LOGGED_ROW_ERRORS {
                        warn!("Row {} unreadable: {}", index + 2, e);
                    }
                }
            }
        }

        info!(
            "Imported {} rows from {} (inserted: {}, updated: {}, skipped: {}, errors: {})",
            stats.written(),
            path.display(),
            stats.inserted,
            stats.updated,
            stats.skipped,
            stats.errors
        );
        Ok(stats)
    }

    async fn ingest_row(&self, raw: &RawRow, stats: &mut ImportStats) -> Result<()> {
        let Some((row, cell_errors)) = parse_row(raw) else {
            stats.skipped += 1;
            debug!("Skipping row without {}", ID_HEADER);
            return Ok(());
        };

        for err in &cell_errors {
            if stats.errors < MAX_LOGGED_ROW_ERRORS {
                warn!("{}", err);
            }
            stats.errors += 1;
        }

        match self.store.upsert(&row).await {
            Ok(UpsertOutcome::Inserted) => stats.inserted += 1,
            Ok(UpsertOutcome::Updated { embedding_cleared }) => {
                stats.updated += 1;
                if embedding_cleared {
                    stats.embeddings_cleared += 1;
                    debug!("Comment changed, embedding cleared: {}", row.article_id);
                }
            }
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                stats.errors += 1;
                warn!("Row skip for {}: {}", row.article_id, e);
                return Ok(());
            }
        }

        if stats.written() % PROGRESS_EVERY == 0 {
            info!("Imported {} rows...", stats.written());
        }
        Ok(())
    }
}
