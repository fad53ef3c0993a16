use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::warn;

use crate::schema::FieldValue;

/// Non-identifier, non-embedding attributes of an article
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ArticleFields {
    pub art_date: Option<NaiveDate>,
    pub month: Option<String>,
    pub year: Option<i32>,
    pub compet_name: Option<String>,
    pub kpmg_total_impact: Option<f64>,
    pub deloitte_total_impact: Option<f64>,
    pub ey_total_impact: Option<f64>,
    pub pwc_total_impact: Option<f64>,
    pub issue: Option<String>,
    pub industry: Option<String>,
    pub comments: Option<String>,
    pub spokesperson_name: Option<String>,
}

impl ArticleFields {
    /// Value of a schema column
    pub fn get(&self, column: &str) -> Option<FieldValue> {
        let value = match column {
            "artdate" => FieldValue::Date(self.art_date),
            "month" => FieldValue::Text(self.month.clone()),
            "year" => FieldValue::Int(self.year),
            "competname" => FieldValue::Text(self.compet_name.clone()),
            "kpmgtotalimpact" => FieldValue::Float(self.kpmg_total_impact),
            "deloittetotalimpact" => FieldValue::Float(self.deloitte_total_impact),
            "eytotalimpact" => FieldValue::Float(self.ey_total_impact),
            "pwctotalimpact" => FieldValue::Float(self.pwc_total_impact),
            "issue" => FieldValue::Text(self.issue.clone()),
            "industry" => FieldValue::Text(self.industry.clone()),
            "comments" => FieldValue::Text(self.comments.clone()),
            "spokespersonname" => FieldValue::Text(self.spokesperson_name.clone()),
            _ => return None,
        };
        Some(value)
    }

    /// Assign a schema column; values of the wrong kind are ignored
    pub fn set(&mut self, column: &str, value: FieldValue) {
        match (column, value) {
            ("artdate", FieldValue::Date(v)) => self.art_date = v,
            ("month", FieldValue::Text(v)) => self.month = v,
            ("year", FieldValue::Int(v)) => self.year = v,
            ("competname", FieldValue::Text(v)) => self.compet_name = v,
            ("kpmgtotalimpact", FieldValue::Float(v)) => self.kpmg_total_impact = v,
            ("deloittetotalimpact", FieldValue::Float(v)) => self.deloitte_total_impact = v,
            ("eytotalimpact", FieldValue::Float(v)) => self.ey_total_impact = v,
            ("pwctotalimpact", FieldValue::Float(v)) => self.pwc_total_impact = v,
            ("issue", FieldValue::Text(v)) => self.issue = v,
            ("industry", FieldValue::Text(v)) => self.industry = v,
            ("comments", FieldValue::Text(v)) => self.comments = v,
            ("spokespersonname", FieldValue::Text(v)) => self.spokesperson_name = v,
            (column, value) => warn!("Ignoring {:?} for column {}", value, column),
        }
    }

    /// Comment text when present and non-blank
    pub fn comment_text(&self) -> Option<&str> {
        self.comments.as_deref().filter(|c| !c.trim().is_empty())
    }
}

/// Parsed input row ready for upsert
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleRow {
    pub article_id: String,
    pub fields: ArticleFields,
}

/// Stored article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Article {
    pub article_id: String,
    #[serde(flatten)]
    pub fields: ArticleFields,
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Article {
    pub fn has_embedding(&self) -> bool {
        self.embedding.is_some()
    }

    /// Whether the article is in the embedding candidate set
    pub fn is_pending(&self) -> bool {
        self.embedding.is_none() && self.fields.comment_text().is_some()
    }
}

/// Result of a single upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// First sight of the identifier
    Inserted,
    /// Existing row overwritten
    Updated {
        /// An existing embedding was dropped because the comment changed
        embedding_cleared: bool,
    },
}

/// Article awaiting an embedding
#[derive(Debug, Clone, PartialEq)]
pub struct PendingComment {
    pub article_id: String,
    pub comment: String,
}

/// Nearest-neighbour match
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub article: Article,
    /// Euclidean distance to the query (lower is closer)
    pub distance: f64,
}

/// Raw embedding counts read from the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbeddingCounts {
    pub total: u64,
    pub embedded: u64,
    pub pending: u64,
}

/// Counters reported by an import run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportStats {
    pub inserted: usize,
    pub updated: usize,
    pub skipped: usize,
    pub errors: usize,
    /// Updated rows whose embedding was invalidated
    pub embeddings_cleared: usize,
}

impl ImportStats {
    /// Rows written (inserted or updated)
    pub fn written(&self) -> usize {
        self.inserted + self.updated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ARTICLE_SCHEMA;

    #[test]
    fn test_every_schema_column_is_mapped() {
        let fields = ArticleFields::default();
        for spec in ARTICLE_SCHEMA {
            let value = fields.get(spec.column).expect(spec.column);
            assert_eq!(value, spec.kind.null(), "kind mismatch for {}", spec.column);
        }
    }

    #[test]
    fn test_set_roundtrips_through_get() {
        let mut fields = ArticleFields::default();
        fields.set("year", FieldValue::Int(Some(2025)));
        fields.set("comments", FieldValue::Text(Some("rates".to_string())));
        assert_eq!(fields.year, Some(2025));
        assert_eq!(fields.get("comments"), Some(FieldValue::Text(Some("rates".to_string()))));

        // wrong kind leaves the field untouched
        fields.set("year", FieldValue::Text(Some("x".to_string())));
        assert_eq!(fields.year, Some(2025));
    }

    #[test]
    fn test_blank_comment_is_not_text() {
        let mut fields = ArticleFields::default();
        assert!(fields.comment_text().is_none());
        fields.comments = Some("   ".to_string());
        assert!(fields.comment_text().is_none());
        fields.comments = Some("a".to_string());
        assert_eq!(fields.comment_text(), Some("a"));
    }
}
