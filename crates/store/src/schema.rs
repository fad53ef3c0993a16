//! Column layout of the `articles` table
//!
//! The descriptor is the single source for CSV header mapping, cell parsing,
//! table DDL and row decoding.

use chrono::NaiveDate;
use serde::Serialize;

/// Table name
pub const ARTICLES_TABLE: &str = "articles";

/// Primary key column
pub const ID_COLUMN: &str = "articleid";

/// CSV header carrying the primary key
pub const ID_HEADER: &str = "ArticleID";

/// Free-text column that gets embedded
pub const COMMENT_COLUMN: &str = "comments";

/// Vector column holding the comment embedding
pub const EMBEDDING_COLUMN: &str = "comments_embedding";

/// Accepted date layouts, tried in order
pub const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y"];

/// Storage type of an attribute column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bounded string
    Varchar(u16),
    /// Unbounded string
    Text,
    /// 32-bit integer
    Int,
    /// Double precision float
    Float,
    /// Calendar date
    Date,
}

impl FieldKind {
    /// SQL type used in the table definition
    pub fn sql_type(&self) -> String {
        match self {
            Self::Varchar(len) => format!("VARCHAR({})", len),
            Self::Text => "TEXT".to_string(),
            Self::Int => "INT".to_string(),
            Self::Float => "DOUBLE PRECISION".to_string(),
            Self::Date => "DATE".to_string(),
        }
    }

    /// Null value of this kind
    pub fn null(&self) -> FieldValue {
        match self {
            Self::Varchar(_) | Self::Text => FieldValue::Text(None),
            Self::Int => FieldValue::Int(None),
            Self::Float => FieldValue::Float(None),
            Self::Date => FieldValue::Date(None),
        }
    }
}

/// One attribute column
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Column name in the table
    pub column: &'static str,
    /// Header name in CSV input
    pub header: &'static str,
    /// Storage type
    pub kind: FieldKind,
}

/// Attribute columns in table order (identifier, embedding and timestamps excluded)
pub const ARTICLE_SCHEMA: &[FieldSpec] = &[
    FieldSpec { column: "artdate", header: "ArtDate", kind: FieldKind::Date },
    FieldSpec { column: "month", header: "Month", kind: FieldKind::Varchar(20) },
    FieldSpec { column: "year", header: "Year", kind: FieldKind::Int },
    FieldSpec { column: "competname", header: "CompetName", kind: FieldKind::Varchar(255) },
    FieldSpec { column: "kpmgtotalimpact", header: "KPMGTotalImpact", kind: FieldKind::Float },
    FieldSpec { column: "deloittetotalimpact", header: "DeloitteTotalImpact", kind: FieldKind::Float },
    FieldSpec { column: "eytotalimpact", header: "EYTotalImpact", kind: FieldKind::Float },
    FieldSpec { column: "pwctotalimpact", header: "PwCTotalImpact", kind: FieldKind::Float },
    FieldSpec { column: "issue", header: "Issue", kind: FieldKind::Text },
    FieldSpec { column: "industry", header: "Industry", kind: FieldKind::Varchar(255) },
    FieldSpec { column: COMMENT_COLUMN, header: "Comments", kind: FieldKind::Text },
    FieldSpec { column: "spokespersonname", header: "SpokespersonName", kind: FieldKind::Varchar(255) },
];

/// Look up a column's descriptor
pub fn field(column: &str) -> Option<&'static FieldSpec> {
    ARTICLE_SCHEMA.iter().find(|spec| spec.column == column)
}

/// Typed cell value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(Option<String>),
    Int(Option<i32>),
    Float(Option<f64>),
    Date(Option<NaiveDate>),
}

/// Parse a raw CSV cell into a value of `kind`
///
/// Blank cells are null. `Err` carries the null value together with a
/// description when the cell was present but unparsable.
pub fn parse_cell(kind: FieldKind, raw: Option<&str>) -> Result<FieldValue, (FieldValue, String)> {
    let raw = match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return Ok(kind.null()),
    };

    match kind {
        FieldKind::Varchar(_) | FieldKind::Text => Ok(FieldValue::Text(Some(raw.to_string()))),
        FieldKind::Int => {
            if raw.chars().all(|c| c.is_ascii_digit()) {
                raw.parse()
                    .map(|v| FieldValue::Int(Some(v)))
                    .map_err(|_| (kind.null(), format!("integer out of range: {}", raw)))
            } else {
                Err((kind.null(), format!("not an integer: {}", raw)))
            }
        }
        FieldKind::Float => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(|v| FieldValue::Float(Some(v)))
            .ok_or_else(|| (kind.null(), format!("not a number: {}", raw))),
        FieldKind::Date => DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
            .map(|d| FieldValue::Date(Some(d)))
            .ok_or_else(|| (kind.null(), format!("unrecognised date: {}", raw))),
    }
}

/// `CREATE TABLE` statement for an embedding column of width `dim`
pub fn create_table_sql(dim: usize) -> String {
    let mut columns = vec![format!("{} VARCHAR(255) PRIMARY KEY", ID_COLUMN)];
    columns.extend(
        ARTICLE_SCHEMA
            .iter()
            .map(|spec| format!("{} {}", spec.column, spec.kind.sql_type())),
    );
    columns.push(format!("{} vector({})", EMBEDDING_COLUMN, dim));
    columns.push("created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());
    columns.push("updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()".to_string());

    format!(
        "CREATE TABLE IF NOT EXISTS {} (\n    {}\n)",
        ARTICLES_TABLE,
        columns.join(",\n    ")
    )
}

/// Secondary indexes created alongside the table
pub fn index_sql() -> Vec<String> {
    ["year", "industry", "competname"]
        .iter()
        .map(|column| {
            format!(
                "CREATE INDEX IF NOT EXISTS idx_{table}_{column} ON {table}({column})",
                table = ARTICLES_TABLE,
                column = column
            )
        })
        .collect()
}
