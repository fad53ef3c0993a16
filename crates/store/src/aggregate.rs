//! Period metrics feeding the summary report

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::period::Period;
use crate::schema::{field, FieldValue};
use crate::types::Article;

/// Impact columns in tie-break priority order
pub const IMPACT_COLUMNS: &[&str] = &[
    "kpmgtotalimpact",
    "pwctotalimpact",
    "deloittetotalimpact",
    "eytotalimpact",
];

const MONTHS: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpokespersonCount {
    #[serde(rename = "spokespersonname")]
    pub name: String,
    pub article_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyCount {
    pub month: Option<String>,
    pub year: Option<i32>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaxImpact {
    #[serde(rename = "articleid")]
    pub article_id: String,
    pub impact: f64,
    pub issue: Option<String>,
    #[serde(rename = "spokespersonname")]
    pub spokesperson: Option<String>,
}

/// Metrics over the articles of a period
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Aggregates {
    pub total_articles: usize,
    pub top_spokesperson: Option<SpokespersonCount>,
    pub monthly_counts: Vec<MonthlyCount>,
    /// CSV header of the detected impact column
    pub company_impact_field: Option<String>,
    pub avg_impact: Option<f64>,
    pub max_impact: Option<MaxImpact>,
    pub impact_distribution: BTreeMap<String, usize>,
}

fn impact(article: &Article, column: &str) -> Option<f64> {
    match article.fields.get(column) {
        Some(FieldValue::Float(v)) => v,
        _ => None,
    }
}

fn month_index(month: Option<&str>) -> usize {
    month
        .and_then(|m| m.get(..3))
        .map(str::to_lowercase)
        .and_then(|m| MONTHS.iter().position(|name| *name == m))
        .unwrap_or(MONTHS.len())
}

fn bucket(value: f64) -> &'static str {
    if value < 1.0 {
        "0_1"
    } else if value < 3.0 {
        "1_3"
    } else if value < 6.0 {
        "3_6"
    } else {
        "6_10"
    }
}

/// Impact column with the most values; ties go to the earlier priority
pub fn detect_impact_column<'a, I>(articles: I) -> Option<&'static str>
where
    I: IntoIterator<Item = &'a Article> + Clone,
{
    IMPACT_COLUMNS
        .iter()
        .map(|column| {
            let count = articles.clone().into_iter().filter(|a| impact(a, column).is_some()).count();
            (*column, count)
        })
        .filter(|(_, count)| *count > 0)
        .fold(None, |best: Option<(&'static str, usize)>, candidate| match best {
            Some((_, best_count)) if best_count >= candidate.1 => best,
            _ => Some(candidate),
        })
        .map(|(column, _)| column)
}

/// Compute the report metrics, restricted to `period` when given
pub fn aggregate(articles: &[Article], period: Option<&Period>) -> Aggregates {
    let selected: Vec<&Article> = articles
        .iter()
        .filter(|a| match period {
            Some(p) => a.fields.art_date.map(|d| p.contains(d)).unwrap_or(false),
            None => true,
        })
        .collect();

    let mut aggregates = Aggregates {
        total_articles: selected.len(),
        ..Default::default()
    };

    let mut speakers: HashMap<&str, usize> = HashMap::new();
    for article in &selected {
        if let Some(name) = article.fields.spokesperson_name.as_deref().filter(|n| !n.trim().is_empty()) {
            *speakers.entry(name).or_default() += 1;
        }
    }
    aggregates.top_spokesperson = speakers
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| a_count.cmp(b_count).then_with(|| b_name.cmp(a_name)))
        .map(|(name, article_count)| SpokespersonCount {
            name: name.to_string(),
            article_count,
        });

    let mut monthly: HashMap<(Option<&str>, Option<i32>), usize> = HashMap::new();
    for article in &selected {
        *monthly
            .entry((article.fields.month.as_deref(), article.fields.year))
            .or_default() += 1;
    }
    let mut monthly: Vec<_> = monthly.into_iter().collect();
    monthly.sort_by_key(|((month, year), _)| (year.is_none(), *year, month_index(*month), month.map(str::to_string)));
    aggregates.monthly_counts = monthly
        .into_iter()
        .map(|((month, year), count)| MonthlyCount {
            month: month.map(str::to_string),
            year,
            count,
        })
        .collect();

    let Some(column) = detect_impact_column(selected.iter().copied()) else {
        return aggregates;
    };
    aggregates.company_impact_field = field(column).map(|spec| spec.header.to_string());

    let impacts: Vec<(&Article, f64)> = selected
        .iter()
        .filter_map(|a| impact(a, column).map(|v| (*a, v)))
        .collect();

    aggregates.avg_impact = Some(impacts.iter().map(|(_, v)| v).sum::<f64>() / impacts.len() as f64);

    // first maximum in identifier order wins
    aggregates.max_impact = impacts
        .iter()
        .fold(None, |best: Option<&(&Article, f64)>, candidate| match best {
            Some(b) if b.1 >= candidate.1 => Some(b),
            _ => Some(candidate),
        })
        .map(|(article, value)| MaxImpact {
            article_id: article.article_id.clone(),
            impact: *value,
            issue: article.fields.issue.clone(),
            spokesperson: article.fields.spokesperson_name.clone(),
        });

    for (_, value) in &impacts {
        *aggregates
            .impact_distribution
            .entry(bucket(*value).to_string())
            .or_default() += 1;
    }

    aggregates
}
