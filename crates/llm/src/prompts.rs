//! Prompt templates for the period summary report

/// Instructions placed before the few-shot examples
pub const REPORT_PREFIX: &str = "You are an analyst assistant. Given aggregate media metrics produce an executive summary. \
Include: total articles, average impact (2dp) for the detected company impact field (company_impact_field), \
distribution buckets, highest impact article (id if available) with impact, issue and spokesperson, \
and top spokesperson overall. State 'not reported' where data is missing. \
Keep it concise (fewer than 6 sentences unless there are more than 1200 articles).";

/// Few-shot examples as (aggregates JSON, summary) pairs
pub const REPORT_EXAMPLES: &[(&str, &str)] = &[
    (
        r#"{"total_articles":42,"company_impact_field":"KPMGTotalImpact","avg_impact":2.87,"impact_distribution":{"0_1":9,"1_3":18,"3_6":11,"6_10":4},"max_impact":{"articleid":"A-1093","impact":8.5,"issue":"Birth rate decline","spokespersonname":"Dana Whitfield"},"top_spokesperson":{"spokespersonname":"Dana Whitfield","article_count":17}}"#,
        "Impact was led by a concentration of birth-rate coverage from Dana Whitfield, who also topped the spokesperson count with 17 of 42 articles. Average KPMG impact was 2.87, with most coverage in the 1-3 band and four standout pieces above 6. The highest impact article (A-1093, 8.5) addressed the birth rate decline.",
    ),
    (
        r#"{"total_articles":5,"company_impact_field":"PwCTotalImpact","avg_impact":0.64,"impact_distribution":{"0_1":4,"1_3":1},"max_impact":{"articleid":"P-220","impact":1.4,"issue":"Investment ranking","spokespersonname":null},"top_spokesperson":null}"#,
        "Minor impact period: five articles averaged 0.64 PwC impact, dominated by a single investment ranking reference (P-220, 1.4). No spokesperson was reported.",
    ),
];

/// Template for one rendered example
fn example_block(aggregates: &str, summary: &str) -> String {
    format!("Aggregates:\n{}\nSummary:\n{}\n---\n", aggregates, summary)
}

/// Full few-shot prompt for the given aggregates JSON
pub fn report_prompt(aggregates_json: &str) -> String {
    let examples: String = REPORT_EXAMPLES
        .iter()
        .map(|(aggregates, summary)| example_block(aggregates, summary))
        .collect();

    format!(
        "{}\n\n{}\nAggregates JSON (keys may be subset):\n{}\n\nSummary:",
        REPORT_PREFIX, examples, aggregates_json
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_prompt_contains_examples_and_input() {
        let prompt = report_prompt(r#"{"total_articles":3}"#);
        assert!(prompt.starts_with(REPORT_PREFIX));
        assert_eq!(prompt.matches("Aggregates:\n").count(), REPORT_EXAMPLES.len());
        assert!(prompt.ends_with("{\"total_articles\":3}\n\nSummary:"));
    }
}
