//! Assembles the full analysis report and prints it.

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;
use tracing::debug;

use crate::analyzers::types::{
    AdditivePrevalence, BrandConcentration, BrandCount, CategoryCount, CategoryStats,
    HealthiestProduct, HealthiestSummary, NutrientDistribution, QualityMetrics, SaltExceedance,
    SummaryStats,
};
use crate::analyzers::{
    additive_prevalence, brand_concentration, category_analysis, data_quality_metrics,
    healthiest_products, healthiest_summary, nutrient_distribution, salt_exceedance,
    summary_stats, top_brands, top_categories,
};
use crate::error::AnalysisError;
use crate::product::ProductTable;

/// Nutrients whose distributions are included in every report.
pub const REPORT_NUTRIENTS: &[&str] = &[
    "energy_100g",
    "proteins_100g",
    "carbohydrates_100g",
    "sugars_100g",
    "fat_100g",
    "saturated-fat_100g",
    "salt_100g",
    "fiber_100g",
];

/// Everything the dashboard shows for one filtered subset.
#[derive(Debug, Serialize)]
pub struct Report {
    pub generated_at: DateTime<Utc>,
    pub data_updated_at: Option<DateTime<Utc>>,
    pub summary: SummaryStats,
    pub brand_concentration: BrandConcentration,
    pub top_brands: Vec<BrandCount>,
    pub top_categories: Vec<CategoryCount>,
    pub distributions: Vec<NutrientDistribution>,
    pub categories: Vec<CategoryStats>,
    pub healthiest: Vec<HealthiestProduct>,
    pub healthiest_summary: HealthiestSummary,
    pub high_salt: SaltExceedance,
    pub additives: Vec<AdditivePrevalence>,
    pub quality: QualityMetrics,
}

impl Report {
    /// `salt_limit` is the per-100g salt level counted in [`Report::high_salt`].
    pub fn build(
        table: &ProductTable,
        top_n: usize,
        nutrients: &[&str],
        salt_limit: f64,
        data_updated_at: Option<DateTime<Utc>>,
    ) -> Result<Self, AnalysisError> {
        let distributions = nutrients
            .iter()
            .map(|n| nutrient_distribution(table, n))
            .collect::<Result<Vec<_>, _>>()?;
        let healthiest = healthiest_products(table, top_n);

        Ok(Self {
            generated_at: Utc::now(),
            data_updated_at,
            summary: summary_stats(table),
            brand_concentration: brand_concentration(table),
            top_brands: top_brands(table, top_n),
            top_categories: top_categories(table, top_n),
            distributions,
            categories: category_analysis(table),
            healthiest_summary: healthiest_summary(&healthiest),
            healthiest,
            high_salt: salt_exceedance(table, salt_limit),
            additives: additive_prevalence(table, top_n),
            quality: data_quality_metrics(table),
        })
    }
}

/// Logs a report using Rust's debug pretty-print format.
pub fn print_pretty(report: &Report) {
    debug!("{:#?}", report);
}

/// Writes a report to stdout as pretty-printed JSON.
pub fn print_json(report: &Report) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, report)?;
    writeln!(stdout)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductRow;

    const SALT_LIMIT: f64 = 1.5;

    fn table() -> ProductTable {
        ProductTable::new(vec![
            ProductRow {
                code: "1".into(),
                brands: Some("Amul".into()),
                categories: Some("Dairies".into()),
                sugars_100g: Some(4.5),
                salt_100g: Some(0.1),
                additives_tags: Some(vec!["en:e330".into()]),
                additives_count: Some(1),
                nutrient_score: 6.0,
                ..Default::default()
            },
            ProductRow {
                code: "2".into(),
                brands: Some("Parle".into()),
                salt_100g: Some(1.8),
                nutrient_score: 3.0,
                ..Default::default()
            },
        ])
    }

    #[test]
    fn test_build_report() {
        let report = Report::build(&table(), 10, REPORT_NUTRIENTS, SALT_LIMIT, None).unwrap();
        assert_eq!(report.summary.total_products, 2);
        assert_eq!(report.distributions.len(), REPORT_NUTRIENTS.len());
        assert_eq!(report.top_brands.len(), 2);
        assert_eq!(report.healthiest[0].nutrient_score, 6.0);
        assert_eq!(report.additives[0].percentage, 50.0);
    }

    #[test]
    fn test_report_health_insights() {
        let report = Report::build(&table(), 1, &[], SALT_LIMIT, None).unwrap();
        assert_eq!(report.high_salt.product_count, 1);
        assert_eq!(report.high_salt.percentage, Some(50.0));

        assert_eq!(report.healthiest_summary.product_count, 1);
        assert_eq!(report.healthiest_summary.best_score, Some(6.0));
        assert_eq!(report.healthiest_summary.avg_sugars_100g, Some(4.5));
        assert_eq!(report.healthiest_summary.avg_salt_100g, Some(0.1));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["high_salt"]["salt_limit"], 1.5);
    }

    #[test]
    fn test_build_report_on_empty_table() {
        let report =
            Report::build(&ProductTable::default(), 10, REPORT_NUTRIENTS, SALT_LIMIT, None)
                .unwrap();
        assert_eq!(report.summary.total_products, 0);
        assert!(report.top_brands.is_empty());
        assert!(report.distributions.iter().all(|d| d.mean.is_none()));

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["summary"]["avg_nutrient_score"].is_null());
        assert!(json["high_salt"]["percentage"].is_null());
        assert!(json["healthiest_summary"]["best_score"].is_null());
    }

    #[test]
    fn test_build_report_rejects_unknown_nutrient() {
        let err = Report::build(&table(), 10, &["vitamin_c_100g"], SALT_LIMIT, None).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_print_pretty_does_not_panic() {
        let report = Report::build(&table(), 5, &[], SALT_LIMIT, None).unwrap();
        print_pretty(&report);
    }

    #[test]
    fn test_print_json_does_not_panic() {
        let report = Report::build(&table(), 5, &["salt_100g"], SALT_LIMIT, None).unwrap();
        print_json(&report).unwrap();
    }
}
