//! Whole-table KPIs and data-quality metrics.

use std::collections::HashSet;

use crate::analyzers::types::{ColumnNullFraction, QualityMetrics, SummaryStats};
use crate::analyzers::utility::{mean, pct, round_to};
use crate::product::{Column, ProductTable};

/// Average over all columns of the non-null fraction, as a percentage.
pub fn completeness(table: &ProductTable) -> Option<f64> {
    if table.is_empty() {
        return None;
    }
    let filled: usize = Column::ALL
        .iter()
        .map(|&c| table.rows().iter().filter(|r| !r.is_null(c)).count())
        .sum();
    pct(filled, table.len() * Column::ALL.len())
}

pub fn summary_stats(table: &ProductTable) -> SummaryStats {
    let rows = table.rows();
    let total = rows.len();

    let unique_brands: HashSet<&str> = rows.iter().filter_map(|r| r.brands.as_deref()).collect();
    let unique_categories: HashSet<&str> =
        rows.iter().filter_map(|r| r.categories.as_deref()).collect();

    let with_allergens = rows
        .iter()
        .filter(|r| r.allergens_count.is_some_and(|c| c > 0))
        .count();
    let with_additives = rows
        .iter()
        .filter(|r| r.additives_count.is_some_and(|c| c > 0))
        .count();

    SummaryStats {
        total_products: total,
        unique_brands: unique_brands.len(),
        unique_categories: unique_categories.len(),
        avg_nutrient_score: mean(&table.values(Column::NutrientScore)).map(|m| round_to(m, 2)),
        data_completeness: completeness(table).map(|p| round_to(p, 1)),
        products_with_allergens: pct(with_allergens, total).map(|p| round_to(p, 1)),
        products_with_additives: pct(with_additives, total).map(|p| round_to(p, 1)),
    }
}

pub fn data_quality_metrics(table: &ProductTable) -> QualityMetrics {
    let rows = table.rows();
    let total = rows.len();

    let missing_values = Column::ALL
        .iter()
        .map(|&c| {
            let nulls = rows.iter().filter(|r| r.is_null(c)).count();
            ColumnNullFraction {
                column: c.name().to_string(),
                null_fraction: pct(nulls, total).map(|p| round_to(p / 100.0, 3)),
            }
        })
        .collect();

    let unique_codes: HashSet<&str> = rows.iter().map(|r| r.code.as_str()).collect();
    let with_images = rows.iter().filter(|r| r.image_url.is_some()).count();

    QualityMetrics {
        missing_values,
        completeness_score: completeness(table).map(|p| round_to(p, 1)),
        duplicate_products: total - unique_codes.len(),
        products_with_images: pct(with_images, total).map(|p| round_to(p, 1)),
    }
}
