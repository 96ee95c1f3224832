//! Per-nutrient distribution statistics and per-category nutrient profiles.

use std::collections::BTreeMap;

use crate::analyzers::types::{CategoryStats, NutrientDistribution};
use crate::analyzers::utility::{mean, quantile, round_to, sample_stddev};
use crate::error::AnalysisError;
use crate::product::{Column, ProductRow, ProductTable};

/// Distribution of a numeric column, absent values skipped, rounded to 2 decimals.
///
/// # Errors
///
/// Fails before computing anything when `nutrient` is not a column of the
/// table or is not numeric.
pub fn nutrient_distribution(
    table: &ProductTable,
    nutrient: &str,
) -> Result<NutrientDistribution, AnalysisError> {
    let column = table.numeric_column(nutrient)?;

    let mut values = table.values(column);
    values.sort_by(f64::total_cmp);

    let avg = mean(&values);
    let round = |v: Option<f64>| v.map(|v| round_to(v, 2));

    Ok(NutrientDistribution {
        nutrient: nutrient.to_string(),
        mean: round(avg),
        median: round(quantile(&values, 0.5)),
        std: round(avg.and_then(|m| sample_stddev(&values, m))),
        min: round(values.first().copied()),
        max: round(values.last().copied()),
        q25: round(quantile(&values, 0.25)),
        q75: round(quantile(&values, 0.75)),
    })
}

fn column_mean(rows: &[&ProductRow], column: Column) -> Option<f64> {
    let values: Vec<f64> = rows.iter().filter_map(|r| r.numeric(column)).collect();
    mean(&values).map(|m| round_to(m, 2))
}

/// Groups rows by category (ordered by name) and averages their key nutrients.
pub fn category_analysis(table: &ProductTable) -> Vec<CategoryStats> {
    let mut groups: BTreeMap<&str, Vec<&ProductRow>> = BTreeMap::new();
    for row in table.rows() {
        if let Some(category) = row.categories.as_deref() {
            groups.entry(category).or_default().push(row);
        }
    }

    groups
        .into_iter()
        .map(|(category, rows)| CategoryStats {
            category: category.to_string(),
            nutrient_score: column_mean(&rows, Column::NutrientScore),
            sugars_100g: column_mean(&rows, Column::Sugars),
            fat_100g: column_mean(&rows, Column::Fat),
            salt_100g: column_mean(&rows, Column::Salt),
            proteins_100g: column_mean(&rows, Column::Proteins),
            product_count: rows.len(),
        })
        .collect()
}
