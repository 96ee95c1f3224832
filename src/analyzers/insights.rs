//! Health insights shown next to the rankings.

use crate::analyzers::types::{HealthiestProduct, HealthiestSummary, SaltExceedance};
use crate::analyzers::utility::{mean, pct, round_to};
use crate::product::ProductTable;

/// Rows whose salt is present and strictly above `salt_limit`.
pub fn salt_exceedance(table: &ProductTable, salt_limit: f64) -> SaltExceedance {
    let over = table
        .rows()
        .iter()
        .filter(|r| r.salt_100g.is_some_and(|s| s > salt_limit))
        .count();

    SaltExceedance {
        salt_limit,
        product_count: over,
        percentage: pct(over, table.len()).map(|p| round_to(p, 1)),
    }
}

/// Best score and mean sugars/salt over a ranking; missing nutrients are skipped.
pub fn healthiest_summary(healthiest: &[HealthiestProduct]) -> HealthiestSummary {
    let sugars: Vec<f64> = healthiest.iter().filter_map(|p| p.sugars_100g).collect();
    let salt: Vec<f64> = healthiest.iter().filter_map(|p| p.salt_100g).collect();

    HealthiestSummary {
        product_count: healthiest.len(),
        best_score: healthiest.iter().map(|p| p.nutrient_score).reduce(f64::max),
        avg_sugars_100g: mean(&sugars).map(|m| round_to(m, 2)),
        avg_salt_100g: mean(&salt).map(|m| round_to(m, 2)),
    }
}
