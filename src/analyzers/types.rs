//! Result types produced by the analyzers.
//!
//! Statistics that cannot be computed on an empty subset are `None`; they
//! serialize as `null` in JSON and as an empty field in CSV.

use serde::Serialize;

/// Headline KPIs for a table subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStats {
    pub total_products: usize,
    pub unique_brands: usize,
    pub unique_categories: usize,
    pub avg_nutrient_score: Option<f64>,
    pub data_completeness: Option<f64>,
    pub products_with_allergens: Option<f64>,
    pub products_with_additives: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandCount {
    pub brand: String,
    pub product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub product_count: usize,
}

/// How much of the subset the largest brands account for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrandConcentration {
    pub total_brands: usize,
    pub top_brand_share: Option<f64>,
    pub top5_brands_share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NutrientDistribution {
    pub nutrient: String,
    pub mean: Option<f64>,
    pub median: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub q25: Option<f64>,
    pub q75: Option<f64>,
}

/// Mean nutrient profile of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStats {
    pub category: String,
    pub nutrient_score: Option<f64>,
    pub sugars_100g: Option<f64>,
    pub fat_100g: Option<f64>,
    pub salt_100g: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthiestProduct {
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub categories: Option<String>,
    pub nutrient_score: f64,
    pub proteins_100g: Option<f64>,
    pub sugars_100g: Option<f64>,
    pub fat_100g: Option<f64>,
    pub salt_100g: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdditivePrevalence {
    pub additive: String,
    pub occurrence_count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnNullFraction {
    pub column: String,
    pub null_fraction: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QualityMetrics {
    /// One entry per table column, in column order.
    pub missing_values: Vec<ColumnNullFraction>,
    pub completeness_score: Option<f64>,
    pub duplicate_products: usize,
    pub products_with_images: Option<f64>,
}

/// Products above a per-100g salt limit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaltExceedance {
    pub salt_limit: f64,
    pub product_count: usize,
    pub percentage: Option<f64>,
}

/// Headline figures of a healthiest-products ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthiestSummary {
    pub product_count: usize,
    pub best_score: Option<f64>,
    pub avg_sugars_100g: Option<f64>,
    pub avg_salt_100g: Option<f64>,
}
