//! Turns raw API records into the normalized product table and persists it.

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::{Band, ScoreConfig};
use crate::product::{ProductRow, ProductTable, RawProduct};

/// Nutrient values per 100g pulled out of a record's `nutriments` object.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Nutriments {
    pub energy: Option<f64>,
    pub proteins: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub sugars: Option<f64>,
    pub fat: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub salt: Option<f64>,
    pub fiber: Option<f64>,
}

pub fn extract_nutriments(product: &RawProduct) -> Nutriments {
    Nutriments {
        energy: product.nutriment("energy_100g"),
        proteins: product.nutriment("proteins_100g"),
        carbohydrates: product.nutriment("carbohydrates_100g"),
        sugars: product.nutriment("sugars_100g"),
        fat: product.nutriment("fat_100g"),
        saturated_fat: product.nutriment("saturated-fat_100g"),
        salt: product.nutriment("salt_100g"),
        fiber: product.nutriment("fiber_100g"),
    }
}

/// True only when the value is present and strictly above `threshold`.
fn exceeds(value: Option<f64>, threshold: f64) -> bool {
    matches!(value, Some(v) if v > threshold)
}

/// +`high_step` above the high cut-off, +`low_step` above the low one, else 0.
fn band_adjustment(value: Option<f64>, band: Band, low_step: f64, high_step: f64) -> f64 {
    if exceeds(value, band.high) {
        high_step
    } else if exceeds(value, band.low) {
        low_step
    } else {
        0.0
    }
}

/// Heuristic 0-10 health score; higher is healthier. Absent nutrients never adjust it.
pub fn compute_nutrient_score(n: &Nutriments, config: &ScoreConfig) -> f64 {
    let mut score = config.neutral;

    score += band_adjustment(n.proteins, config.proteins, 1.0, 2.0);
    if exceeds(n.fiber, config.fiber_bonus_above) {
        score += 1.0;
    }

    score -= band_adjustment(n.sugars, config.sugars, 1.0, 2.0);
    score -= band_adjustment(n.salt, config.salt, 1.0, 2.0);
    if exceeds(n.saturated_fat, config.saturated_fat_penalty_above) {
        score -= 1.0;
    }

    // not f64::clamp, which panics on inverted bounds
    score.max(config.min_score).min(config.max_score)
}

/// First entry of a comma-separated list, trimmed.
fn first_listed(value: Option<&str>) -> Option<String> {
    value
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Normalizes a single record. Records without an identifier yield `None`.
pub fn normalize_product(product: &RawProduct, config: &ScoreConfig) -> Option<ProductRow> {
    let code = product.code()?;
    let nutriments = extract_nutriments(product);
    let additives_tags = product.tags("additives_tags");
    let allergens_tags = product.tags("allergens_tags");

    Some(ProductRow {
        code,
        product_name: product.str_field("product_name").map(str::to_string),
        brands: first_listed(product.str_field("brands")),
        categories: first_listed(product.str_field("categories")),
        additives_count: additives_tags.as_ref().map(Vec::len),
        allergens_count: allergens_tags.as_ref().map(Vec::len),
        additives_tags,
        allergens_tags,
        ingredients_text: product.str_field("ingredients_text").map(str::to_string),
        nutrition_grades: product.str_field("nutrition_grades").map(str::to_string),
        image_url: product.str_field("image_url").map(str::to_string),
        energy_100g: nutriments.energy,
        proteins_100g: nutriments.proteins,
        carbohydrates_100g: nutriments.carbohydrates,
        sugars_100g: nutriments.sugars,
        fat_100g: nutriments.fat,
        saturated_fat_100g: nutriments.saturated_fat,
        salt_100g: nutriments.salt,
        fiber_100g: nutriments.fiber,
        nutrient_score: compute_nutrient_score(&nutriments, config),
    })
}

/// Builds the normalized table, keeping the first record seen for each identifier.
pub fn products_to_table(products: &[RawProduct], config: &ScoreConfig) -> ProductTable {
    let mut seen = HashSet::new();
    let mut rows = Vec::with_capacity(products.len());
    let mut missing_code = 0usize;

    for product in products {
        let Some(row) = normalize_product(product, config) else {
            missing_code += 1;
            continue;
        };
        if seen.insert(row.code.clone()) {
            rows.push(row);
        }
    }

    if missing_code > 0 {
        warn!(dropped = missing_code, "Records without a product code were dropped");
    }
    debug!(raw = products.len(), rows = rows.len(), "Products normalized");

    ProductTable::new(rows)
}

/// Writes the table as UTF-8 CSV with a header row, creating parent directories.
pub fn save_table(table: &ProductTable, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating directory {}", parent.display()))?;
    }

    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = WriterBuilder::new().has_headers(true).from_writer(file);
    // serde only emits the header alongside the first row
    if table.is_empty() {
        writer.write_record(table.column_names())?;
    }
    for row in table.rows() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    info!(path = %path.display(), rows = table.len(), "Product table saved");
    Ok(())
}

pub fn load_table(path: &Path) -> Result<ProductTable> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let mut reader = ReaderBuilder::new().has_headers(true).from_reader(file);

    let mut rows = Vec::new();
    for result in reader.deserialize() {
        let row: ProductRow = result.with_context(|| format!("reading {}", path.display()))?;
        rows.push(row);
    }

    debug!(path = %path.display(), rows = rows.len(), "Product table loaded");
    Ok(ProductTable::new(rows))
}
