//! Immutable configuration for fetching, scoring and caching product data.
//!
//! Every component receives the slice of [`Config`] it needs at
//! construction; nothing reads process-wide state after startup.

use anyhow::{Result, ensure};
use std::time::Duration;

/// Fields kept from each raw record returned by the search endpoint.
pub const REQUIRED_FIELDS: &[&str] = &[
    "code",
    "product_name",
    "brands",
    "categories",
    "nutriments",
    "additives_tags",
    "allergens_tags",
    "ingredients_text",
    "nutrition_grades",
    "image_url",
];

/// What to do with a page that still fails after all retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageFailurePolicy {
    /// Log the failure, record the page as failed and move on to the next page.
    #[default]
    Skip,
    /// Stop the whole fetch and return the error.
    Abort,
}

/// Settings for talking to the OpenFoodFacts API.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base_url: String,
    pub country: String,
    pub page_size: u32,
    pub fields: Vec<String>,
    pub user_agent: String,
    pub retries: u32,
    pub retry_backoff: Duration,
    pub on_page_failure: PageFailurePolicy,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            base_url: "https://world.openfoodfacts.org".to_string(),
            country: "india".to_string(),
            page_size: 1000,
            fields: REQUIRED_FIELDS.iter().map(|f| f.to_string()).collect(),
            user_agent: format!("food_facts_rater/{}", env!("CARGO_PKG_VERSION")),
            retries: 2,
            retry_backoff: Duration::from_secs(1),
            on_page_failure: PageFailurePolicy::Skip,
        }
    }
}

/// A pair of per-100g cut-offs; exceeding `high` weighs more than exceeding `low`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub low: f64,
    pub high: f64,
}

/// Thresholds used by the nutrient score.
///
/// `min_score` must not exceed `max_score` and each band's `low` must not
/// exceed its `high`; [`ScoreConfig::validate`] checks both.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreConfig {
    pub neutral: f64,
    pub proteins: Band,
    pub sugars: Band,
    pub salt: Band,
    pub fiber_bonus_above: f64,
    pub saturated_fat_penalty_above: f64,
    pub min_score: f64,
    pub max_score: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            neutral: 5.0,
            proteins: Band {
                low: 8.0,
                high: 20.0,
            },
            sugars: Band {
                low: 5.0,
                high: 22.5,
            },
            salt: Band {
                low: 0.3,
                high: 1.5,
            },
            fiber_bonus_above: 3.5,
            saturated_fat_penalty_above: 5.0,
            min_score: 0.0,
            max_score: 10.0,
        }
    }
}

impl ScoreConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.min_score.is_finite() && self.max_score.is_finite(),
            "score bounds must be finite numbers"
        );
        ensure!(
            self.min_score <= self.max_score,
            "min_score {} is greater than max_score {}",
            self.min_score,
            self.max_score
        );
        for (name, band) in [
            ("proteins", self.proteins),
            ("sugars", self.sugars),
            ("salt", self.salt),
        ] {
            ensure!(
                band.low <= band.high,
                "{name} band low {} is greater than high {}",
                band.low,
                band.high
            );
        }
        Ok(())
    }
}

/// Where the normalized table lives and how long it stays fresh.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub data_file: String,
    pub staleness: Duration,
    pub max_pages: u32,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: "data/processed/openfoodfacts_india.csv".to_string(),
            staleness: Duration::from_secs(24 * 60 * 60),
            max_pages: 50,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub fetch: FetchConfig,
    pub score: ScoreConfig,
    pub store: StoreConfig,
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.score.validate()
    }
}
