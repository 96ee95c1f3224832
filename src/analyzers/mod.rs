//! Read-only aggregation queries over a product table or a filtered subset.
//!
//! Every function accepts an empty table: counts come back as zero,
//! statistics as `None` and rankings as empty lists.

pub mod distribution;
pub mod insights;
pub mod rankings;
pub mod summary;
pub mod types;
pub mod utility;

pub use distribution::{category_analysis, nutrient_distribution};
pub use insights::{healthiest_summary, salt_exceedance};
pub use rankings::{
    additive_prevalence, brand_concentration, healthiest_products, top_brands, top_categories,
};
pub use summary::{completeness, data_quality_metrics, summary_stats};
