//! User-selected restrictions applied before analysis.

use crate::product::{ProductRow, ProductTable};

/// Brand and category sets plus an inclusive score range.
///
/// An empty set places no restriction on that field; a non-empty set
/// excludes rows where the field is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFilter {
    pub brands: Vec<String>,
    pub categories: Vec<String>,
    pub score_range: (f64, f64),
}

impl Default for ProductFilter {
    fn default() -> Self {
        Self {
            brands: Vec::new(),
            categories: Vec::new(),
            score_range: (0.0, 10.0),
        }
    }
}

fn selected(choices: &[String], value: Option<&str>) -> bool {
    choices.is_empty() || value.is_some_and(|v| choices.iter().any(|c| c == v))
}

impl ProductFilter {
    pub fn matches(&self, row: &ProductRow) -> bool {
        let (min, max) = self.score_range;
        selected(&self.brands, row.brands.as_deref())
            && selected(&self.categories, row.categories.as_deref())
            && (min..=max).contains(&row.nutrient_score)
    }

    pub fn apply(&self, table: &ProductTable) -> ProductTable {
        let rows = table
            .rows()
            .iter()
            .filter(|r| self.matches(r))
            .cloned()
            .collect();
        ProductTable::new(rows)
    }
}
