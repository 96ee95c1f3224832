//! Top-N queries. Ties always keep first-appearance order.

use std::collections::HashMap;

use crate::analyzers::types::{
    AdditivePrevalence, BrandConcentration, BrandCount, CategoryCount, HealthiestProduct,
};
use crate::analyzers::utility::{pct, round_to};
use crate::product::ProductTable;

/// Occurrence counts in order of first appearance.
fn value_counts<'a>(values: impl Iterator<Item = &'a str>) -> Vec<(&'a str, usize)> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut counts: Vec<(&str, usize)> = Vec::new();

    for value in values {
        match index.get(value) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(value, counts.len());
                counts.push((value, 1));
            }
        }
    }

    counts
}

/// The `n` largest counts, descending. The sort is stable, so ties stay in
/// first-appearance order.
fn largest(mut counts: Vec<(&str, usize)>, n: usize) -> Vec<(&str, usize)> {
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(n);
    counts
}

pub fn top_brands(table: &ProductTable, n: usize) -> Vec<BrandCount> {
    let counts = value_counts(table.rows().iter().filter_map(|r| r.brands.as_deref()));
    largest(counts, n)
        .into_iter()
        .map(|(brand, product_count)| BrandCount {
            brand: brand.to_string(),
            product_count,
        })
        .collect()
}

pub fn top_categories(table: &ProductTable, n: usize) -> Vec<CategoryCount> {
    let counts = value_counts(table.rows().iter().filter_map(|r| r.categories.as_deref()));
    largest(counts, n)
        .into_iter()
        .map(|(category, product_count)| CategoryCount {
            category: category.to_string(),
            product_count,
        })
        .collect()
}

/// Share of all rows held by the biggest brand and by the five biggest.
pub fn brand_concentration(table: &ProductTable) -> BrandConcentration {
    let brands = top_brands(table, usize::MAX);
    let top_one = brands.first().map_or(0, |b| b.product_count);
    let top_five: usize = brands.iter().take(5).map(|b| b.product_count).sum();

    BrandConcentration {
        total_brands: brands.len(),
        top_brand_share: pct(top_one, table.len()).map(|p| round_to(p, 1)),
        top5_brands_share: pct(top_five, table.len()).map(|p| round_to(p, 1)),
    }
}

pub fn healthiest_products(table: &ProductTable, n: usize) -> Vec<HealthiestProduct> {
    let mut rows: Vec<_> = table.rows().iter().collect();
    rows.sort_by(|a, b| b.nutrient_score.total_cmp(&a.nutrient_score));

    rows.into_iter()
        .take(n)
        .map(|r| HealthiestProduct {
            product_name: r.product_name.clone(),
            brands: r.brands.clone(),
            categories: r.categories.clone(),
            nutrient_score: r.nutrient_score,
            proteins_100g: r.proteins_100g,
            sugars_100g: r.sugars_100g,
            fat_100g: r.fat_100g,
            salt_100g: r.salt_100g,
        })
        .collect()
}

/// Most frequent additive tags; `percentage` is relative to the row count.
pub fn additive_prevalence(table: &ProductTable, n: usize) -> Vec<AdditivePrevalence> {
    let tags = table
        .rows()
        .iter()
        .filter_map(|r| r.additives_tags.as_ref())
        .flatten()
        .map(String::as_str);

    largest(value_counts(tags), n)
        .into_iter()
        .filter_map(|(additive, occurrence_count)| {
            let percentage = pct(occurrence_count, table.len())?;
            Some(AdditivePrevalence {
                additive: additive.to_string(),
                occurrence_count,
                percentage: round_to(percentage, 1),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductRow;

    fn branded(code: &str, brand: &str) -> ProductRow {
        ProductRow {
            code: code.into(),
            brands: Some(brand.into()),
            ..Default::default()
        }
    }

    fn scored(code: &str, score: f64) -> ProductRow {
        ProductRow {
            code: code.into(),
            nutrient_score: score,
            ..Default::default()
        }
    }

    fn tagged(code: &str, tags: &[&str]) -> ProductRow {
        ProductRow {
            code: code.into(),
            additives_tags: Some(tags.iter().map(|t| t.to_string()).collect()),
            ..Default::default()
        }
    }

    #[test]
    fn test_top_brands_descending_with_first_appearance_ties() {
        let table = ProductTable::new(vec![
            branded("1", "Parle"),
            branded("2", "Britannia"),
            branded("3", "Amul"),
            branded("4", "Amul"),
            branded("5", "Britannia"),
            branded("6", "Haldiram"),
            ProductRow {
                code: "7".into(),
                ..Default::default()
            },
        ]);

        let top = top_brands(&table, 3);
        let names: Vec<_> = top.iter().map(|b| (b.brand.as_str(), b.product_count)).collect();
        assert_eq!(names, vec![("Britannia", 2), ("Amul", 2), ("Parle", 1)]);
    }

    #[test]
    fn test_top_n_returns_min_of_n_and_groups() {
        let table = ProductTable::new(vec![branded("1", "A"), branded("2", "B")]);
        assert_eq!(top_brands(&table, 10).len(), 2);
        assert_eq!(top_brands(&table, 1).len(), 1);
        assert!(top_brands(&table, 0).is_empty());
    }

    #[test]
    fn test_top_categories() {
        let mut rows = vec![branded("1", "A"), branded("2", "B"), branded("3", "C")];
        rows[0].categories = Some("Snacks".into());
        rows[1].categories = Some("Beverages".into());
        rows[2].categories = Some("Beverages".into());

        let top = top_categories(&ProductTable::new(rows), 5);
        assert_eq!(top[0].category, "Beverages");
        assert_eq!(top[0].product_count, 2);
        assert_eq!(top.len(), 2);
    }

    #[test]
    fn test_brand_concentration() {
        let table = ProductTable::new(vec![
            branded("1", "A"),
            branded("2", "A"),
            branded("3", "B"),
            branded("4", "C"),
        ]);
        let share = brand_concentration(&table);
        assert_eq!(share.total_brands, 3);
        assert_eq!(share.top_brand_share, Some(50.0));
        assert_eq!(share.top5_brands_share, Some(100.0));

        let empty = brand_concentration(&ProductTable::default());
        assert_eq!(empty.top_brand_share, None);
    }

    #[test]
    fn test_healthiest_products_ties_keep_row_order() {
        let mut first = scored("1", 7.0);
        first.product_name = Some("first seven".into());
        let mut second = scored("3", 7.0);
        second.product_name = Some("second seven".into());
        let table = ProductTable::new(vec![first, scored("2", 9.0), second, scored("4", 2.0)]);

        let top = healthiest_products(&table, 3);
        let scores: Vec<_> = top.iter().map(|p| p.nutrient_score).collect();
        assert_eq!(scores, vec![9.0, 7.0, 7.0]);
        assert_eq!(top[1].product_name.as_deref(), Some("first seven"));
        assert_eq!(top[2].product_name.as_deref(), Some("second seven"));
    }

    #[test]
    fn test_additive_prevalence_percentages() {
        let table = ProductTable::new(vec![
            tagged("1", &["en:e330", "en:e211"]),
            tagged("2", &["en:e330"]),
            tagged("3", &[]),
            ProductRow {
                code: "4".into(),
                ..Default::default()
            },
        ]);

        let top = additive_prevalence(&table, 10);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].additive, "en:e330");
        assert_eq!(top[0].occurrence_count, 2);
        assert_eq!(top[0].percentage, 50.0);
        assert_eq!(top[1].percentage, 25.0);

        for entry in &top {
            let expected = round_to(entry.occurrence_count as f64 / table.len() as f64 * 100.0, 1);
            assert_eq!(entry.percentage, expected);
            assert!(entry.percentage <= 100.0);
        }
    }

    #[test]
    fn test_additive_percentages_bounded_by_tags_per_row() {
        let table = ProductTable::new(vec![
            tagged("1", &["en:e330", "en:e211", "en:e300"]),
            tagged("2", &["en:e330", "en:e211"]),
            tagged("3", &["en:e330"]),
            tagged("4", &["en:e471", "en:e330"]),
            tagged("5", &[]),
        ]);
        let max_tags_per_row = table
            .rows()
            .iter()
            .filter_map(|r| r.additives_tags.as_ref())
            .map(Vec::len)
            .max()
            .unwrap();

        let all = additive_prevalence(&table, usize::MAX);
        assert_eq!(all.len(), 4);

        let total: f64 = all.iter().map(|a| a.percentage).sum();
        assert_eq!(total, 160.0);
        assert!(total > 100.0);
        assert!(total <= 100.0 * max_tags_per_row as f64);
    }

    #[test]
    fn test_empty_table_rankings() {
        let table = ProductTable::default();
        assert!(top_brands(&table, 10).is_empty());
        assert!(top_categories(&table, 10).is_empty());
        assert!(healthiest_products(&table, 10).is_empty());
        assert!(additive_prevalence(&table, 10).is_empty());
    }
}
