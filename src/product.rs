//! Product records as fetched from the API and as normalized rows.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AnalysisError;

/// One product entry as returned by the API, projected to the configured fields.
///
/// Every accessor performs an explicit presence check: absent keys, `null`
/// values and values of the wrong JSON type all read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawProduct(Map<String, Value>);

impl RawProduct {
    /// Keeps only `fields` from `source`; fields missing from the source become `null`.
    pub fn project(source: &Map<String, Value>, fields: &[String]) -> Self {
        let projected = fields
            .iter()
            .map(|field| {
                let value = source.get(field).cloned().unwrap_or(Value::Null);
                (field.clone(), value)
            })
            .collect();
        Self(projected)
    }

    /// Wraps a JSON object; any other JSON value yields `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Returns a string field, treating blank strings as absent.
    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
    }

    /// Identifier of the product. Some records carry it as a JSON number.
    pub fn code(&self) -> Option<String> {
        match self.get("code")? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Returns a list of string tags, or `None` when the field is not a list.
    pub fn tags(&self, field: &str) -> Option<Vec<String>> {
        let items = self.get(field)?.as_array()?;
        Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        )
    }

    /// Reads a numeric key from the nested `nutriments` object.
    ///
    /// Numbers and numeric strings are accepted; anything else is absent.
    pub fn nutriment(&self, key: &str) -> Option<f64> {
        let value = self.get("nutriments")?.as_object()?.get(key)?;
        let number = match value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }?;
        number.is_finite().then_some(number)
    }
}

/// Serializes tag lists as a single comma-joined CSV field.
///
/// An empty list is written as `[]` so it reads back differently from an
/// absent one.
mod tag_list {
    use serde::{Deserialize, Deserializer, Serializer};

    const EMPTY: &str = "[]";

    pub fn serialize<S: Serializer>(tags: &Option<Vec<String>>, s: S) -> Result<S::Ok, S::Error> {
        match tags {
            Some(tags) if tags.is_empty() => s.serialize_str(EMPTY),
            Some(tags) => s.serialize_str(&tags.join(",")),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<String>>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()).map(|s| {
            if s == EMPTY {
                return Vec::new();
            }
            s.split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect()
        }))
    }
}

/// One cleaned, deduplicated product with flattened nutrients and derived fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub code: String,
    pub product_name: Option<String>,
    pub brands: Option<String>,
    pub categories: Option<String>,
    #[serde(with = "tag_list", default)]
    pub additives_tags: Option<Vec<String>>,
    #[serde(with = "tag_list", default)]
    pub allergens_tags: Option<Vec<String>>,
    pub ingredients_text: Option<String>,
    pub nutrition_grades: Option<String>,
    pub image_url: Option<String>,

    // per 100g
    pub energy_100g: Option<f64>,
    pub proteins_100g: Option<f64>,
    pub carbohydrates_100g: Option<f64>,
    pub sugars_100g: Option<f64>,
    pub fat_100g: Option<f64>,
    #[serde(rename = "saturated-fat_100g")]
    pub saturated_fat_100g: Option<f64>,
    pub salt_100g: Option<f64>,
    pub fiber_100g: Option<f64>,

    pub additives_count: Option<usize>,
    pub allergens_count: Option<usize>,
    pub nutrient_score: f64,
}

/// Columns of the normalized table, in persisted order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Code,
    ProductName,
    Brands,
    Categories,
    AdditivesTags,
    AllergensTags,
    IngredientsText,
    NutritionGrades,
    ImageUrl,
    Energy,
    Proteins,
    Carbohydrates,
    Sugars,
    Fat,
    SaturatedFat,
    Salt,
    Fiber,
    AdditivesCount,
    AllergensCount,
    NutrientScore,
}

impl Column {
    pub const ALL: [Column; 20] = [
        Column::Code,
        Column::ProductName,
        Column::Brands,
        Column::Categories,
        Column::AdditivesTags,
        Column::AllergensTags,
        Column::IngredientsText,
        Column::NutritionGrades,
        Column::ImageUrl,
        Column::Energy,
        Column::Proteins,
        Column::Carbohydrates,
        Column::Sugars,
        Column::Fat,
        Column::SaturatedFat,
        Column::Salt,
        Column::Fiber,
        Column::AdditivesCount,
        Column::AllergensCount,
        Column::NutrientScore,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Code => "code",
            Column::ProductName => "product_name",
            Column::Brands => "brands",
            Column::Categories => "categories",
            Column::AdditivesTags => "additives_tags",
            Column::AllergensTags => "allergens_tags",
            Column::IngredientsText => "ingredients_text",
            Column::NutritionGrades => "nutrition_grades",
            Column::ImageUrl => "image_url",
            Column::Energy => "energy_100g",
            Column::Proteins => "proteins_100g",
            Column::Carbohydrates => "carbohydrates_100g",
            Column::Sugars => "sugars_100g",
            Column::Fat => "fat_100g",
            Column::SaturatedFat => "saturated-fat_100g",
            Column::Salt => "salt_100g",
            Column::Fiber => "fiber_100g",
            Column::AdditivesCount => "additives_count",
            Column::AllergensCount => "allergens_count",
            Column::NutrientScore => "nutrient_score",
        }
    }

    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name)
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Column::Energy
                | Column::Proteins
                | Column::Carbohydrates
                | Column::Sugars
                | Column::Fat
                | Column::SaturatedFat
                | Column::Salt
                | Column::Fiber
                | Column::AdditivesCount
                | Column::AllergensCount
                | Column::NutrientScore
        )
    }
}

impl ProductRow {
    /// Numeric value of `column`; `None` for absent values and text columns.
    pub fn numeric(&self, column: Column) -> Option<f64> {
        match column {
            Column::Energy => self.energy_100g,
            Column::Proteins => self.proteins_100g,
            Column::Carbohydrates => self.carbohydrates_100g,
            Column::Sugars => self.sugars_100g,
            Column::Fat => self.fat_100g,
            Column::SaturatedFat => self.saturated_fat_100g,
            Column::Salt => self.salt_100g,
            Column::Fiber => self.fiber_100g,
            Column::AdditivesCount => self.additives_count.map(|c| c as f64),
            Column::AllergensCount => self.allergens_count.map(|c| c as f64),
            Column::NutrientScore => Some(self.nutrient_score),
            _ => None,
        }
    }

    pub fn is_null(&self, column: Column) -> bool {
        match column {
            Column::Code => false,
            Column::ProductName => self.product_name.is_none(),
            Column::Brands => self.brands.is_none(),
            Column::Categories => self.categories.is_none(),
            Column::AdditivesTags => self.additives_tags.is_none(),
            Column::AllergensTags => self.allergens_tags.is_none(),
            Column::IngredientsText => self.ingredients_text.is_none(),
            Column::NutritionGrades => self.nutrition_grades.is_none(),
            Column::ImageUrl => self.image_url.is_none(),
            numeric => self.numeric(numeric).is_none(),
        }
    }
}

/// The normalized product table, rows in first-appearance order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductTable {
    rows: Vec<ProductRow>,
}

impl ProductTable {
    pub fn new(rows: Vec<ProductRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ProductRow] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<ProductRow> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_names(&self) -> Vec<String> {
        Column::ALL.iter().map(|c| c.name().to_string()).collect()
    }

    /// Resolves `name` to a numeric column before any computation runs.
    pub fn numeric_column(&self, name: &str) -> Result<Column, AnalysisError> {
        let column = Column::from_name(name).ok_or_else(|| AnalysisError::ColumnNotFound {
            column: name.to_string(),
            available: self.column_names(),
        })?;
        if !column.is_numeric() {
            return Err(AnalysisError::NotNumeric {
                column: name.to_string(),
            });
        }
        Ok(column)
    }

    /// Present values of a numeric column, in row order.
    pub fn values(&self, column: Column) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.numeric(column)).collect()
    }
}
