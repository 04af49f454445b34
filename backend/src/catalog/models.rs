use serde::{Deserialize, Deserializer};
use serde_json::Value;

// Catalog strings may be blank or arrive as numbers.
fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

// Nutriment values are sometimes delivered as strings ("12.5") or empty strings.
fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite()))
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Nutriments {
    #[serde(rename = "energy-kcal_100g", deserialize_with = "deserialize_number")]
    pub energy_kcal_100g: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub proteins_100g: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub carbohydrates_100g: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub fat_100g: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub fiber_100g: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub sugars_100g: Option<f64>,
    #[serde(rename = "saturated-fat_100g", deserialize_with = "deserialize_number")]
    pub saturated_fat_100g: Option<f64>,
    #[serde(rename = "energy-kcal_serving", deserialize_with = "deserialize_number")]
    pub energy_kcal_serving: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub proteins_serving: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub carbohydrates_serving: Option<f64>,
    #[serde(deserialize_with = "deserialize_number")]
    pub fat_serving: Option<f64>,
}

/// One record of an Open Food Facts search result. Blank fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CatalogProduct {
    #[serde(deserialize_with = "deserialize_text")]
    pub code: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub product_name: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub brands: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub quantity: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub categories: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub nutrition_grade_fr: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub nutrition_grades: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub ingredients_text: Option<String>,
    pub nutriments: Option<Nutriments>,
    #[serde(deserialize_with = "deserialize_text")]
    pub image_url: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub stores: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub packaging: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub description: Option<String>,
    #[serde(deserialize_with = "deserialize_text")]
    pub generic_name: Option<String>,
}

impl CatalogProduct {
    pub fn nutrition_grade(&self) -> Option<&str> {
        self.nutrition_grade_fr
            .as_deref()
            .or(self.nutrition_grades.as_deref())
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref().or(self.generic_name.as_deref())
    }
}

fn deserialize_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn deserialize_products<'de, D>(deserializer: D) -> Result<Vec<CatalogProduct>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<CatalogProduct>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SearchResponse {
    #[serde(deserialize_with = "deserialize_count")]
    pub count: Option<u64>,
    #[serde(deserialize_with = "deserialize_products")]
    pub products: Vec<CatalogProduct>,
}
