use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

pub mod loading;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ProductSource {
    #[serde(rename = "catalog", alias = "OpenFoodFacts")]
    #[strum(to_string = "catalog", serialize = "OpenFoodFacts")]
    Catalog,
    #[default]
    #[serde(rename = "AI")]
    #[strum(to_string = "AI")]
    Ai,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StatusType {
    Success,
    #[default]
    Info,
    Warning,
}

/// Nutrition figures per 100g and per serving. Only ever filled from a catalog record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrients {
    pub calories: Option<f64>,
    pub proteins: Option<f64>,
    pub carbohydrates: Option<f64>,
    pub fat: Option<f64>,
    pub fiber: Option<f64>,
    pub sugars: Option<f64>,
    pub saturated_fat: Option<f64>,
    pub calories_per_serving: Option<f64>,
    pub proteins_per_serving: Option<f64>,
    pub carbohydrates_per_serving: Option<f64>,
    pub fat_per_serving: Option<f64>,
}

impl Nutrients {
    pub fn has_any(&self) -> bool {
        [
            self.calories,
            self.proteins,
            self.carbohydrates,
            self.fat,
            self.fiber,
            self.sugars,
            self.saturated_fat,
            self.calories_per_serving,
            self.proteins_per_serving,
            self.carbohydrates_per_serving,
            self.fat_per_serving,
        ]
        .iter()
        .any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProduct {
    pub name: String,
    pub brand: String,
    pub quantity: Option<String>,
    pub categories: String,
    pub nutrition_grade: Option<String>,
    pub ingredients: Option<String>,
    pub nutrients: Option<Nutrients>,
    pub image_url: Option<String>,
    pub stores: Option<String>,
    pub packaging: Option<String>,
    pub description: String,
    pub source: ProductSource,
}

impl NormalizedProduct {
    pub fn has_nutrition(&self) -> bool {
        self.nutrients.as_ref().is_some_and(Nutrients::has_any)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub message: String,
    #[serde(rename = "type")]
    pub kind: StatusType,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionSteps {
    pub brand_url: Option<String>,
    pub shopping_links: Option<Vec<String>>,
    pub additional_info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Disclaimer {
    pub message: String,
    pub source: ProductSource,
    pub action_steps: ActionSteps,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiContent {
    pub status: Status,
    pub details_title: String,
    pub nutrition_title: String,
    pub disclaimer: Disclaimer,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeResponse {
    #[serde(rename = "productData")]
    pub product_data: NormalizedProduct,
    pub ui_content: UiContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadingMessageResponse {
    pub message: String,
}
