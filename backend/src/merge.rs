use shared::{NormalizedProduct, Nutrients, ProductSource};

use crate::catalog::{CatalogProduct, Nutriments};
use crate::vision::AiAnalysis;

fn nutrients_from(nutriments: &Nutriments) -> Nutrients {
    Nutrients {
        calories: nutriments.energy_kcal_100g,
        proteins: nutriments.proteins_100g,
        carbohydrates: nutriments.carbohydrates_100g,
        fat: nutriments.fat_100g,
        fiber: nutriments.fiber_100g,
        sugars: nutriments.sugars_100g,
        saturated_fat: nutriments.saturated_fat_100g,
        calories_per_serving: nutriments.energy_kcal_serving,
        proteins_per_serving: nutriments.proteins_serving,
        carbohydrates_per_serving: nutriments.carbohydrates_serving,
        fat_per_serving: nutriments.fat_serving,
    }
}

fn catalog_or(catalog: Option<&str>, guess: &str) -> String {
    catalog.unwrap_or(guess).to_string()
}

/// Combines a catalog record with the vision guess. The catalog wins for every
/// field it carries; nutrition figures never come from the guess.
pub fn merge_product(catalog: Option<&CatalogProduct>, analysis: &AiAnalysis) -> NormalizedProduct {
    let guess = &analysis.product;

    let Some(record) = catalog else {
        return NormalizedProduct {
            name: guess.name.clone(),
            brand: guess.brand.clone(),
            quantity: None,
            categories: guess.category.clone(),
            nutrition_grade: None,
            ingredients: None,
            nutrients: None,
            image_url: None,
            stores: None,
            packaging: None,
            description: guess.description.clone(),
            source: ProductSource::Ai,
        };
    };

    NormalizedProduct {
        name: catalog_or(record.product_name.as_deref(), &guess.name),
        brand: catalog_or(record.brands.as_deref(), &guess.brand),
        quantity: record.quantity.clone(),
        categories: catalog_or(record.categories.as_deref(), &guess.category),
        nutrition_grade: record.nutrition_grade().map(str::to_string),
        ingredients: record.ingredients_text.clone(),
        nutrients: record.nutriments.as_ref().map(nutrients_from),
        image_url: record.image_url.clone(),
        stores: record.stores.clone(),
        packaging: record.packaging.clone(),
        description: catalog_or(record.description(), &guess.description),
        source: ProductSource::Catalog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vision::analysis::{
        UNKNOWN_BRAND, UNKNOWN_CATEGORY, UNKNOWN_DESCRIPTION, UNKNOWN_NAME, parse_analysis,
    };

    fn guess() -> AiAnalysis {
        parse_analysis(
            r#"{"product": {"name": "Choco Bar", "brand": "Acme", "category": "Snacks",
                "description": "Milk chocolate bar", "calories": 9999}}"#,
        )
        .unwrap()
    }

    fn record() -> CatalogProduct {
        serde_json::from_value(serde_json::json!({
            "product_name": "Acme Choco Bar 50g",
            "brands": "Acme Foods",
            "quantity": "50 g",
            "nutrition_grade_fr": "e",
            "ingredients_text": "sugar, cocoa butter, milk",
            "image_url": "https://img.example/choco.jpg",
            "nutriments": {
                "energy-kcal_100g": 530,
                "sugars_100g": 55.1,
                "energy-kcal_serving": 265
            }
        }))
        .unwrap()
    }

    #[test]
    fn catalog_fields_win() {
        let merged = merge_product(Some(&record()), &guess());

        assert_eq!(merged.name, "Acme Choco Bar 50g");
        assert_eq!(merged.brand, "Acme Foods");
        assert_eq!(merged.quantity.as_deref(), Some("50 g"));
        assert_eq!(merged.nutrition_grade.as_deref(), Some("e"));
        assert_eq!(merged.image_url.as_deref(), Some("https://img.example/choco.jpg"));
        assert_eq!(merged.source, ProductSource::Catalog);
    }

    #[test]
    fn absent_catalog_fields_fall_back_to_guess() {
        let merged = merge_product(Some(&record()), &guess());
        assert_eq!(merged.categories, "Snacks");
        assert_eq!(merged.description, "Milk chocolate bar");
        assert_eq!(merged.stores, None);
    }

    #[test]
    fn nutrients_only_come_from_catalog() {
        let merged = merge_product(Some(&record()), &guess());
        let nutrients = merged.nutrients.clone().unwrap();
        assert_eq!(nutrients.calories, Some(530.0));
        assert_eq!(nutrients.sugars, Some(55.1));
        assert_eq!(nutrients.calories_per_serving, Some(265.0));
        assert_eq!(nutrients.proteins, None);
        assert!(merged.has_nutrition());

        let bare = CatalogProduct {
            product_name: Some("Choco".into()),
            ..CatalogProduct::default()
        };
        let merged = merge_product(Some(&bare), &guess());
        assert_eq!(merged.nutrients, None);
        assert_eq!(merged.source, ProductSource::Catalog);
        assert!(!merged.has_nutrition());
    }

    #[test]
    fn guess_only_product_is_tagged_ai() {
        let merged = merge_product(None, &guess());
        assert_eq!(merged.name, "Choco Bar");
        assert_eq!(merged.brand, "Acme");
        assert_eq!(merged.nutrients, None);
        assert_eq!(merged.quantity, None);
        assert_eq!(merged.source, ProductSource::Ai);
    }

    #[test]
    fn empty_inputs_give_unknown_placeholder() {
        let merged = merge_product(None, &AiAnalysis::default());
        assert_eq!(merged.name, UNKNOWN_NAME);
        assert_eq!(merged.brand, UNKNOWN_BRAND);
        assert_eq!(merged.categories, UNKNOWN_CATEGORY);
        assert_eq!(merged.description, UNKNOWN_DESCRIPTION);
        assert_eq!(merged.source, ProductSource::Ai);
    }

    #[test]
    fn merge_is_repeatable() {
        let (catalog, analysis) = (record(), guess());
        assert_eq!(
            merge_product(Some(&catalog), &analysis),
            merge_product(Some(&catalog), &analysis)
        );
    }
}
