//! Recipe records as they move through curation.
//!
//! [`Candidate`] is the raw record handed over by the scraper. Every numeric
//! field is defaulted centrally here: missing or unparsable numbers become
//! `0`, a missing or non-positive serving count becomes `4`.

mod enriched;
mod labels;
mod lenient;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub use enriched::{EnrichedAttributes, EnrichedRecipe};
pub use labels::{
    Allergen, Cuisine, GlycemicIndex, GuidelineCategory, MealType, Season, ShoppingCategory,
    TimeCategory, Trimester,
};

pub const DEFAULT_SERVINGS: u32 = 4;

/// A scraped recipe before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub ingredients: Vec<Ingredient>,
    #[serde(default)]
    pub instructions: Vec<String>,
    #[serde(default)]
    pub nutrition: Option<Nutrition>,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub prep_time: u32,
    #[serde(default, deserialize_with = "lenient::minutes")]
    pub cook_time: u32,
    #[serde(
        default = "default_servings",
        deserialize_with = "lenient::servings"
    )]
    pub servings: u32,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub source_url: String,
    #[serde(default)]
    pub source_site: String,
}

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

impl Candidate {
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            nutrition: None,
            prep_time: 0,
            cook_time: 0,
            servings: DEFAULT_SERVINGS,
            tags: BTreeSet::new(),
            source_url: String::new(),
            source_site: String::new(),
        }
    }

    #[must_use]
    pub fn total_time(&self) -> u32 {
        self.prep_time.saturating_add(self.cook_time)
    }

    /// Nutrition facts with absent values read as zero.
    #[must_use]
    pub fn nutrition_or_default(&self) -> Nutrition {
        self.nutrition.unwrap_or_default()
    }

    /// Whether the record carries any nutrition data at all.
    #[must_use]
    pub fn has_nutrition(&self) -> bool {
        self.nutrition.is_some_and(|n| !n.is_empty())
    }

    /// Stable identifier used to point at this recipe from other records.
    #[must_use]
    pub fn identity(&self) -> &str {
        if self.source_url.trim().is_empty() {
            &self.title
        } else {
            &self.source_url
        }
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }
}

/// One ingredient line. A bare JSON string is accepted as a name-only line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "lenient::IngredientRepr")]
pub struct Ingredient {
    pub name: String,
    pub amount: f64,
    pub unit: String,
}

impl Ingredient {
    #[must_use]
    pub fn new(name: impl Into<String>, amount: f64, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            amount,
            unit: unit.into(),
        }
    }
}

/// Per-serving nutrition facts. Grams, except calories (kcal) and sodium (mg).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Nutrition {
    #[serde(default, deserialize_with = "lenient::number")]
    pub calories: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub carbs: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fiber: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sugar: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub protein: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub fat: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub saturated_fat: f64,
    #[serde(default, deserialize_with = "lenient::number")]
    pub sodium: f64,
}

impl Nutrition {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profile().iter().all(|v| *v == 0.0) && self.saturated_fat == 0.0
    }

    /// The comparison vector: calories, carbs, protein, fat, fiber, sugar, sodium.
    #[must_use]
    pub fn profile(&self) -> [f64; 7] {
        [
            self.calories,
            self.carbs,
            self.protein,
            self.fat,
            self.fiber,
            self.sugar,
            self.sodium,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_fill_missing_fields() {
        let candidate: Candidate = serde_json::from_value(json!({
            "title": "Lentil Soup",
            "ingredients": ["1 cup lentils", {"name": "carrots", "amount": "1 1/2", "unit": "cup"}],
            "nutrition": {"calories": 300, "carbs": "38"},
            "prepTime": "10",
            "servings": 0
        }))
        .expect("candidate parses");

        assert_eq!(candidate.servings, DEFAULT_SERVINGS);
        assert_eq!(candidate.prep_time, 10);
        assert_eq!(candidate.cook_time, 0);
        assert_eq!(candidate.ingredients[0].name, "1 cup lentils");
        assert!((candidate.ingredients[1].amount - 1.5).abs() < f64::EPSILON);
        let nutrition = candidate.nutrition_or_default();
        assert!((nutrition.carbs - 38.0).abs() < f64::EPSILON);
        assert!(nutrition.fiber.abs() < f64::EPSILON);
        assert!(candidate.has_nutrition());
    }

    #[test]
    fn all_zero_nutrition_counts_as_missing() {
        let mut candidate = Candidate::new("Plain");
        candidate.nutrition = Some(Nutrition::default());
        assert!(!candidate.has_nutrition());
    }

    #[test]
    fn total_time_sums_prep_and_cook() {
        let mut candidate = Candidate::new("Stew");
        candidate.prep_time = 15;
        candidate.cook_time = 90;
        assert_eq!(candidate.total_time(), 105);
    }

    #[test]
    fn identity_prefers_source_url() {
        let mut candidate = Candidate::new("Stew");
        assert_eq!(candidate.identity(), "Stew");
        candidate.source_url = "https://example.com/stew".to_string();
        assert_eq!(candidate.identity(), "https://example.com/stew");
    }
}
