//! Nutrition and structure gate for gestational-diabetes friendly recipes.
//!
//! Blocking problems go to `errors`; review hints go to `warnings`. A
//! candidate passes iff `errors` is empty. Missing numbers read as zero and
//! therefore fail any minimum.

mod glycemic;

use std::{collections::BTreeSet, sync::Arc};

use serde::{Deserialize, Serialize};

pub use glycemic::estimate_gi;

use crate::{
    model::{Allergen, Candidate, GlycemicIndex, GuidelineCategory, Nutrition},
    util::text::{fold, ingredient_text},
    vocabulary::Vocabulary,
};

pub const MIN_INGREDIENTS: usize = 3;
const UNCOMMON_WARNING_LIMIT: usize = 3;

/// Per-serving bounds for one guideline category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NutritionBounds {
    pub min_carbs: f64,
    pub max_carbs: f64,
    pub min_fiber: f64,
    pub min_protein: f64,
}

/// Full guideline table plus the general ratio limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Guidelines {
    pub breakfast: NutritionBounds,
    pub meals: NutritionBounds,
    pub snacks: NutritionBounds,
    pub max_total_minutes: u32,
    pub max_sugar_ratio: f64,
    pub min_fiber_carb_ratio: f64,
    pub max_saturated_fat_ratio: f64,
    pub max_sodium_mg: f64,
}

impl Default for Guidelines {
    fn default() -> Self {
        Self {
            breakfast: NutritionBounds {
                min_carbs: 25.0,
                max_carbs: 45.0,
                min_fiber: 3.0,
                min_protein: 10.0,
            },
            meals: NutritionBounds {
                min_carbs: 30.0,
                max_carbs: 45.0,
                min_fiber: 5.0,
                min_protein: 15.0,
            },
            snacks: NutritionBounds {
                min_carbs: 15.0,
                max_carbs: 30.0,
                min_fiber: 3.0,
                min_protein: 5.0,
            },
            max_total_minutes: 45,
            max_sugar_ratio: 0.4,
            min_fiber_carb_ratio: 0.1,
            max_saturated_fat_ratio: 0.3,
            max_sodium_mg: 600.0,
        }
    }
}

impl Guidelines {
    #[must_use]
    pub fn bounds(&self, category: GuidelineCategory) -> &NutritionBounds {
        match category {
            GuidelineCategory::Breakfast => &self.breakfast,
            GuidelineCategory::Meals => &self.meals,
            GuidelineCategory::Snacks => &self.snacks,
        }
    }
}

/// What the validator concluded about one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationOutcome {
    pub passed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub category: GuidelineCategory,
    pub glycemic_index: GlycemicIndex,
    pub allergens: BTreeSet<Allergen>,
}

#[derive(Debug, Clone)]
pub struct QualityValidator {
    vocabulary: Arc<Vocabulary>,
    guidelines: Guidelines,
}

impl QualityValidator {
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self::with_guidelines(vocabulary, Guidelines::default())
    }

    #[must_use]
    pub fn with_guidelines(vocabulary: Arc<Vocabulary>, guidelines: Guidelines) -> Self {
        Self {
            vocabulary,
            guidelines,
        }
    }

    #[must_use]
    pub fn guidelines(&self) -> &Guidelines {
        &self.guidelines
    }

    #[must_use]
    pub fn vocabulary(&self) -> Arc<Vocabulary> {
        Arc::clone(&self.vocabulary)
    }

    /// Runs every check against `candidate`. Never fails; problems are data.
    #[must_use]
    pub fn validate(&self, candidate: &Candidate) -> ValidationOutcome {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let category = guideline_category(candidate);
        let bounds = self.guidelines.bounds(category);

        required_fields(candidate, &mut errors);
        self.check_nutrition(&candidate.nutrition_or_default(), bounds, &mut errors, &mut warnings);

        let total = candidate.total_time();
        if total > self.guidelines.max_total_minutes {
            warnings.push(format!(
                "Total time ({total} min) exceeds recommended {} min",
                self.guidelines.max_total_minutes
            ));
        }

        self.check_ingredients(candidate, &mut warnings);

        let glycemic_index = estimate_gi(
            &self.vocabulary.glycemic_index,
            &candidate.ingredients,
            &candidate.instructions,
        );
        match glycemic_index {
            GlycemicIndex::High => errors.push("Estimated glycemic index is high".to_string()),
            GlycemicIndex::Unknown => {
                warnings.push("Unable to estimate glycemic index".to_string());
            }
            GlycemicIndex::Low | GlycemicIndex::Medium => {}
        }

        let allergens = self.detect_allergens(candidate);

        ValidationOutcome {
            passed: errors.is_empty(),
            errors,
            warnings,
            category,
            glycemic_index,
            allergens,
        }
    }

    /// Allergen families mentioned in the ingredient names. Informational only.
    #[must_use]
    pub fn detect_allergens(&self, candidate: &Candidate) -> BTreeSet<Allergen> {
        let names = ingredient_text(&candidate.ingredients);
        self.vocabulary
            .allergens
            .iter()
            .filter(|(_, keywords)| keywords.contains_any(&names))
            .map(|(allergen, _)| *allergen)
            .collect()
    }

    fn check_nutrition(
        &self,
        nutrition: &Nutrition,
        bounds: &NutritionBounds,
        errors: &mut Vec<String>,
        warnings: &mut Vec<String>,
    ) {
        let carbs = nutrition.carbs;
        if carbs < bounds.min_carbs {
            errors.push(format!(
                "Carbs too low: {carbs}g (minimum {}g)",
                bounds.min_carbs
            ));
        } else if carbs > bounds.max_carbs {
            errors.push(format!(
                "Carbs too high: {carbs}g (maximum {}g)",
                bounds.max_carbs
            ));
        }

        let fiber = nutrition.fiber;
        if fiber < bounds.min_fiber {
            errors.push(format!(
                "Fiber too low: {fiber}g (minimum {}g)",
                bounds.min_fiber
            ));
        }

        let protein = nutrition.protein;
        if protein < bounds.min_protein {
            warnings.push(format!(
                "Protein low: {protein}g (recommended minimum {}g)",
                bounds.min_protein
            ));
        }

        if carbs > 0.0 {
            let sugar_ratio = nutrition.sugar / carbs;
            if sugar_ratio > self.guidelines.max_sugar_ratio {
                warnings.push(format!(
                    "High sugar content: {}g ({:.0}% of carbs)",
                    nutrition.sugar,
                    sugar_ratio * 100.0
                ));
            }

            let fiber_ratio = fiber / carbs;
            if fiber_ratio < self.guidelines.min_fiber_carb_ratio {
                warnings.push(format!(
                    "Low fiber to carb ratio: {:.0}%",
                    fiber_ratio * 100.0
                ));
            }
        }

        if nutrition.fat > 0.0 && nutrition.saturated_fat > 0.0 {
            let saturated_ratio = nutrition.saturated_fat / nutrition.fat;
            if saturated_ratio > self.guidelines.max_saturated_fat_ratio {
                warnings.push(format!(
                    "High saturated fat: {}g ({:.0}% of total fat)",
                    nutrition.saturated_fat,
                    saturated_ratio * 100.0
                ));
            }
        }

        if nutrition.sodium > self.guidelines.max_sodium_mg {
            warnings.push(format!("High sodium: {}mg", nutrition.sodium));
        }
    }

    fn check_ingredients(&self, candidate: &Candidate, warnings: &mut Vec<String>) {
        if candidate.ingredients.is_empty() {
            warnings.push("No ingredients found".to_string());
            return;
        }

        let uncommon: Vec<String> = candidate
            .ingredients
            .iter()
            .map(|ingredient| fold(ingredient.name.trim()))
            .filter(|name| name.chars().count() > 3)
            .filter(|name| !self.vocabulary.common_ingredients.contains_any(name))
            .collect();

        if uncommon.len() > UNCOMMON_WARNING_LIMIT {
            warnings.push(format!(
                "Many uncommon ingredients: {}...",
                uncommon[..UNCOMMON_WARNING_LIMIT].join(", ")
            ));
        }
    }
}

/// Resolves which guideline row applies: tags first, then calories.
#[must_use]
pub fn guideline_category(candidate: &Candidate) -> GuidelineCategory {
    if candidate.has_tag("snack") || candidate.has_tag("appetizer") {
        return GuidelineCategory::Snacks;
    }
    if candidate.has_tag("breakfast") {
        return GuidelineCategory::Breakfast;
    }
    if ["lunch", "dinner", "main"]
        .iter()
        .any(|tag| candidate.has_tag(tag))
    {
        return GuidelineCategory::Meals;
    }

    let calories = candidate.nutrition_or_default().calories;
    if calories > 0.0 && calories <= 200.0 {
        GuidelineCategory::Snacks
    } else {
        GuidelineCategory::Meals
    }
}

fn required_fields(candidate: &Candidate, errors: &mut Vec<String>) {
    let missing = [
        ("title", candidate.title.trim().is_empty()),
        ("ingredients", candidate.ingredients.is_empty()),
        (
            "instructions",
            candidate.instructions.iter().all(|step| step.trim().is_empty()),
        ),
        ("nutrition", !candidate.has_nutrition()),
    ];
    for (field, absent) in missing {
        if absent {
            errors.push(format!("Missing required field: {field}"));
        }
    }

    if !candidate.ingredients.is_empty() && candidate.ingredients.len() < MIN_INGREDIENTS {
        errors.push(format!(
            "Recipe has too few ingredients (minimum {MIN_INGREDIENTS})"
        ));
    }
}

/// Running pass/fail counts across validated candidates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationStats {
    pub total_validated: u64,
    pub passed: u64,
    pub failed: u64,
    pub with_warnings: u64,
}

impl ValidationStats {
    pub fn record(&mut self, outcome: &ValidationOutcome) {
        self.total_validated += 1;
        if outcome.passed {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
        if !outcome.warnings.is_empty() {
            self.with_warnings += 1;
        }
    }

    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        percent(self.passed, self.total_validated)
    }

    #[must_use]
    pub fn warning_rate(&self) -> f64 {
        percent(self.with_warnings, self.total_validated)
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
