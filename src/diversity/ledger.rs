use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::targets::TRACKED_DIETS;
use crate::{
    model::{EnrichedRecipe, MealType, Season},
    util::text::{fold, ingredient_text},
    vocabulary::DiversityKeywords,
};

const UNKNOWN_SOURCE: &str = "unknown";

/// Running composition of the accepted collection.
///
/// Only [`DiversityLedger::record`] mutates it, once per accepted recipe, so
/// every per-dimension count sums to what the collection actually holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiversityLedger {
    pub total_count: u32,
    pub by_meal_type: BTreeMap<MealType, u32>,
    pub by_cuisine: BTreeMap<String, u32>,
    pub by_season: BTreeMap<Season, u32>,
    pub by_prep_time: BTreeMap<String, u32>,
    pub by_special_diet: BTreeMap<String, u32>,
    pub by_source: BTreeMap<String, u32>,
    pub cuisine_meal_matrix: BTreeMap<MealType, BTreeMap<String, u32>>,
    pub seasonal_meal_matrix: BTreeMap<MealType, BTreeMap<Season, u32>>,
    pub protein_sources: BTreeMap<String, u32>,
    pub grain_sources: BTreeMap<String, u32>,
    pub unique_ingredients: BTreeSet<String>,
    pub recipe_signatures: BTreeSet<String>,
}

impl DiversityLedger {
    #[must_use]
    pub fn meal_count(&self, meal: MealType) -> u32 {
        self.by_meal_type.get(&meal).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn cuisine_count(&self, cuisine: &str) -> u32 {
        self.by_cuisine.get(cuisine).copied().unwrap_or_default()
    }

    #[must_use]
    pub fn cuisine_meal_count(&self, meal: MealType, cuisine: &str) -> u32 {
        self.cuisine_meal_matrix
            .get(&meal)
            .and_then(|row| row.get(cuisine))
            .copied()
            .unwrap_or_default()
    }

    /// Distinct cuisines with at least one recipe of `meal`.
    #[must_use]
    pub fn cuisines_in(&self, meal: MealType) -> usize {
        self.cuisine_meal_matrix
            .get(&meal)
            .map_or(0, |row| row.values().filter(|count| **count > 0).count())
    }

    #[must_use]
    pub fn seasons_in(&self, meal: MealType) -> usize {
        self.seasonal_meal_matrix
            .get(&meal)
            .map_or(0, |row| row.values().filter(|count| **count > 0).count())
    }

    #[must_use]
    pub fn contains_signature(&self, signature: &str) -> bool {
        self.recipe_signatures.contains(signature)
    }

    /// Adds one accepted recipe to every counter.
    pub(crate) fn record(
        &mut self,
        recipe: &EnrichedRecipe,
        signature: String,
        keywords: &DiversityKeywords,
    ) {
        let meal = recipe.attributes.meal_type;
        let cuisine = recipe.cuisine_key();

        self.total_count += 1;
        bump(&mut self.by_meal_type, meal);
        bump(&mut self.by_cuisine, cuisine.to_string());
        bump(
            self.cuisine_meal_matrix.entry(meal).or_default(),
            cuisine.to_string(),
        );

        for season in &recipe.attributes.seasonal_tags {
            bump(&mut self.by_season, *season);
            bump(self.seasonal_meal_matrix.entry(meal).or_default(), *season);
        }

        bump(&mut self.by_prep_time, recipe.prep_time_key().to_string());

        for diet in TRACKED_DIETS {
            if recipe.candidate.has_tag(diet) {
                bump(&mut self.by_special_diet, diet.to_string());
            }
        }

        let source = recipe.candidate.source_site.trim();
        let source = if source.is_empty() { UNKNOWN_SOURCE } else { source };
        bump(&mut self.by_source, source.to_string());

        let text = ingredient_text(&recipe.candidate.ingredients);
        for protein in keywords.proteins.matches(&text) {
            bump(&mut self.protein_sources, protein.to_string());
        }
        for grain in keywords.grains.matches(&text) {
            bump(&mut self.grain_sources, grain.to_string());
        }
        self.unique_ingredients.extend(
            recipe
                .candidate
                .ingredients
                .iter()
                .map(|ingredient| fold(ingredient.name.trim()))
                .filter(|name| !name.is_empty()),
        );

        self.recipe_signatures.insert(signature);
    }

    /// Most frequent protein sources, ties broken alphabetically.
    #[must_use]
    pub fn top_proteins(&self, limit: usize) -> Vec<(&str, u32)> {
        top(&self.protein_sources, limit)
    }

    #[must_use]
    pub fn top_grains(&self, limit: usize) -> Vec<(&str, u32)> {
        top(&self.grain_sources, limit)
    }
}

fn bump<K: Ord>(counter: &mut BTreeMap<K, u32>, key: K) {
    *counter.entry(key).or_default() += 1;
}

fn top(counter: &BTreeMap<String, u32>, limit: usize) -> Vec<(&str, u32)> {
    let mut entries: Vec<(&str, u32)> = counter
        .iter()
        .map(|(name, count)| (name.as_str(), *count))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    entries.truncate(limit);
    entries
}
