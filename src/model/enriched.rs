use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{
    Allergen, Candidate, Cuisine, GlycemicIndex, Ingredient, MealType, Season, ShoppingCategory,
    TimeCategory, Trimester,
};

/// Attributes derived once by the enricher and never removed afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedAttributes {
    pub meal_type: MealType,
    #[serde(default)]
    pub cuisine: Option<Cuisine>,
    #[serde(default)]
    pub seasonal_tags: BTreeSet<Season>,
    #[serde(default)]
    pub trimester_suitability: BTreeSet<Trimester>,
    #[serde(default)]
    pub batch_friendly: bool,
    #[serde(default)]
    pub freezer_friendly: bool,
    #[serde(default)]
    pub cooking_methods: Vec<String>,
    #[serde(default)]
    pub time_category: Option<TimeCategory>,
    #[serde(default)]
    pub shopping_list: BTreeMap<ShoppingCategory, Vec<Ingredient>>,
    #[serde(default)]
    pub diet_tags: BTreeSet<String>,
    #[serde(default)]
    pub estimated_glycemic_index: GlycemicIndex,
    #[serde(default)]
    pub allergens: BTreeSet<Allergen>,
}

/// A candidate together with its derived attributes. `candidate.tags` holds
/// the merged tag set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecipe {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(flatten)]
    pub attributes: EnrichedAttributes,
}

impl EnrichedRecipe {
    #[must_use]
    pub fn title(&self) -> &str {
        &self.candidate.title
    }

    #[must_use]
    pub fn cuisine_key(&self) -> &'static str {
        Cuisine::ledger_key(self.attributes.cuisine)
    }

    /// Ledger bucket for prep time; recipes without a time category count as quick meals.
    #[must_use]
    pub fn prep_time_key(&self) -> &'static str {
        self.attributes
            .time_category
            .unwrap_or(TimeCategory::Quick)
            .as_str()
    }
}
