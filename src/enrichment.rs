//! Metadata derivation for validated candidates.
//!
//! [`RecipeEnricher::enrich`] is pure: it reads only the candidate and the
//! vocabulary, and never touches the diversity ledger or the duplicate index.
use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, LazyLock},
};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{
    model::{
        Candidate, Cuisine, EnrichedAttributes, EnrichedRecipe, GlycemicIndex, Ingredient,
        MealType, Season, ShoppingCategory, TimeCategory, Trimester,
    },
    util::text::{fold, ingredient_text},
    vocabulary::Vocabulary,
};

pub const MAX_COOKING_METHODS: usize = 3;
const SEASON_MIN_HITS: usize = 2;
const YEAR_ROUND_MIN_HITS: usize = 3;
const CUISINE_MIN_SCORE: usize = 3;
const DISH_WEIGHT: usize = 3;
const TRIMESTER_MIN_BENEFITS: usize = 2;
const BATCH_MIN_SERVINGS: u32 = 8;
const KETO_MAX_CARBS: f64 = 10.0;
const KETO_MIN_FAT: f64 = 15.0;
const SNACK_CALORIE_CEILING: f64 = 200.0;

pub const PREGNANCY_FRIENDLY_TAG: &str = "pregnancy-friendly";
pub const BATCH_TAG: &str = "batch-cooking";
pub const FREEZER_TAG: &str = "freezer-friendly";
pub const KETO_TAG: &str = "keto-friendly";
pub const PALEO_TAG: &str = "paleo-friendly";
pub const WHOLE30_TAG: &str = "whole30-compatible";

static BATCH_PHRASES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [r"double.*recipe", r"make.*batch", r"large batch"]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("batch phrase compiles"))
        .collect()
});

static SERVES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"serves\s+(\d+)").expect("serves pattern compiles"));

/// Counts of which derivations fired, for the enrichment summary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichmentStats {
    pub total_enriched: u64,
    pub with_seasons: u64,
    pub with_cuisine: u64,
    pub with_trimester: u64,
    pub batch_friendly: u64,
}

impl EnrichmentStats {
    pub fn record(&mut self, recipe: &EnrichedRecipe) {
        let attributes = &recipe.attributes;
        self.total_enriched += 1;
        self.with_seasons += u64::from(!attributes.seasonal_tags.is_empty());
        self.with_cuisine += u64::from(attributes.cuisine.is_some());
        self.with_trimester += u64::from(!attributes.trimester_suitability.is_empty());
        self.batch_friendly += u64::from(attributes.batch_friendly);
    }
}

#[derive(Debug, Clone)]
pub struct RecipeEnricher {
    vocabulary: Arc<Vocabulary>,
}

/// Folded text views of a candidate, computed once per enrichment.
struct Texts {
    ingredients: String,
    title: String,
    description: String,
    instructions: String,
}

impl Texts {
    fn of(candidate: &Candidate) -> Self {
        Self {
            ingredients: ingredient_text(&candidate.ingredients),
            title: fold(&candidate.title),
            description: fold(&candidate.description),
            instructions: fold(&candidate.instructions.join(" ")),
        }
    }
}

impl RecipeEnricher {
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>) -> Self {
        Self { vocabulary }
    }

    /// Derives every enriched attribute and merges the resulting tags.
    ///
    /// The glycemic estimate and allergens are left at their defaults; the
    /// validator owns those and the curator copies them over.
    #[must_use]
    pub fn enrich(&self, candidate: &Candidate) -> EnrichedRecipe {
        let texts = Texts::of(candidate);
        let mut tags: BTreeSet<String> = candidate.tags.clone();

        let seasonal_tags = self.seasons(&texts.ingredients);
        tags.extend(seasonal_tags.iter().map(|s| s.as_str().to_string()));

        let cuisine = self.cuisine(&texts);
        if let Some(cuisine) = cuisine {
            tags.insert(format!("cuisine-{}", cuisine.as_str()));
        }

        let (trimester_suitability, trimester_tags) = self.trimesters(&texts.ingredients);
        tags.extend(trimester_tags);

        let batch_friendly = self.is_batch_friendly(&texts);
        if batch_friendly {
            tags.insert(BATCH_TAG.to_string());
        }
        let freezer_friendly = self.is_freezer_friendly(&texts);
        if freezer_friendly {
            tags.insert(FREEZER_TAG.to_string());
        }

        let shopping_list = self.shopping_list(&candidate.ingredients);

        let cooking_methods = self
            .vocabulary
            .cooking_methods
            .detect(&texts.instructions, MAX_COOKING_METHODS);
        tags.extend(cooking_methods.iter().map(|m| format!("method-{m}")));

        let time_category = TimeCategory::from_minutes(candidate.total_time());
        if let Some(category) = time_category {
            tags.insert(category.as_str().to_string());
        }

        let diet_tags = self.diet_tags(candidate, &texts.ingredients);
        tags.extend(diet_tags.iter().cloned());

        let meal_type = meal_type(candidate, &texts.title);

        let mut enriched = candidate.clone();
        enriched.tags = tags;

        EnrichedRecipe {
            candidate: enriched,
            attributes: EnrichedAttributes {
                meal_type,
                cuisine,
                seasonal_tags,
                trimester_suitability,
                batch_friendly,
                freezer_friendly,
                cooking_methods,
                time_category,
                shopping_list,
                diet_tags,
                estimated_glycemic_index: GlycemicIndex::Unknown,
                allergens: BTreeSet::new(),
            },
        }
    }

    fn seasons(&self, ingredients: &str) -> BTreeSet<Season> {
        let seasons: BTreeSet<Season> = self
            .vocabulary
            .seasons
            .iter()
            .filter(|(_, keywords)| keywords.count_in(ingredients) >= SEASON_MIN_HITS)
            .map(|(season, _)| *season)
            .collect();
        if seasons.is_empty()
            && self.vocabulary.year_round.count_in(ingredients) >= YEAR_ROUND_MIN_HITS
        {
            return BTreeSet::from([Season::YearRound]);
        }
        seasons
    }

    fn cuisine(&self, texts: &Texts) -> Option<Cuisine> {
        let combined = format!(
            "{} {} {}",
            texts.ingredients, texts.title, texts.description
        );
        let mut best: Option<(Cuisine, usize)> = None;
        for (cuisine, keywords) in &self.vocabulary.cuisines {
            let score = keywords.ingredients.count_in(&combined)
                + DISH_WEIGHT * keywords.dishes.count_in(&combined);
            if best.is_none_or(|(_, top)| score > top) {
                best = Some((*cuisine, score));
            }
        }
        best.filter(|(_, score)| *score >= CUISINE_MIN_SCORE)
            .map(|(cuisine, _)| cuisine)
    }

    fn trimesters(&self, ingredients: &str) -> (BTreeSet<Trimester>, BTreeSet<String>) {
        let mut suitable = BTreeSet::new();
        let mut tags = BTreeSet::new();
        for (trimester, rule) in &self.vocabulary.trimesters {
            if !rule.avoid.contains_any(ingredients)
                && rule.beneficial.count_in(ingredients) >= TRIMESTER_MIN_BENEFITS
            {
                suitable.insert(*trimester);
                tags.insert(rule.tag.clone());
            }
        }
        if suitable.len() == Trimester::ALL.len() {
            tags = BTreeSet::from([PREGNANCY_FRIENDLY_TAG.to_string()]);
        }
        (suitable, tags)
    }

    fn is_batch_friendly(&self, texts: &Texts) -> bool {
        let combined = format!("{} {}", texts.title, texts.instructions);
        if self.vocabulary.batch_indicators.contains_any(&combined) {
            return true;
        }
        if BATCH_PHRASES.iter().any(|phrase| phrase.is_match(&combined)) {
            return true;
        }
        SERVES.captures_iter(&combined).any(|caps| {
            caps[1]
                .parse::<u32>()
                .is_ok_and(|servings| servings >= BATCH_MIN_SERVINGS)
        })
    }

    fn is_freezer_friendly(&self, texts: &Texts) -> bool {
        let combined = format!(
            "{} {} {}",
            texts.title, texts.instructions, texts.description
        );
        self.vocabulary.freezer_indicators.contains_any(&combined)
    }

    fn shopping_list(&self, ingredients: &[Ingredient]) -> BTreeMap<ShoppingCategory, Vec<Ingredient>> {
        let mut list: BTreeMap<ShoppingCategory, Vec<Ingredient>> = BTreeMap::new();
        for ingredient in ingredients {
            let category = self.shopping_category(&fold(&ingredient.name));
            list.entry(category).or_default().push(ingredient.clone());
        }
        list
    }

    /// First matching section wins; produce also matches the year-round list.
    fn shopping_category(&self, name: &str) -> ShoppingCategory {
        self.vocabulary
            .shopping
            .iter()
            .find(|(category, keywords)| {
                keywords.contains_any(name)
                    || (**category == ShoppingCategory::Produce
                        && self.vocabulary.year_round.contains_any(name))
            })
            .map_or(ShoppingCategory::Other, |(category, _)| *category)
    }

    fn diet_tags(&self, candidate: &Candidate, ingredients: &str) -> BTreeSet<String> {
        let mut tags = BTreeSet::new();
        let diets = &self.vocabulary.diets;

        if candidate.has_nutrition() {
            let nutrition = candidate.nutrition_or_default();
            if nutrition.carbs < KETO_MAX_CARBS && nutrition.fat > KETO_MIN_FAT {
                tags.insert(KETO_TAG.to_string());
            }
        }
        if !diets.paleo_excluded.contains_any(ingredients) && !candidate.has_tag("vegetarian") {
            tags.insert(PALEO_TAG.to_string());
        }
        if !diets.whole30_excluded.contains_any(ingredients) {
            tags.insert(WHOLE30_TAG.to_string());
        }
        tags
    }
}

/// Ledger meal slot: an explicit meal name in tags or title, then calories,
/// then breakfast-sounding titles, otherwise dinner.
#[must_use]
pub fn meal_type(candidate: &Candidate, folded_title: &str) -> MealType {
    for meal in MealType::ALL {
        let named = candidate.has_tag(meal.as_str()) || folded_title.contains(meal.as_str());
        let snack_tag = meal == MealType::Snacks && candidate.has_tag("snack");
        if named || snack_tag {
            return meal;
        }
    }

    if candidate.nutrition_or_default().calories < SNACK_CALORIE_CEILING {
        return MealType::Snacks;
    }
    if ["morning", "pancake", "muffin"]
        .iter()
        .any(|word| folded_title.contains(word))
    {
        return MealType::Breakfast;
    }
    MealType::Dinner
}
