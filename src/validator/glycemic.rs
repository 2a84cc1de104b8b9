//! Keyword-based glycemic-index estimate.
use crate::{
    model::{GlycemicIndex, Ingredient},
    util::text::{fold, ingredient_text},
    vocabulary::GlycemicTables,
};

/// Estimates the glycemic-index bucket of a recipe.
///
/// Distinct low, medium and high keywords found in the ingredient names are
/// counted. Instructions mentioning raw or fresh preparation add one low
/// hit; frying adds one high hit. The weighted mean `(low + 2·medium + 3·high)
/// / total` maps to low (≤ 1.5), medium (≤ 2.5) or high. Without any hit the
/// estimate is [`GlycemicIndex::Unknown`].
#[must_use]
pub fn estimate_gi(
    tables: &GlycemicTables,
    ingredients: &[Ingredient],
    instructions: &[String],
) -> GlycemicIndex {
    if ingredients.is_empty() {
        return GlycemicIndex::Unknown;
    }

    let names = ingredient_text(ingredients);
    let mut low = tables.low.count_in(&names);
    let medium = tables.medium.count_in(&names);
    let mut high = tables.high.count_in(&names);

    let steps = fold(&instructions.join(" "));
    if tables.lowering_phrases.contains_any(&steps) {
        low += 1;
    }
    if tables.raising_phrases.contains_any(&steps) {
        high += 1;
    }

    let total = low + medium + high;
    if total == 0 {
        return GlycemicIndex::Unknown;
    }

    #[allow(clippy::cast_precision_loss)]
    let score = (low + 2 * medium + 3 * high) as f64 / total as f64;
    if score <= 1.5 {
        GlycemicIndex::Low
    } else if score <= 2.5 {
        GlycemicIndex::Medium
    } else {
        GlycemicIndex::High
    }
}
