//! 計測・ベンチマーク用の合成レシピ生成。
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::model::{Candidate, Ingredient, Nutrition};

const CUISINES: [(&str, &[&str]); 6] = [
    ("Greek", &["feta", "olive oil", "tomatoes", "cucumber", "oregano"]),
    ("Thai", &["coconut milk", "lemongrass", "fish sauce", "basil", "lime"]),
    ("Mexican", &["black beans", "salsa", "tortilla", "cilantro", "avocado"]),
    ("Indian", &["curry powder", "garam masala", "lentils", "ginger", "yogurt"]),
    ("Italian", &["parmesan", "basil", "garlic", "zucchini", "whole wheat pasta"]),
    ("Southern", &["collard greens", "cornmeal", "paprika", "bell peppers", "onions"]),
];

const PROTEINS: [&str; 8] = [
    "chicken breast",
    "salmon",
    "tofu",
    "chickpeas",
    "turkey",
    "eggs",
    "shrimp",
    "lean beef",
];

const DISHES: [&str; 6] = ["bowl", "stew", "salad", "skillet", "bake", "wrap"];

const MEALS: [&str; 5] = ["breakfast", "lunch", "dinner", "snack", "main"];

const METHODS: [&str; 5] = [
    "Bake at 400F for 25 minutes.",
    "Saute over medium heat until golden.",
    "Simmer gently for 20 minutes.",
    "Grill for 6 minutes per side.",
    "Toss everything together and serve fresh.",
];

/// 合成レシピ候補を生成する。
///
/// シード固定の乱数で料理ジャンル・主たんぱく質・栄養値を揺らすため、
/// 同じ `count` なら常に同じ候補列になる。一部は栄養基準を外れ、
/// 一部はタイトルが重複するように作ってある。
#[must_use]
pub fn synthetic_candidates(count: usize) -> Vec<Candidate> {
    let mut rng = StdRng::seed_from_u64(42);
    let mut candidates = Vec::with_capacity(count);

    for idx in 0..count {
        let (cuisine, pantry) = CUISINES[rng.random_range(0..CUISINES.len())];
        let protein = PROTEINS[rng.random_range(0..PROTEINS.len())];
        let dish = DISHES[rng.random_range(0..DISHES.len())];
        let meal = MEALS[rng.random_range(0..MEALS.len())];

        // 約1割は既存タイトルの言い換えにする
        let title = if idx > 0 && rng.random_bool(0.1) {
            format!("Easy {cuisine} {protein} {dish}")
        } else {
            format!("{cuisine} {protein} {dish} {idx}")
        };

        let mut candidate = Candidate::new(title);
        candidate.ingredients.push(Ingredient::new(
            protein,
            f64::from(rng.random_range(1..=3_u8)),
            "cup",
        ));
        let extras = rng.random_range(3..=pantry.len());
        for name in &pantry[..extras] {
            candidate.ingredients.push(Ingredient::new(
                *name,
                f64::from(rng.random_range(1..=4_u8)) / 2.0,
                "tbsp",
            ));
        }
        candidate.instructions = (0..rng.random_range(1..=3))
            .map(|_| METHODS[rng.random_range(0..METHODS.len())].to_string())
            .collect();

        let carbs = rng.random_range(12.0..55.0_f64).round();
        let fat = rng.random_range(4.0..25.0_f64).round();
        candidate.nutrition = Some(Nutrition {
            calories: rng.random_range(150.0..650.0_f64).round(),
            carbs,
            fiber: rng.random_range(1.0..12.0_f64).round(),
            sugar: (carbs * rng.random_range(0.05..0.5)).round(),
            protein: rng.random_range(4.0..40.0_f64).round(),
            fat,
            saturated_fat: (fat * rng.random_range(0.1..0.45)).round(),
            sodium: rng.random_range(100.0..900.0_f64).round(),
        });
        candidate.prep_time = rng.random_range(5..=25);
        candidate.cook_time = rng.random_range(0..=60);
        candidate.servings = rng.random_range(1..=6);
        candidate.tags.insert(meal.to_string());
        candidate.source_site = format!("site-{}.example", idx % 7);
        candidate.source_url = format!("https://{}/recipes/{idx}", candidate.source_site);
        candidates.push(candidate);
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(synthetic_candidates(32), synthetic_candidates(32));
    }

    #[test]
    fn candidates_carry_the_fields_curation_reads() {
        for candidate in synthetic_candidates(64) {
            assert!(candidate.ingredients.len() >= 4);
            assert!(!candidate.instructions.is_empty());
            assert!(candidate.has_nutrition());
            assert!(!candidate.source_url.is_empty());
            assert_eq!(candidate.tags.len(), 1);
        }
    }
}
