//! Text helpers shared by the classifiers and the duplicate detector.
//!
//! Every keyword comparison in the crate runs over [`fold`]ed text, so
//! "Sauté" and "saute" match the same vocabulary entry.
use std::{hash::Hash, sync::LazyLock};

use regex::Regex;
use rustc_hash::FxHashSet;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use unicode_segmentation::UnicodeSegmentation;
use xxhash_rust::xxh3::xxh3_64;

use crate::model::Ingredient;

static PARENTHETICAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\([^)]*\)").expect("parenthetical pattern compiles"));

/// Lowercases and strips diacritics.
#[must_use]
pub fn fold(text: &str) -> String {
    text.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Folded text with every run of whitespace reduced to one space.
#[must_use]
pub fn fold_compact(text: &str) -> String {
    fold(text).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Folded ingredient names joined by spaces, the haystack for ingredient keywords.
#[must_use]
pub fn ingredient_text(ingredients: &[Ingredient]) -> String {
    ingredients
        .iter()
        .map(|ingredient| fold(ingredient.name.trim()))
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Folded title reduced to words separated by single spaces.
#[must_use]
pub fn normalize_title(title: &str) -> String {
    fold(title).unicode_words().collect::<Vec<_>>().join(" ")
}

/// Removes `( ... )` spans and anything after an unclosed `(`.
#[must_use]
pub fn strip_parentheticals(text: &str) -> String {
    let stripped = PARENTHETICAL.replace_all(text, " ");
    let head = stripped.split('(').next().unwrap_or_default();
    head.trim().to_string()
}

#[must_use]
pub fn hash_text(text: &str) -> u64 {
    xxh3_64(text.as_bytes())
}

/// Intersection over union; two empty sets score 0.
#[must_use]
pub fn jaccard<T: Eq + Hash>(left: &FxHashSet<T>, right: &FxHashSet<T>) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    let intersection = left.intersection(right).count();
    let union = left.len() + right.len() - intersection;
    #[allow(clippy::cast_precision_loss)]
    let score = intersection as f64 / union as f64;
    score
}
