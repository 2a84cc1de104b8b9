//! Multi-signal duplicate detection.
//!
//! A pair of recipes is compared on four signals, each in `[0, 1]`:
//!
//! * title: `0.5·ratio + 0.3·token-sort ratio + 0.2·partial ratio`
//! * ingredients: Jaccard over main-ingredient sets
//! * nutrition: cosine over the seven-nutrient profile
//! * method: Jaccard over cooking-method tags, else a total-time ratio,
//!   else a neutral `0.5`, so a recipe with neither compared to itself
//!   scores `0.95`
//!
//! The weighted sum is the combined score; a pair is a duplicate when it
//! reaches the configured threshold. Duplicates are flagged, never dropped.

mod report;
mod similarity;

use std::{fmt::Write as _, sync::Arc};

use rayon::prelude::*;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

pub use report::{DuplicatePair, DuplicateReport, SimilarityDistribution};
pub use similarity::{Cosine, Levenshtein, StringSimilarity, VectorSimilarity};

use crate::{
    model::Candidate,
    util::text::{fold, fold_compact, hash_text, ingredient_text, jaccard},
    vocabulary::Vocabulary,
};

pub const DEFAULT_DUPLICATE_THRESHOLD: f64 = 0.75;
pub const DEFAULT_TITLE_PREFILTER: f64 = 70.0;
pub const DEFAULT_REPORT_FLOOR: f64 = 0.5;
const NEUTRAL_METHOD_SCORE: f64 = 0.5;
const METHOD_TAG_PREFIX: &str = "method-";

/// Component weights of the combined score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityWeights {
    pub title: f64,
    pub ingredients: f64,
    pub nutrition: f64,
    pub method: f64,
}

impl Default for SimilarityWeights {
    fn default() -> Self {
        Self {
            title: 0.3,
            ingredients: 0.4,
            nutrition: 0.2,
            method: 0.1,
        }
    }
}

impl SimilarityWeights {
    #[must_use]
    pub fn total(&self) -> f64 {
        self.title + self.ingredients + self.nutrition + self.method
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorSettings {
    pub weights: SimilarityWeights,
    /// Combined score at or above which a pair is a duplicate.
    pub threshold: f64,
    /// Title ratio (0-100) a reference recipe must exceed to be fully scored.
    pub title_prefilter: f64,
    /// Lowest combined score counted in batch-report histograms.
    pub report_floor: f64,
}

impl Default for DetectorSettings {
    fn default() -> Self {
        Self {
            weights: SimilarityWeights::default(),
            threshold: DEFAULT_DUPLICATE_THRESHOLD,
            title_prefilter: DEFAULT_TITLE_PREFILTER,
            report_floor: DEFAULT_REPORT_FLOOR,
        }
    }
}

/// Per-pair component scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityScores {
    pub title: f64,
    pub ingredients: f64,
    pub nutrition: f64,
    pub method: f64,
    pub combined: f64,
    pub is_duplicate: bool,
}

/// A reference recipe reduced to the features the detector compares.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedRecipe {
    pub id: String,
    pub title: String,
    folded_title: String,
    main_ingredients: FxHashSet<String>,
    nutrition: [f64; 7],
    method_tags: FxHashSet<String>,
    total_time: u32,
    fingerprint: u64,
}

impl IndexedRecipe {
    #[must_use]
    pub fn fingerprint(&self) -> u64 {
        self.fingerprint
    }
}

/// One reference recipe that scored as a duplicate of a candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateMatch {
    pub index: usize,
    pub id: String,
    pub title: String,
    pub scores: SimilarityScores,
}

#[derive(Debug, Clone)]
pub struct DuplicateDetector {
    vocabulary: Arc<Vocabulary>,
    settings: DetectorSettings,
    strings: Arc<dyn StringSimilarity>,
    vectors: Arc<dyn VectorSimilarity>,
    index: Vec<IndexedRecipe>,
}

impl DuplicateDetector {
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>, settings: DetectorSettings) -> Self {
        Self::with_strategies(vocabulary, settings, Arc::new(Levenshtein), Arc::new(Cosine))
    }

    #[must_use]
    pub fn with_strategies(
        vocabulary: Arc<Vocabulary>,
        settings: DetectorSettings,
        strings: Arc<dyn StringSimilarity>,
        vectors: Arc<dyn VectorSimilarity>,
    ) -> Self {
        Self {
            vocabulary,
            settings,
            strings,
            vectors,
            index: Vec::new(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &DetectorSettings {
        &self.settings
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Extracts comparison features from a recipe.
    #[must_use]
    pub fn features(&self, recipe: &Candidate) -> IndexedRecipe {
        let rules = &self.vocabulary.main_ingredient;
        let main_ingredients = recipe
            .ingredients
            .iter()
            .map(|ingredient| rules.main_ingredient(&ingredient.name))
            .filter(|name| !name.is_empty())
            .collect();

        let hints = &self.vocabulary.method_tag_hints;
        let method_tags = recipe
            .tags
            .iter()
            .map(|tag| fold(tag))
            .filter(|tag| tag.contains(METHOD_TAG_PREFIX) || hints.contains_any(tag))
            .collect();

        IndexedRecipe {
            id: recipe.identity().to_string(),
            title: recipe.title.clone(),
            folded_title: fold_compact(&recipe.title),
            main_ingredients,
            nutrition: recipe.nutrition_or_default().profile(),
            method_tags,
            total_time: recipe.total_time(),
            fingerprint: fingerprint(recipe),
        }
    }

    /// Scores two recipes. Symmetric in its arguments.
    #[must_use]
    pub fn compare(&self, left: &Candidate, right: &Candidate) -> SimilarityScores {
        self.score(&self.features(left), &self.features(right))
    }

    /// Scores two indexed recipes.
    #[must_use]
    pub fn score(&self, left: &IndexedRecipe, right: &IndexedRecipe) -> SimilarityScores {
        let title = self.title_similarity(&left.folded_title, &right.folded_title);
        let ingredients = jaccard(&left.main_ingredients, &right.main_ingredients);
        let nutrition = self.vectors.similarity(&left.nutrition, &right.nutrition);
        let method = method_similarity(left, right);

        let weights = &self.settings.weights;
        let combined = weights.title * title
            + weights.ingredients * ingredients
            + weights.nutrition * nutrition
            + weights.method * method;

        SimilarityScores {
            title,
            ingredients,
            nutrition,
            method,
            combined,
            is_duplicate: combined >= self.settings.threshold,
        }
    }

    /// Reference recipes the candidate duplicates, best match first.
    ///
    /// Only references whose title passes the cheap pre-filter are fully
    /// scored. Ties are broken by index order.
    #[must_use]
    pub fn find_duplicates(&self, candidate: &Candidate) -> Vec<DuplicateMatch> {
        let probe = self.features(candidate);
        let mut matches: Vec<DuplicateMatch> = self
            .index
            .par_iter()
            .enumerate()
            .filter(|(_, reference)| self.passes_prefilter(&probe, reference))
            .filter_map(|(idx, reference)| {
                let scores = self.score(&probe, reference);
                scores.is_duplicate.then(|| DuplicateMatch {
                    index: idx,
                    id: reference.id.clone(),
                    title: reference.title.clone(),
                    scores,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            b.scores
                .combined
                .total_cmp(&a.scores.combined)
                .then(a.index.cmp(&b.index))
        });
        matches
    }

    /// Adds a committed recipe to the reference index.
    pub fn insert(&mut self, recipe: &Candidate) {
        let features = self.features(recipe);
        self.index.push(features);
    }

    /// Seeds the reference index, e.g. with a previous session's accepted recipes.
    pub fn seed<'a, I>(&mut self, recipes: I)
    where
        I: IntoIterator<Item = &'a Candidate>,
    {
        let before = self.index.len();
        for recipe in recipes {
            self.insert(recipe);
        }
        tracing::info!(
            seeded = self.index.len() - before,
            total = self.index.len(),
            "duplicate index seeded"
        );
    }

    fn title_similarity(&self, left: &str, right: &str) -> f64 {
        0.5 * self.strings.ratio(left, right)
            + 0.3 * self.strings.token_sort_ratio(left, right)
            + 0.2 * self.strings.partial_ratio(left, right)
    }

    /// Word order is forgiven: the better of the plain and token-sorted ratios
    /// must exceed the cut-off.
    fn passes_prefilter(&self, left: &IndexedRecipe, right: &IndexedRecipe) -> bool {
        let a = &left.folded_title;
        let b = &right.folded_title;
        let ratio = self
            .strings
            .ratio(a, b)
            .max(self.strings.token_sort_ratio(a, b));
        ratio * 100.0 > self.settings.title_prefilter
    }
}

fn method_similarity(left: &IndexedRecipe, right: &IndexedRecipe) -> f64 {
    if !left.method_tags.is_empty() && !right.method_tags.is_empty() {
        return jaccard(&left.method_tags, &right.method_tags);
    }
    if left.total_time > 0 && right.total_time > 0 {
        let difference = f64::from(left.total_time.abs_diff(right.total_time));
        let longest = f64::from(left.total_time.max(right.total_time));
        return 1.0 - difference / longest;
    }
    NEUTRAL_METHOD_SCORE
}

/// Exact-copy fingerprint over folded title, ingredient names and nutrition.
#[must_use]
pub fn fingerprint(recipe: &Candidate) -> u64 {
    let mut key = fold_compact(&recipe.title);
    key.push('|');
    key.push_str(&ingredient_text(&recipe.ingredients));
    key.push('|');
    for value in recipe.nutrition_or_default().profile() {
        let _ = write!(key, "{value};");
    }
    hash_text(&key)
}
