//! Versioned keyword tables.
//!
//! All classification vocabularies live in `config/vocabulary.yaml`, embedded
//! at compile time and overridable at run time. Each table is compiled into
//! a [`KeywordSet`] once, so the classifiers only ever see prepared data.

mod matcher;

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::{Arc, LazyLock},
};

use rustc_hash::FxHashSet;
use serde::Deserialize;
use thiserror::Error;

pub use matcher::KeywordSet;

use crate::{
    model::{Allergen, Cuisine, Season, ShoppingCategory, Trimester},
    util::text::{fold, strip_parentheticals},
};

const BUILTIN_VOCABULARY: &str = include_str!("../config/vocabulary.yaml");

static BUILTIN: LazyLock<Arc<Vocabulary>> = LazyLock::new(|| {
    Arc::new(
        Vocabulary::from_yaml_str(BUILTIN_VOCABULARY).expect("embedded vocabulary must be valid"),
    )
});

#[derive(Debug, Error)]
pub enum VocabularyError {
    #[error("failed to read vocabulary at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse vocabulary: {0}")]
    Deserialize(#[from] serde_yaml::Error),
    #[error("failed to build keyword automaton: {0}")]
    Automaton(#[from] aho_corasick::BuildError),
    #[error("invalid vocabulary: {0}")]
    Invalid(String),
}

/// Low/medium/high glycemic-index keyword tables plus preparation hints.
#[derive(Debug, Clone, Deserialize)]
pub struct GlycemicTables {
    pub low: KeywordSet,
    pub medium: KeywordSet,
    pub high: KeywordSet,
    pub lowering_phrases: KeywordSet,
    pub raising_phrases: KeywordSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CuisineKeywords {
    pub ingredients: KeywordSet,
    pub dishes: KeywordSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrimesterRule {
    pub avoid: KeywordSet,
    pub beneficial: KeywordSet,
    pub tag: String,
}

#[derive(Debug, Clone, Deserialize)]
struct CookingMethodEntry {
    verb: String,
    method: String,
}

/// Instruction verbs mapped to the cooking method they indicate.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<CookingMethodEntry>")]
pub struct CookingMethods {
    verbs: KeywordSet,
    methods: Vec<String>,
}

impl CookingMethods {
    /// Distinct methods in order of first appearance in `text`, at most `limit`.
    #[must_use]
    pub fn detect(&self, text: &str, limit: usize) -> Vec<String> {
        let mut methods: Vec<String> = Vec::new();
        for (idx, _) in self.verbs.first_occurrences(text) {
            let method = &self.methods[idx];
            if !methods.contains(method) {
                methods.push(method.clone());
            }
            if methods.len() == limit {
                break;
            }
        }
        methods
    }
}

impl TryFrom<Vec<CookingMethodEntry>> for CookingMethods {
    type Error = VocabularyError;

    fn try_from(entries: Vec<CookingMethodEntry>) -> Result<Self, Self::Error> {
        let verbs = KeywordSet::new(entries.iter().map(|entry| entry.verb.as_str()))?;
        if verbs.len() != entries.len() {
            return Err(VocabularyError::Invalid(
                "cooking method verbs must be unique and non-empty".to_string(),
            ));
        }
        let methods = entries.into_iter().map(|entry| entry.method).collect();
        Ok(Self { verbs, methods })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DietRules {
    pub paleo_excluded: KeywordSet,
    pub whole30_excluded: KeywordSet,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiversityKeywords {
    pub proteins: KeywordSet,
    pub grains: KeywordSet,
}

/// Word lists used to reduce an ingredient line to its main ingredient.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "RawIngredientRules")]
pub struct IngredientRules {
    descriptors: FxHashSet<String>,
    units: FxHashSet<String>,
    stopwords: FxHashSet<String>,
}

#[derive(Deserialize)]
struct RawIngredientRules {
    descriptors: Vec<String>,
    units: Vec<String>,
    stopwords: Vec<String>,
}

impl From<RawIngredientRules> for IngredientRules {
    fn from(raw: RawIngredientRules) -> Self {
        let folded = |words: Vec<String>| words.iter().map(|w| fold(w.trim())).collect();
        Self {
            descriptors: folded(raw.descriptors),
            units: folded(raw.units),
            stopwords: folded(raw.stopwords),
        }
    }
}

impl IngredientRules {
    /// Reduces "2 cups fresh baby spinach (packed)" to "baby spinach".
    ///
    /// Quantities, units, preparation descriptors, articles and parenthetical
    /// notes are removed. Returns an empty string when nothing is left.
    #[must_use]
    pub fn main_ingredient(&self, name: &str) -> String {
        let folded = fold(name);
        let cleaned = strip_parentheticals(&folded);
        cleaned
            .split(|c: char| !(c.is_alphanumeric() || c == '-' || c == '/' || c == '.'))
            .map(|word| word.trim_matches(|c: char| c == '.' || c == '-'))
            .filter(|word| !word.is_empty())
            .filter(|word| !word.chars().any(|c| c.is_ascii_digit()))
            .filter(|word| {
                !self.units.contains(*word)
                    && !self.descriptors.contains(*word)
                    && !self.stopwords.contains(*word)
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Every keyword table the curator uses.
#[derive(Debug, Clone, Deserialize)]
pub struct Vocabulary {
    pub version: u32,
    pub glycemic_index: GlycemicTables,
    pub common_ingredients: KeywordSet,
    pub allergens: BTreeMap<Allergen, KeywordSet>,
    pub seasons: BTreeMap<Season, KeywordSet>,
    pub year_round: KeywordSet,
    pub cuisines: BTreeMap<Cuisine, CuisineKeywords>,
    pub trimesters: BTreeMap<Trimester, TrimesterRule>,
    pub batch_indicators: KeywordSet,
    pub freezer_indicators: KeywordSet,
    pub shopping: BTreeMap<ShoppingCategory, KeywordSet>,
    pub cooking_methods: CookingMethods,
    pub method_tag_hints: KeywordSet,
    pub diets: DietRules,
    pub main_ingredient: IngredientRules,
    pub diversity: DiversityKeywords,
}

impl Vocabulary {
    /// The vocabulary compiled into the binary.
    #[must_use]
    pub fn builtin() -> Arc<Self> {
        Arc::clone(&BUILTIN)
    }

    /// Parses and checks a vocabulary document.
    ///
    /// # Errors
    /// Fails on malformed YAML, a zero version, or a season table that
    /// names `year-round` (which has its own list).
    pub fn from_yaml_str(yaml: &str) -> Result<Self, VocabularyError> {
        let vocabulary: Self = serde_yaml::from_str(yaml)?;
        vocabulary.check()?;
        Ok(vocabulary)
    }

    /// Loads a vocabulary file.
    ///
    /// # Errors
    /// See [`Vocabulary::from_yaml_str`]; also fails when the file cannot be read.
    pub fn load(path: &Path) -> Result<Self, VocabularyError> {
        let contents = fs::read_to_string(path).map_err(|source| VocabularyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Loads `path` when given, otherwise returns the built-in tables.
    ///
    /// # Errors
    /// See [`Vocabulary::load`].
    pub fn load_or_builtin(path: Option<&Path>) -> Result<Arc<Self>, VocabularyError> {
        match path {
            Some(path) => {
                let vocabulary = Self::load(path)?;
                tracing::info!(
                    path = %path.display(),
                    version = vocabulary.version,
                    "loaded vocabulary override"
                );
                Ok(Arc::new(vocabulary))
            }
            None => Ok(Self::builtin()),
        }
    }

    fn check(&self) -> Result<(), VocabularyError> {
        if self.version == 0 {
            return Err(VocabularyError::Invalid(
                "version must be at least 1".to_string(),
            ));
        }
        if self.seasons.contains_key(&Season::YearRound) {
            return Err(VocabularyError::Invalid(
                "year-round keywords belong in `year_round`, not `seasons`".to_string(),
            ));
        }
        if self.shopping.contains_key(&ShoppingCategory::Other) {
            return Err(VocabularyError::Invalid(
                "`other` is the shopping fallback and takes no keywords".to_string(),
            ));
        }
        Ok(())
    }
}
