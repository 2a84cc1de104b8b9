//! Quota bookkeeping for the accepted collection.
//!
//! [`DiversityTracker`] owns the [`DiversityLedger`] and the configured
//! [`CollectionTargets`]. Admission is a read-only check against the ledger;
//! only [`DiversityTracker::commit`] changes counters.
mod ledger;
mod report;
mod targets;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use ledger::DiversityLedger;
pub use report::{
    DiversityMetrics, Priority, PriorityKind, Progress, ProgressReport, ReportSummary,
};
pub use targets::{
    CollectionTargets, DEFAULT_CUISINE_TARGET, DEFAULT_MEAL_TARGET, TRACKED_DIETS, TargetsError,
};

use crate::{
    model::{Candidate, EnrichedRecipe},
    util::text::normalize_title,
    vocabulary::Vocabulary,
};

pub const SNAPSHOT_VERSION: u32 = 1;

/// Meal types with fewer distinct cuisines than this get a diversity note.
pub const MIN_CUISINES_PER_MEAL: usize = 4;

const SIGNATURE_INGREDIENTS: usize = 5;

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("unsupported diversity snapshot version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
}

/// Result of checking one enriched recipe against the quotas.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionDecision {
    pub admit: bool,
    /// Why the recipe is surplus. Empty when admitted.
    pub reasons: Vec<String>,
    /// Non-blocking observations about collection balance.
    pub notes: Vec<String>,
}

/// Serialized tracker state for resuming a collection run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiversitySnapshot {
    pub version: u32,
    pub taken_at: DateTime<Utc>,
    pub collection_date: DateTime<Utc>,
    pub targets: CollectionTargets,
    pub ledger: DiversityLedger,
}

#[derive(Debug, Clone)]
pub struct DiversityTracker {
    vocabulary: Arc<Vocabulary>,
    targets: CollectionTargets,
    ledger: DiversityLedger,
    collection_date: DateTime<Utc>,
}

impl DiversityTracker {
    #[must_use]
    pub fn new(vocabulary: Arc<Vocabulary>, targets: CollectionTargets) -> Self {
        Self {
            vocabulary,
            targets,
            ledger: DiversityLedger::default(),
            collection_date: Utc::now(),
        }
    }

    /// Rebuilds a tracker from a snapshot, keeping its targets and counters.
    ///
    /// # Errors
    /// Returns [`SnapshotError::UnsupportedVersion`] for snapshots written by
    /// an incompatible version.
    pub fn restore(
        vocabulary: Arc<Vocabulary>,
        snapshot: DiversitySnapshot,
    ) -> Result<Self, SnapshotError> {
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        tracing::info!(
            total = snapshot.ledger.total_count,
            signatures = snapshot.ledger.recipe_signatures.len(),
            "restored diversity ledger"
        );
        Ok(Self {
            vocabulary,
            targets: snapshot.targets,
            ledger: snapshot.ledger,
            collection_date: snapshot.collection_date,
        })
    }

    /// Replaces the quotas while keeping the counters.
    #[must_use]
    pub fn with_targets(mut self, targets: CollectionTargets) -> Self {
        self.targets = targets;
        self
    }

    #[must_use]
    pub fn snapshot(&self) -> DiversitySnapshot {
        DiversitySnapshot {
            version: SNAPSHOT_VERSION,
            taken_at: Utc::now(),
            collection_date: self.collection_date,
            targets: self.targets.clone(),
            ledger: self.ledger.clone(),
        }
    }

    #[must_use]
    pub fn targets(&self) -> &CollectionTargets {
        &self.targets
    }

    #[must_use]
    pub fn ledger(&self) -> &DiversityLedger {
        &self.ledger
    }

    #[must_use]
    pub fn collection_date(&self) -> DateTime<Utc> {
        self.collection_date
    }

    /// Normalized title plus the sorted main ingredients of the first five lines.
    #[must_use]
    pub fn signature(&self, recipe: &Candidate) -> String {
        let rules = &self.vocabulary.main_ingredient;
        let mut ingredients: Vec<String> = recipe
            .ingredients
            .iter()
            .take(SIGNATURE_INGREDIENTS)
            .map(|ingredient| rules.main_ingredient(&ingredient.name))
            .collect();
        ingredients.sort();

        let mut parts = Vec::with_capacity(ingredients.len() + 1);
        parts.push(normalize_title(&recipe.title));
        parts.extend(ingredients);
        parts.join("|")
    }

    #[must_use]
    pub fn contains_signature(&self, signature: &str) -> bool {
        self.ledger.contains_signature(signature)
    }

    /// Checks quotas without touching the ledger.
    #[must_use]
    pub fn evaluate(&self, recipe: &EnrichedRecipe) -> AdmissionDecision {
        let meal = recipe.attributes.meal_type;
        let cuisine = recipe.cuisine_key();
        let mut decision = AdmissionDecision {
            admit: true,
            ..AdmissionDecision::default()
        };

        if self.ledger.meal_count(meal) >= self.targets.meal_target(meal) {
            decision.admit = false;
            decision
                .reasons
                .push(format!("Already have enough {} recipes", meal.as_str()));
        }
        if self.ledger.cuisine_count(cuisine) >= self.targets.cuisine_target(cuisine) {
            decision.admit = false;
            decision
                .reasons
                .push(format!("Already have enough {cuisine} cuisine recipes"));
        }
        if self.ledger.cuisines_in(meal) < MIN_CUISINES_PER_MEAL
            && self.ledger.cuisine_meal_count(meal, cuisine) > 0
        {
            decision
                .notes
                .push(format!("Need more cuisine diversity in {}", meal.as_str()));
        }
        decision
    }

    /// Records an accepted recipe. Returns `false`, changing nothing, when its
    /// signature is already in the ledger.
    pub fn commit(&mut self, recipe: &EnrichedRecipe) -> bool {
        let signature = self.signature(&recipe.candidate);
        if self.ledger.contains_signature(&signature) {
            tracing::debug!(title = recipe.title(), "signature already committed");
            return false;
        }
        self.ledger
            .record(recipe, signature, &self.vocabulary.diversity);
        true
    }

    /// Evaluates and, when admitted, commits in one step.
    pub fn admit(&mut self, recipe: &EnrichedRecipe) -> AdmissionDecision {
        let decision = self.evaluate(recipe);
        if decision.admit {
            self.commit(recipe);
        }
        decision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        enrichment::RecipeEnricher,
        model::{Cuisine, Ingredient, MealType, Nutrition},
    };

    fn enriched(title: &str, ingredients: &[&str], tags: &[&str]) -> EnrichedRecipe {
        let mut candidate = Candidate::new(title);
        candidate.ingredients = ingredients
            .iter()
            .map(|name| Ingredient::new(*name, 1.0, "cup"))
            .collect();
        candidate.instructions = vec!["Cook everything together.".to_string()];
        candidate.nutrition = Some(Nutrition {
            calories: 420.0,
            carbs: 40.0,
            fiber: 6.0,
            protein: 20.0,
            ..Nutrition::default()
        });
        candidate.tags = tags.iter().map(|t| (*t).to_string()).collect();
        candidate.source_site = "example.org".to_string();
        RecipeEnricher::new(Vocabulary::builtin()).enrich(&candidate)
    }

    fn tracker(targets: CollectionTargets) -> DiversityTracker {
        DiversityTracker::new(Vocabulary::builtin(), targets)
    }

    fn mediterranean(n: usize) -> EnrichedRecipe {
        let recipe = enriched(
            &format!("Greek salad {n}"),
            &["feta", "olive oil", "tomatoes", "cucumber"],
            &["dinner"],
        );
        assert_eq!(recipe.attributes.cuisine, Some(Cuisine::Mediterranean));
        recipe
    }

    #[test]
    fn cuisine_quota_marks_the_next_recipe_surplus() {
        let mut targets = CollectionTargets::default();
        targets.by_cuisine.insert("mediterranean".to_string(), 60);
        targets.by_meal_type.insert(MealType::Dinner, 1_000);
        let mut tracker = tracker(targets);

        for n in 0..60 {
            assert!(tracker.admit(&mediterranean(n)).admit, "recipe {n} admitted");
        }
        assert_eq!(tracker.ledger().cuisine_count("mediterranean"), 60);

        let decision = tracker.admit(&mediterranean(60));
        assert!(!decision.admit);
        assert_eq!(
            decision.reasons,
            vec!["Already have enough mediterranean cuisine recipes".to_string()]
        );
        assert_eq!(tracker.ledger().cuisine_count("mediterranean"), 60);
        assert_eq!(tracker.ledger().total_count, 60);
    }

    #[test]
    fn full_meal_quota_is_never_silently_admitted() {
        let mut targets = CollectionTargets::default();
        targets.by_meal_type.insert(MealType::Dinner, 2);
        let mut tracker = tracker(targets);

        assert!(tracker.admit(&mediterranean(1)).admit);
        assert!(tracker.admit(&mediterranean(2)).admit);
        let decision = tracker.admit(&mediterranean(3));
        assert!(!decision.admit);
        assert_eq!(decision.reasons, vec!["Already have enough dinner recipes".to_string()]);
        assert_eq!(tracker.ledger().meal_count(MealType::Dinner), 2);
    }

    #[test]
    fn both_quotas_report_both_reasons() {
        let mut targets = CollectionTargets::default();
        targets.by_meal_type.insert(MealType::Dinner, 1);
        targets.by_cuisine.insert("mediterranean".to_string(), 1);
        let mut tracker = tracker(targets);
        assert!(tracker.admit(&mediterranean(1)).admit);
        assert_eq!(tracker.evaluate(&mediterranean(2)).reasons.len(), 2);
    }

    #[test]
    fn committing_the_same_signature_twice_is_a_no_op() {
        let mut tracker = tracker(CollectionTargets::default());
        let recipe = mediterranean(1);
        assert!(tracker.commit(&recipe));
        let before = tracker.ledger().clone();

        assert!(!tracker.commit(&recipe));
        assert_eq!(tracker.ledger(), &before);
    }

    #[test]
    fn signature_ignores_case_order_and_descriptors() {
        let tracker = tracker(CollectionTargets::default());
        let mut a = Candidate::new("Lentil Soup!");
        a.ingredients = vec![
            Ingredient::new("2 cups dried lentils", 2.0, "cup"),
            Ingredient::new("Carrots", 1.0, ""),
        ];
        let mut b = Candidate::new("lentil soup");
        b.ingredients = vec![
            Ingredient::new("carrots", 1.0, ""),
            Ingredient::new("dried lentils", 2.0, "cup"),
        ];
        assert_eq!(tracker.signature(&a), tracker.signature(&b));
        assert!(tracker.signature(&a).starts_with("lentil soup|"));
    }

    #[test]
    fn counters_sum_to_collection_size() {
        let mut tracker = tracker(CollectionTargets::default());
        tracker.admit(&mediterranean(1));
        tracker.admit(&enriched(
            "Chicken stir fry",
            &["chicken", "soy sauce", "ginger", "rice"],
            &["lunch", "gluten-free"],
        ));
        tracker.admit(&enriched(
            "Morning oats",
            &["oats", "milk", "blueberries"],
            &["breakfast", "vegetarian"],
        ));

        let ledger = tracker.ledger();
        assert_eq!(ledger.total_count, 3);
        assert_eq!(ledger.by_meal_type.values().sum::<u32>(), 3);
        assert_eq!(ledger.by_cuisine.values().sum::<u32>(), 3);
        assert_eq!(ledger.by_prep_time.values().sum::<u32>(), 3);
        assert_eq!(ledger.by_source.get("example.org"), Some(&3));
        assert_eq!(ledger.by_special_diet.get("vegetarian"), Some(&1));
        assert_eq!(ledger.by_special_diet.get("gluten-free"), Some(&1));
        assert!(ledger.protein_sources.contains_key("chicken"));
        assert!(ledger.grain_sources.contains_key("oats"));
        assert_eq!(ledger.recipe_signatures.len(), 3);
    }

    #[test]
    fn repeated_cuisine_in_a_thin_meal_type_gets_a_note() {
        let mut tracker = tracker(CollectionTargets::default());
        assert!(tracker.admit(&mediterranean(1)).notes.is_empty());
        let decision = tracker.admit(&mediterranean(2));
        assert!(decision.admit);
        assert_eq!(
            decision.notes,
            vec!["Need more cuisine diversity in dinner".to_string()]
        );
    }

    #[test]
    fn snapshot_round_trip_preserves_counters() {
        let mut tracker = tracker(CollectionTargets::default());
        tracker.admit(&mediterranean(1));
        let snapshot = tracker.snapshot();
        let json = serde_json::to_string(&snapshot).expect("snapshot serializes");
        let parsed: DiversitySnapshot = serde_json::from_str(&json).expect("snapshot parses");

        let restored =
            DiversityTracker::restore(Vocabulary::builtin(), parsed).expect("version matches");
        assert_eq!(restored.ledger(), tracker.ledger());
        assert!(restored.contains_signature(&tracker.signature(&mediterranean(1).candidate)));
    }

    #[test]
    fn restore_rejects_unknown_versions() {
        let mut snapshot = tracker(CollectionTargets::default()).snapshot();
        snapshot.version = 99;
        let error = DiversityTracker::restore(Vocabulary::builtin(), snapshot)
            .expect_err("version mismatch");
        assert!(matches!(
            error,
            SnapshotError::UnsupportedVersion { found: 99, .. }
        ));
    }
}
