//! One decision per candidate.
//!
//! ```text
//! Received → Validated{pass|fail} → Enriched → DuplicateChecked → DiversityChecked → Committed | Archived
//! ```
//!
//! Validation and enrichment are pure and run on the rayon pool. Duplicate
//! scoring, admission and commit run in batch order on the calling thread, so
//! the [`Curator`] is the single writer of the ledger, the reference index
//! and the accepted collection.
mod collection;
mod stage;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Instant,
};

use chrono::{DateTime, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use collection::AcceptedCollection;
pub use stage::{ArchiveReason, Stage, StageTrail};

use crate::{
    dedup::{DetectorSettings, DuplicateDetector, DuplicateReport},
    diversity::{CollectionTargets, DiversitySnapshot, DiversityTracker, Priority},
    enrichment::{EnrichmentStats, RecipeEnricher},
    model::{Candidate, EnrichedRecipe},
    observability::metrics::Metrics,
    validator::{Guidelines, QualityValidator, ValidationOutcome, ValidationStats},
    vocabulary::Vocabulary,
};

#[derive(Debug, Error)]
pub enum CurationError {
    #[error("invalid stage transition from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
    #[error("curation service is closed")]
    ServiceClosed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionStatus {
    Accepted,
    Surplus,
    Rejected,
    FlaggedDuplicate,
}

impl DecisionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Surplus => "surplus",
            Self::Rejected => "rejected",
            Self::FlaggedDuplicate => "flagged_duplicate",
        }
    }
}

/// Rejected candidates are reported as received; everything else enriched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DecisionRecipe {
    Enriched(Box<EnrichedRecipe>),
    Raw(Candidate),
}

impl DecisionRecipe {
    #[must_use]
    pub fn title(&self) -> &str {
        match self {
            Self::Enriched(recipe) => recipe.title(),
            Self::Raw(candidate) => &candidate.title,
        }
    }

    #[must_use]
    pub fn enriched(&self) -> Option<&EnrichedRecipe> {
        match self {
            Self::Enriched(recipe) => Some(recipe.as_ref()),
            Self::Raw(_) => None,
        }
    }
}

/// Audit record emitted for every candidate, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub status: DecisionStatus,
    pub recipe: DecisionRecipe,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duplicate_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub surplus_reasons: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub diversity_notes: Vec<String>,
    pub committed: bool,
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationStats {
    pub received: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub surplus: u64,
    pub flagged_duplicates: u64,
    pub already_collected: u64,
    pub committed: u64,
    pub validation: ValidationStats,
    pub enrichment: EnrichmentStats,
}

impl CurationStats {
    fn record(&mut self, record: &DecisionRecord) {
        self.received += 1;
        match record.status {
            DecisionStatus::Accepted => self.accepted += 1,
            DecisionStatus::Surplus => self.surplus += 1,
            DecisionStatus::Rejected => self.rejected += 1,
            DecisionStatus::FlaggedDuplicate => self.flagged_duplicates += 1,
        }
        if record.committed {
            self.committed += 1;
        }
        let already_collected = record.stages.iter().any(|stage| {
            *stage
                == Stage::Archived {
                    reason: ArchiveReason::AlreadyCollected,
                }
        });
        if already_collected {
            self.already_collected += 1;
        }
    }
}

/// Decisions for one batch, in processing order.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub decisions: Vec<DecisionRecord>,
    /// Candidates left unprocessed because the stop flag was raised.
    pub skipped: usize,
}

impl BatchOutcome {
    #[must_use]
    pub fn cancelled(&self) -> bool {
        self.skipped > 0
    }
}

/// End-of-run overview written next to the detailed reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurationSummary {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub stats: CurationStats,
    pub accepted_total: usize,
    pub validation_pass_rate: f64,
    pub validation_warning_rate: f64,
    pub priorities: Vec<Priority>,
}

/// Output of the pure phase.
enum Prepared {
    Rejected {
        candidate: Candidate,
        outcome: ValidationOutcome,
    },
    Enriched {
        recipe: Box<EnrichedRecipe>,
        outcome: ValidationOutcome,
    },
}

#[derive(Debug)]
pub struct Curator {
    run_id: Uuid,
    validator: QualityValidator,
    enricher: RecipeEnricher,
    detector: DuplicateDetector,
    tracker: DiversityTracker,
    collection: AcceptedCollection,
    stats: CurationStats,
    metrics: Option<Arc<Metrics>>,
}

impl Curator {
    #[must_use]
    pub fn new(
        vocabulary: Arc<Vocabulary>,
        settings: DetectorSettings,
        targets: CollectionTargets,
    ) -> Self {
        let tracker = DiversityTracker::new(Arc::clone(&vocabulary), targets);
        Self::with_tracker(vocabulary, settings, tracker)
    }

    /// Builds a curator around an existing tracker, e.g. one restored from a snapshot.
    #[must_use]
    pub fn with_tracker(
        vocabulary: Arc<Vocabulary>,
        settings: DetectorSettings,
        tracker: DiversityTracker,
    ) -> Self {
        Self {
            run_id: Uuid::now_v7(),
            validator: QualityValidator::new(Arc::clone(&vocabulary)),
            enricher: RecipeEnricher::new(Arc::clone(&vocabulary)),
            detector: DuplicateDetector::new(vocabulary, settings),
            tracker,
            collection: AcceptedCollection::default(),
            stats: CurationStats::default(),
            metrics: None,
        }
    }

    #[must_use]
    pub fn with_guidelines(mut self, guidelines: Guidelines) -> Self {
        let vocabulary = self.validator.vocabulary();
        self.validator = QualityValidator::with_guidelines(vocabulary, guidelines);
        self
    }

    #[must_use]
    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Loads recipes accepted by an earlier session into the reference index
    /// and the collection. Ledger counters come from the diversity snapshot.
    pub fn resume<I>(&mut self, accepted: I)
    where
        I: IntoIterator<Item = EnrichedRecipe>,
    {
        let before = self.collection.len();
        self.collection.extend(accepted);
        self.detector.seed(
            self.collection.recipes()[before..]
                .iter()
                .map(|recipe| &recipe.candidate),
        );
        info!(
            resumed = self.collection.len() - before,
            "resumed accepted collection"
        );
    }

    /// Identifier of this curator's run, shared by its logs and summary.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    #[must_use]
    pub fn stats(&self) -> &CurationStats {
        &self.stats
    }

    #[must_use]
    pub fn tracker(&self) -> &DiversityTracker {
        &self.tracker
    }

    #[must_use]
    pub fn detector(&self) -> &DuplicateDetector {
        &self.detector
    }

    #[must_use]
    pub fn collection(&self) -> &AcceptedCollection {
        &self.collection
    }

    #[must_use]
    pub fn snapshot(&self) -> DiversitySnapshot {
        self.tracker.snapshot()
    }

    /// Runs one candidate through every stage.
    ///
    /// # Errors
    /// Returns [`CurationError::InvalidTransition`] if the state machine is
    /// driven out of order.
    pub fn process(&mut self, candidate: Candidate) -> Result<DecisionRecord, CurationError> {
        let prepared = prepare(&self.validator, &self.enricher, candidate);
        self.decide(prepared)
    }

    /// Processes a batch in `(sourceUrl, title, input position)` order.
    ///
    /// The stop flag is checked before each candidate's sequential phase;
    /// candidates not yet decided when it is raised are skipped untouched.
    ///
    /// # Errors
    /// Propagates [`Curator::process`] errors.
    pub fn process_batch(
        &mut self,
        candidates: Vec<Candidate>,
        stop: &AtomicBool,
    ) -> Result<BatchOutcome, CurationError> {
        let ordered = order_batch(candidates);
        let total = ordered.len();

        let (validator, enricher) = (&self.validator, &self.enricher);
        let prepared: Vec<Prepared> = ordered
            .into_par_iter()
            .map(|candidate| prepare(validator, enricher, candidate))
            .collect();
        debug!(candidates = total, "pure phase complete");

        let mut outcome = BatchOutcome {
            decisions: Vec::with_capacity(total),
            skipped: 0,
        };
        for item in prepared {
            if stop.load(Ordering::Relaxed) {
                outcome.skipped = total - outcome.decisions.len();
                warn!(
                    processed = outcome.decisions.len(),
                    skipped = outcome.skipped,
                    "curation stopped between candidates"
                );
                break;
            }
            outcome.decisions.push(self.decide(item)?);
        }

        info!(
            run_id = %self.run_id,
            processed = outcome.decisions.len(),
            accepted = self.stats.accepted,
            rejected = self.stats.rejected,
            surplus = self.stats.surplus,
            flagged = self.stats.flagged_duplicates,
            "batch curated"
        );
        Ok(outcome)
    }

    /// All-versus-all duplicate report over the accepted collection.
    #[must_use]
    pub fn duplicate_report(&self) -> DuplicateReport {
        let recipes: Vec<Candidate> = self
            .collection
            .iter()
            .map(|recipe| recipe.candidate.clone())
            .collect();
        self.detector.batch_report(&recipes)
    }

    #[must_use]
    pub fn summary(&self, priority_limit: usize) -> CurationSummary {
        CurationSummary {
            run_id: self.run_id,
            generated_at: Utc::now(),
            stats: self.stats,
            accepted_total: self.collection.len(),
            validation_pass_rate: self.stats.validation.pass_rate(),
            validation_warning_rate: self.stats.validation.warning_rate(),
            priorities: self.tracker.next_priorities(priority_limit),
        }
    }

    fn decide(&mut self, prepared: Prepared) -> Result<DecisionRecord, CurationError> {
        let started = Instant::now();
        let mut trail = StageTrail::default();

        let (mut recipe, outcome) = match prepared {
            Prepared::Rejected { candidate, outcome } => {
                trail.advance(Stage::Validated { passed: false })?;
                trail.advance(Stage::Archived {
                    reason: ArchiveReason::Rejected,
                })?;
                self.stats.validation.record(&outcome);
                warn!(
                    title = %candidate.title,
                    errors = ?outcome.errors,
                    "candidate rejected"
                );
                let record = DecisionRecord {
                    status: DecisionStatus::Rejected,
                    recipe: DecisionRecipe::Raw(candidate),
                    errors: outcome.errors,
                    warnings: outcome.warnings,
                    duplicate_of: None,
                    duplicate_score: None,
                    surplus_reasons: Vec::new(),
                    diversity_notes: Vec::new(),
                    committed: false,
                    stages: trail.into_stages(),
                };
                return Ok(self.finish(record, started));
            }
            Prepared::Enriched { recipe, outcome } => (recipe, outcome),
        };

        trail.advance(Stage::Validated { passed: true })?;
        trail.advance(Stage::Enriched)?;
        self.stats.validation.record(&outcome);
        let ValidationOutcome {
            errors,
            warnings,
            glycemic_index,
            allergens,
            ..
        } = outcome;
        recipe.attributes.estimated_glycemic_index = glycemic_index;
        recipe.attributes.allergens = allergens;
        self.stats.enrichment.record(&recipe);

        let best = self
            .detector
            .find_duplicates(&recipe.candidate)
            .into_iter()
            .next();
        let signature = self.tracker.signature(&recipe.candidate);
        let already_collected = self.tracker.contains_signature(&signature);
        trail.advance(Stage::DuplicateChecked)?;
        let (duplicate_of, duplicate_score) = best
            .map(|found| (found.id, found.scores.combined))
            .unzip();
        if let (Some(of), Some(score)) = (&duplicate_of, duplicate_score) {
            debug!(title = recipe.title(), duplicate_of = %of, score, "possible duplicate");
        }

        let mut status = DecisionStatus::FlaggedDuplicate;
        let mut committed = false;
        let mut surplus_reasons = Vec::new();
        let mut diversity_notes = Vec::new();

        if already_collected {
            trail.advance(Stage::Archived {
                reason: ArchiveReason::AlreadyCollected,
            })?;
        } else {
            let admission = self.tracker.evaluate(&recipe);
            trail.advance(Stage::DiversityChecked)?;
            diversity_notes = admission.notes;
            if admission.admit {
                self.tracker.commit(&recipe);
                self.detector.insert(&recipe.candidate);
                self.collection.push((*recipe).clone());
                trail.advance(Stage::Committed)?;
                committed = true;
                if duplicate_of.is_none() {
                    status = DecisionStatus::Accepted;
                }
            } else {
                trail.advance(Stage::Archived {
                    reason: ArchiveReason::Surplus,
                })?;
                status = DecisionStatus::Surplus;
                surplus_reasons = admission.reasons;
            }
        }

        let record = DecisionRecord {
            status,
            recipe: DecisionRecipe::Enriched(recipe),
            errors,
            warnings,
            duplicate_of,
            duplicate_score,
            surplus_reasons,
            diversity_notes,
            committed,
            stages: trail.into_stages(),
        };
        Ok(self.finish(record, started))
    }

    fn finish(&mut self, record: DecisionRecord, started: Instant) -> DecisionRecord {
        self.stats.record(&record);
        if let Some(metrics) = &self.metrics {
            metrics.record_decision(
                record.status.as_str(),
                record.duplicate_of.is_some(),
                started.elapsed(),
            );
            metrics.set_collection_size(self.collection.len());
        }
        info!(
            title = record.recipe.title(),
            status = record.status.as_str(),
            committed = record.committed,
            "candidate curated"
        );
        record
    }
}

fn prepare(
    validator: &QualityValidator,
    enricher: &RecipeEnricher,
    candidate: Candidate,
) -> Prepared {
    let outcome = validator.validate(&candidate);
    if outcome.passed {
        let recipe = Box::new(enricher.enrich(&candidate));
        Prepared::Enriched { recipe, outcome }
    } else {
        Prepared::Rejected { candidate, outcome }
    }
}

/// Sorts by source URL, then title, then input position.
fn order_batch(candidates: Vec<Candidate>) -> Vec<Candidate> {
    let mut indexed: Vec<(usize, Candidate)> = candidates.into_iter().enumerate().collect();
    indexed.sort_by(|(left_idx, left), (right_idx, right)| {
        left.source_url
            .cmp(&right.source_url)
            .then_with(|| left.title.cmp(&right.title))
            .then(left_idx.cmp(right_idx))
    });
    indexed.into_iter().map(|(_, candidate)| candidate).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ingredient, MealType, Nutrition};

    fn curator(targets: CollectionTargets) -> Curator {
        Curator::new(Vocabulary::builtin(), DetectorSettings::default(), targets)
    }

    fn dinner(title: &str, url: &str, ingredients: &[&str]) -> Candidate {
        let mut candidate = Candidate::new(title);
        candidate.ingredients = ingredients
            .iter()
            .map(|name| Ingredient::new(*name, 1.0, "cup"))
            .collect();
        candidate.instructions = vec!["Simmer for 20 minutes.".to_string()];
        candidate.nutrition = Some(Nutrition {
            calories: 420.0,
            carbs: 40.0,
            fiber: 8.0,
            sugar: 6.0,
            protein: 22.0,
            fat: 12.0,
            saturated_fat: 2.0,
            sodium: 400.0,
        });
        candidate.cook_time = 25;
        candidate.tags.insert("dinner".to_string());
        candidate.source_url = url.to_string();
        candidate
    }

    #[test]
    fn accepted_candidate_is_committed_everywhere() {
        let mut curator = curator(CollectionTargets::default());
        let record = curator
            .process(dinner(
                "Lentil stew",
                "https://a.example/1",
                &["lentils", "carrots", "spinach"],
            ))
            .expect("valid transitions");

        assert_eq!(record.status, DecisionStatus::Accepted);
        assert!(record.committed);
        assert!(record.errors.is_empty());
        assert_eq!(record.stages.last(), Some(&Stage::Committed));
        assert_eq!(curator.collection().len(), 1);
        assert_eq!(curator.detector().len(), 1);
        assert_eq!(curator.tracker().ledger().meal_count(MealType::Dinner), 1);
        let enriched = record.recipe.enriched().expect("enriched");
        assert_eq!(
            enriched.attributes.estimated_glycemic_index,
            crate::model::GlycemicIndex::Low
        );
    }

    #[test]
    fn rejected_candidate_leaves_no_trace() {
        let mut curator = curator(CollectionTargets::default());
        let mut candidate = dinner("Sugar bomb", "https://a.example/2", &["sugar", "flour", "butter"]);
        candidate.nutrition = Some(Nutrition {
            carbs: 90.0,
            ..Nutrition::default()
        });
        let record = curator.process(candidate).expect("valid transitions");

        assert_eq!(record.status, DecisionStatus::Rejected);
        assert!(!record.committed);
        assert!(!record.errors.is_empty());
        assert!(matches!(record.recipe, DecisionRecipe::Raw(_)));
        assert_eq!(
            record.stages.last(),
            Some(&Stage::Archived {
                reason: ArchiveReason::Rejected
            })
        );
        assert!(curator.collection().is_empty());
        assert_eq!(curator.tracker().ledger().total_count, 0);
    }

    #[test]
    fn reprocessing_the_same_recipe_is_idempotent() {
        let mut curator = curator(CollectionTargets::default());
        let recipe = dinner("Lentil stew", "https://a.example/1", &["lentils", "carrots", "spinach"]);
        curator.process(recipe.clone()).expect("first pass");
        let ledger = curator.tracker().ledger().clone();

        let record = curator.process(recipe).expect("second pass");
        assert_eq!(record.status, DecisionStatus::FlaggedDuplicate);
        assert!(!record.committed);
        assert!(record.duplicate_of.is_some());
        assert_eq!(curator.tracker().ledger(), &ledger);
        assert_eq!(curator.collection().len(), 1);
        assert_eq!(curator.stats().already_collected, 1);
    }

    #[test]
    fn surplus_is_archived_with_reasons() {
        let mut targets = CollectionTargets::default();
        targets.by_meal_type.insert(MealType::Dinner, 1);
        let mut curator = curator(targets);
        curator
            .process(dinner("Lentil stew", "https://a.example/1", &["lentils", "carrots", "spinach"]))
            .expect("first");
        let record = curator
            .process(dinner("Beef chili", "https://a.example/3", &["beef", "kidney beans", "onion"]))
            .expect("second");

        assert_eq!(record.status, DecisionStatus::Surplus);
        assert!(!record.committed);
        assert_eq!(
            record.surplus_reasons,
            vec!["Already have enough dinner recipes".to_string()]
        );
        assert_eq!(curator.collection().len(), 1);
        assert_eq!(curator.stats().surplus, 1);
    }

    #[test]
    fn batch_order_does_not_depend_on_input_order() {
        let batch = vec![
            dinner("Stew C", "https://c.example/1", &["lentils", "carrots", "spinach"]),
            dinner("Stew A", "https://a.example/1", &["beef", "kidney beans", "onion"]),
            dinner("Stew B", "https://b.example/1", &["tofu", "broccoli", "rice"]),
        ];
        let mut reversed = batch.clone();
        reversed.reverse();

        let titles = |candidates: Vec<Candidate>| {
            let mut curator = curator(CollectionTargets::default());
            curator
                .process_batch(candidates, &AtomicBool::new(false))
                .expect("batch")
                .decisions
                .iter()
                .map(|record| record.recipe.title().to_string())
                .collect::<Vec<_>>()
        };
        assert_eq!(titles(batch), vec!["Stew A", "Stew B", "Stew C"]);
        assert_eq!(titles(reversed), vec!["Stew A", "Stew B", "Stew C"]);
    }

    #[test]
    fn raised_stop_flag_skips_the_rest() {
        let mut curator = curator(CollectionTargets::default());
        let batch = vec![
            dinner("Stew A", "https://a.example/1", &["lentils", "carrots", "spinach"]),
            dinner("Stew B", "https://b.example/1", &["tofu", "broccoli", "rice"]),
        ];
        let outcome = curator
            .process_batch(batch, &AtomicBool::new(true))
            .expect("batch");
        assert!(outcome.cancelled());
        assert_eq!(outcome.skipped, 2);
        assert!(outcome.decisions.is_empty());
        assert_eq!(curator.stats().received, 0);
    }

    #[test]
    fn resumed_recipes_are_found_as_duplicates() {
        let mut first = curator(CollectionTargets::default());
        let recipe = dinner("Lentil stew", "https://a.example/1", &["lentils", "carrots", "spinach"]);
        first.process(recipe.clone()).expect("first run");
        let accepted = first.collection().recipes().to_vec();

        let tracker = DiversityTracker::restore(Vocabulary::builtin(), first.snapshot())
            .expect("snapshot version");
        let mut second = Curator::with_tracker(Vocabulary::builtin(), DetectorSettings::default(), tracker);
        second.resume(accepted);

        let record = second.process(recipe).expect("second run");
        assert_eq!(record.status, DecisionStatus::FlaggedDuplicate);
        assert!(!record.committed);
        assert_eq!(second.collection().len(), 1);
    }

    #[test]
    fn decision_record_round_trips_through_json() {
        let mut curator = curator(CollectionTargets::default());
        let record = curator
            .process(dinner("Lentil stew", "https://a.example/1", &["lentils", "carrots", "spinach"]))
            .expect("process");
        let json = serde_json::to_value(&record).expect("serialize");
        assert_eq!(json["status"], "accepted");
        assert!(json.get("duplicateOf").is_none());
        assert_eq!(json["recipe"]["mealType"], "dinner");

        let parsed: DecisionRecord = serde_json::from_value(json).expect("deserialize");
        assert!(parsed.recipe.enriched().is_some());
    }
}
