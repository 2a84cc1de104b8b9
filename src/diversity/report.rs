use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DiversityTracker, MIN_CUISINES_PER_MEAL};
use crate::model::{MealType, Season};

const MEAL_GAP_RATIO: f64 = 0.8;
const CUISINE_GAP_RATIO: f64 = 0.5;
const MIN_PROTEIN_VARIETY: usize = 10;
const MEAL_PRIORITY_WEIGHT: f64 = 2.0;
const CUISINE_PRIORITY_WEIGHT: f64 = 1.0;
/// A cuisine with fewer recipes than this in a meal type is underrepresented there.
const SPARSE_CUISINE_PER_MEAL: u32 = 3;
/// A meal type with fewer recipes than this of a cuisine still needs it.
const SPARSE_MEAL_PER_CUISINE: u32 = 5;
const TOP_SOURCES: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Progress {
    pub current: u32,
    pub target: u32,
    /// Percent of target reached; 0 when the target is 0.
    pub progress: f64,
    pub remaining: u32,
}

impl Progress {
    fn new(current: u32, target: u32) -> Self {
        let progress = if target > 0 {
            f64::from(current) / f64::from(target) * 100.0
        } else {
            0.0
        };
        Self {
            current,
            target,
            progress,
            remaining: target.saturating_sub(current),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_collected: u32,
    pub total_target: u32,
    pub overall_progress: f64,
    pub collection_date: DateTime<Utc>,
    pub report_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiversityMetrics {
    pub unique_ingredients: usize,
    pub protein_sources: usize,
    pub grain_sources: usize,
    pub cuisines_per_meal_type: BTreeMap<MealType, usize>,
    pub seasonal_coverage: BTreeMap<MealType, usize>,
    /// Most used protein sources, highest count first.
    pub top_proteins: Vec<SourceCount>,
    pub top_grains: Vec<SourceCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCount {
    pub name: String,
    pub count: u32,
}

fn source_counts(entries: Vec<(&str, u32)>) -> Vec<SourceCount> {
    entries
        .into_iter()
        .map(|(name, count)| SourceCount {
            name: name.to_string(),
            count,
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub summary: ReportSummary,
    pub by_meal_type: BTreeMap<MealType, Progress>,
    pub by_cuisine: BTreeMap<String, Progress>,
    pub by_season: BTreeMap<Season, Progress>,
    pub by_prep_time: BTreeMap<String, Progress>,
    pub by_special_diet: BTreeMap<String, Progress>,
    pub diversity_metrics: DiversityMetrics,
    pub gaps: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityKind {
    MealType,
    Cuisine,
}

/// One collection gap worth searching for next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Priority {
    pub kind: PriorityKind,
    pub value: String,
    pub priority: String,
    pub focus: String,
    pub needed: u32,
    pub priority_score: f64,
    pub search_terms: Vec<String>,
}

impl DiversityTracker {
    /// Progress per dimension, coverage metrics, gaps and recommendations.
    #[must_use]
    pub fn report(&self) -> ProgressReport {
        let ledger = &self.ledger;
        let targets = &self.targets;

        let meals: Vec<(MealType, Progress)> = MealType::ALL
            .into_iter()
            .filter(|meal| targets.by_meal_type.contains_key(meal))
            .map(|meal| (meal, Progress::new(ledger.meal_count(meal), targets.meal_target(meal))))
            .collect();
        let cuisines: Vec<(&str, Progress)> = targets
            .cuisine_keys()
            .into_iter()
            .map(|cuisine| {
                let progress =
                    Progress::new(ledger.cuisine_count(cuisine), targets.cuisine_target(cuisine));
                (cuisine, progress)
            })
            .collect();

        let by_season = targets
            .by_season
            .iter()
            .map(|(season, target)| {
                let current = ledger.by_season.get(season).copied().unwrap_or_default();
                (*season, Progress::new(current, *target))
            })
            .collect();
        let by_prep_time = string_progress(&targets.by_prep_time, &ledger.by_prep_time);
        let by_special_diet = string_progress(&targets.by_special_diet, &ledger.by_special_diet);

        let diversity_metrics = DiversityMetrics {
            unique_ingredients: ledger.unique_ingredients.len(),
            protein_sources: ledger.protein_sources.len(),
            grain_sources: ledger.grain_sources.len(),
            cuisines_per_meal_type: ledger
                .cuisine_meal_matrix
                .keys()
                .map(|meal| (*meal, ledger.cuisines_in(*meal)))
                .collect(),
            seasonal_coverage: ledger
                .seasonal_meal_matrix
                .keys()
                .map(|meal| (*meal, ledger.seasons_in(*meal)))
                .collect(),
            top_proteins: source_counts(ledger.top_proteins(TOP_SOURCES)),
            top_grains: source_counts(ledger.top_grains(TOP_SOURCES)),
        };

        let mut gaps = Vec::new();
        for (meal, progress) in &meals {
            if f64::from(progress.current) < f64::from(progress.target) * MEAL_GAP_RATIO {
                gaps.push(format!(
                    "Need {} more {} recipes",
                    progress.remaining,
                    meal.as_str()
                ));
            }
        }
        for (cuisine, progress) in &cuisines {
            if f64::from(progress.current) < f64::from(progress.target) * CUISINE_GAP_RATIO {
                gaps.push(format!(
                    "Need {} more {cuisine} cuisine recipes",
                    progress.remaining
                ));
            }
        }
        for (meal, count) in &diversity_metrics.cuisines_per_meal_type {
            if *count < MIN_CUISINES_PER_MEAL {
                gaps.push(format!(
                    "{} needs more cuisine variety (current: {count})",
                    meal.as_str()
                ));
            }
        }

        let mut recommendations = Vec::new();
        if let Some((meal, progress)) = lowest(&meals) {
            recommendations.push(format!(
                "Focus on {} recipes (only {:.0}% complete)",
                meal.as_str(),
                progress.progress
            ));
        }
        if let Some((cuisine, progress)) = lowest(&cuisines) {
            recommendations.push(format!(
                "Need more {cuisine} recipes (only {:.0}% complete)",
                progress.progress
            ));
        }
        if diversity_metrics.protein_sources < MIN_PROTEIN_VARIETY {
            recommendations.push(format!(
                "Increase protein variety (current: {} sources)",
                diversity_metrics.protein_sources
            ));
        }

        let overall_progress = if targets.total > 0 {
            f64::from(ledger.total_count) / f64::from(targets.total) * 100.0
        } else {
            0.0
        };

        ProgressReport {
            summary: ReportSummary {
                total_collected: ledger.total_count,
                total_target: targets.total,
                overall_progress,
                collection_date: self.collection_date,
                report_date: Utc::now(),
            },
            by_meal_type: meals.into_iter().collect(),
            by_cuisine: cuisines
                .into_iter()
                .map(|(cuisine, progress)| (cuisine.to_string(), progress))
                .collect(),
            by_season,
            by_prep_time,
            by_special_diet,
            diversity_metrics,
            gaps,
            recommendations,
        }
    }

    /// Unmet meal-type and cuisine quotas ranked by weighted shortfall.
    ///
    /// Meal-type gaps weigh twice as much as cuisine gaps. Equal scores keep
    /// meal types first, then declaration order.
    #[must_use]
    pub fn next_priorities(&self, limit: usize) -> Vec<Priority> {
        let ledger = &self.ledger;
        let targets = &self.targets;
        let cuisine_keys = targets.cuisine_keys();
        let meal_keys: Vec<MealType> = MealType::ALL
            .into_iter()
            .filter(|meal| targets.by_meal_type.contains_key(meal))
            .collect();

        let mut priorities = Vec::new();
        for meal in &meal_keys {
            let (current, target) = (ledger.meal_count(*meal), targets.meal_target(*meal));
            if current >= target {
                continue;
            }
            let sparse: Vec<&str> = cuisine_keys
                .iter()
                .copied()
                .filter(|cuisine| {
                    ledger.cuisine_meal_count(*meal, cuisine) < SPARSE_CUISINE_PER_MEAL
                })
                .collect();
            let focus = sparse.iter().take(3).copied().collect::<Vec<_>>().join(", ");
            priorities.push(Priority {
                kind: PriorityKind::MealType,
                value: meal.as_str().to_string(),
                priority: format!("{} recipes", meal.as_str()),
                focus: format!("Especially {focus} cuisines"),
                needed: target - current,
                priority_score: shortfall(current, target) * MEAL_PRIORITY_WEIGHT,
                search_terms: sparse
                    .iter()
                    .take(2)
                    .map(|cuisine| format!("{} {cuisine}", meal.as_str()))
                    .collect(),
            });
        }
        for cuisine in &cuisine_keys {
            let current = ledger.cuisine_count(cuisine);
            let target = targets.cuisine_target(cuisine);
            if current >= target {
                continue;
            }
            let needed_meals: Vec<&str> = meal_keys
                .iter()
                .filter(|meal| {
                    ledger.cuisine_meal_count(**meal, cuisine) < SPARSE_MEAL_PER_CUISINE
                })
                .map(|meal| meal.as_str())
                .collect();
            priorities.push(Priority {
                kind: PriorityKind::Cuisine,
                value: (*cuisine).to_string(),
                priority: format!("{cuisine} cuisine recipes"),
                focus: format!("Especially for {}", needed_meals.join(", ")),
                needed: target - current,
                priority_score: shortfall(current, target) * CUISINE_PRIORITY_WEIGHT,
                search_terms: needed_meals
                    .iter()
                    .take(2)
                    .map(|meal| format!("{cuisine} {meal}"))
                    .collect(),
            });
        }

        priorities.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
        priorities.truncate(limit);
        priorities
    }
}

fn shortfall(current: u32, target: u32) -> f64 {
    f64::from(target - current) / f64::from(target)
}

fn string_progress(
    targets: &BTreeMap<String, u32>,
    counts: &BTreeMap<String, u32>,
) -> BTreeMap<String, Progress> {
    targets
        .iter()
        .map(|(key, target)| {
            let current = counts.get(key).copied().unwrap_or_default();
            (key.clone(), Progress::new(current, *target))
        })
        .collect()
}

/// First entry with the lowest completion percentage.
fn lowest<K>(entries: &[(K, Progress)]) -> Option<&(K, Progress)> {
    entries
        .iter()
        .min_by(|a, b| a.1.progress.total_cmp(&b.1.progress))
}
