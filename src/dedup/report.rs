//! All-versus-all duplicate report for a batch of recipes.
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use petgraph::unionfind::UnionFind;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::{DuplicateDetector, SimilarityScores};
use crate::model::Candidate;

const HIGH_SIMILARITY: f64 = 0.9;
const MEDIUM_SIMILARITY: f64 = 0.7;
const MANY_HIGH_PAIRS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicatePair {
    pub index1: usize,
    pub index2: usize,
    pub recipe1: String,
    pub recipe2: String,
    pub similarity: SimilarityScores,
}

/// Pair counts above the report floor: high (> 0.9), medium (> 0.7), low.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimilarityDistribution {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SimilarityDistribution {
    fn record(&mut self, combined: f64) {
        if combined > HIGH_SIMILARITY {
            self.high += 1;
        } else if combined > MEDIUM_SIMILARITY {
            self.medium += 1;
        } else {
            self.low += 1;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplicateReport {
    pub generated_at: DateTime<Utc>,
    pub total_recipes: usize,
    pub duplicate_pairs: Vec<DuplicatePair>,
    /// Titles of transitively connected duplicates, one list per cluster.
    pub duplicate_groups: Vec<Vec<String>>,
    /// Titles of recipes whose fingerprints are identical.
    pub exact_copies: Vec<Vec<String>>,
    pub similarity_distribution: SimilarityDistribution,
    pub recommendations: Vec<String>,
}

impl DuplicateDetector {
    /// Compares every pair in `recipes` and summarizes the result.
    ///
    /// Pairs at or above the duplicate threshold are listed and clustered;
    /// every pair at or above the report floor lands in the histogram. The
    /// pre-filter is not applied here.
    #[must_use]
    pub fn batch_report(&self, recipes: &[Candidate]) -> DuplicateReport {
        let features: Vec<_> = recipes.par_iter().map(|r| self.features(r)).collect();
        let count = features.len();

        let scored: Vec<(usize, usize, SimilarityScores)> = (0..count)
            .into_par_iter()
            .flat_map_iter(|i| (i + 1..count).map(move |j| (i, j)))
            .map(|(i, j)| (i, j, self.score(&features[i], &features[j])))
            .filter(|(_, _, scores)| scores.combined >= self.settings.report_floor)
            .collect();

        let mut distribution = SimilarityDistribution::default();
        let mut clusters = UnionFind::<usize>::new(count);
        let mut duplicate_pairs = Vec::new();
        for (i, j, scores) in scored {
            distribution.record(scores.combined);
            if scores.is_duplicate {
                clusters.union(i, j);
                duplicate_pairs.push(DuplicatePair {
                    index1: i,
                    index2: j,
                    recipe1: recipes[i].title.clone(),
                    recipe2: recipes[j].title.clone(),
                    similarity: scores,
                });
            }
        }

        let mut members: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
        for pair in &duplicate_pairs {
            for idx in [pair.index1, pair.index2] {
                members.entry(clusters.find(idx)).or_default().push(idx);
            }
        }
        let duplicate_groups = titled_groups(recipes, members.into_values());

        let mut by_fingerprint: BTreeMap<u64, Vec<usize>> = BTreeMap::new();
        for (idx, feature) in features.iter().enumerate() {
            by_fingerprint.entry(feature.fingerprint).or_default().push(idx);
        }
        let exact_copies = titled_groups(
            recipes,
            by_fingerprint.into_values().filter(|group| group.len() > 1),
        );

        let recommendations = recommendations(duplicate_pairs.len(), &distribution);

        tracing::info!(
            recipes = count,
            duplicate_pairs = duplicate_pairs.len(),
            groups = duplicate_groups.len(),
            "duplicate report generated"
        );

        DuplicateReport {
            generated_at: Utc::now(),
            total_recipes: count,
            duplicate_pairs,
            duplicate_groups,
            exact_copies,
            similarity_distribution: distribution,
            recommendations,
        }
    }
}

/// Turns index groups into sorted, deduplicated title lists ordered by first member.
fn titled_groups<I>(recipes: &[Candidate], groups: I) -> Vec<Vec<String>>
where
    I: IntoIterator<Item = Vec<usize>>,
{
    let mut groups: Vec<Vec<usize>> = groups
        .into_iter()
        .map(|mut group| {
            group.sort_unstable();
            group.dedup();
            group
        })
        .collect();
    groups.sort_by_key(|group| group.first().copied());
    groups
        .into_iter()
        .map(|group| group.into_iter().map(|idx| recipes[idx].title.clone()).collect())
        .collect()
}

fn recommendations(pairs: usize, distribution: &SimilarityDistribution) -> Vec<String> {
    let mut advice = Vec::new();
    if pairs > 0 {
        advice.push(format!("Found {pairs} potential duplicate pairs"));
        advice.push("Review and merge similar recipes or differentiate them further".to_string());
    }
    if distribution.high > MANY_HIGH_PAIRS {
        advice.push(
            "Many highly similar recipes detected - consider diversifying the collection"
                .to_string(),
        );
    }
    advice
}
