//! Properties of the duplicate score over a generated corpus.
use recipe_curator::{
    analysis::synthetic_candidates,
    dedup::{DetectorSettings, DuplicateDetector},
    vocabulary::Vocabulary,
};
use rstest::rstest;

fn detector(threshold: f64) -> DuplicateDetector {
    DuplicateDetector::new(
        Vocabulary::builtin(),
        DetectorSettings {
            threshold,
            ..DetectorSettings::default()
        },
    )
}

#[test]
fn score_is_symmetric() {
    let detector = detector(0.75);
    let corpus = synthetic_candidates(40);
    for (i, left) in corpus.iter().enumerate() {
        for right in &corpus[i + 1..] {
            let forward = detector.compare(left, right);
            let backward = detector.compare(right, left);
            assert!(
                (forward.combined - backward.combined).abs() < 1e-12,
                "{} vs {}",
                left.title,
                right.title
            );
        }
    }
}

#[test]
fn self_similarity_is_maximal() {
    let detector = detector(0.75);
    for recipe in synthetic_candidates(40) {
        let scores = detector.compare(&recipe, &recipe);
        assert!(
            (scores.combined - 1.0).abs() < 1e-9,
            "{}: {}",
            recipe.title,
            scores.combined
        );
        assert!(scores.is_duplicate);
    }
}

#[rstest]
#[case(0.5)]
#[case(0.75)]
#[case(0.9)]
fn duplicate_flag_matches_threshold(#[case] threshold: f64) {
    let detector = detector(threshold);
    let corpus = synthetic_candidates(30);
    for left in &corpus {
        for right in &corpus {
            let scores = detector.compare(left, right);
            assert_eq!(scores.is_duplicate, scores.combined >= threshold);
        }
    }
}

#[test]
fn batch_report_lists_only_pairs_above_threshold() {
    let detector = detector(0.75);
    let corpus = synthetic_candidates(60);
    let report = detector.batch_report(&corpus);

    assert_eq!(report.total_recipes, 60);
    for pair in &report.duplicate_pairs {
        assert!(pair.index1 < pair.index2);
        assert!(pair.similarity.combined >= 0.75);
    }
    let grouped: usize = report.duplicate_groups.iter().map(Vec::len).sum();
    assert!(grouped <= corpus.len());
}
