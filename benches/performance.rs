/// 合成レシピ 1k 件でのキュレーション性能ベンチマーク。
use std::sync::atomic::AtomicBool;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use recipe_curator::{
    analysis::synthetic_candidates,
    curation::Curator,
    dedup::{DetectorSettings, DuplicateDetector},
    diversity::CollectionTargets,
    vocabulary::Vocabulary,
};

fn bench_batch_curation(c: &mut Criterion) {
    let candidates = synthetic_candidates(1024);
    c.bench_function("curate_batch_1k", |b| {
        b.iter(|| {
            let mut curator = Curator::new(
                Vocabulary::builtin(),
                DetectorSettings::default(),
                CollectionTargets::default(),
            );
            let outcome = curator
                .process_batch(candidates.clone(), &AtomicBool::new(false))
                .expect("valid transitions");
            black_box(outcome.decisions.len());
        });
    });
}

fn bench_duplicate_lookup(c: &mut Criterion) {
    let candidates = synthetic_candidates(1024);
    let mut detector = DuplicateDetector::new(Vocabulary::builtin(), DetectorSettings::default());
    detector.seed(&candidates[..1000]);

    c.bench_function("find_duplicates_1k_index", |b| {
        b.iter(|| {
            for probe in &candidates[1000..] {
                black_box(detector.find_duplicates(probe).len());
            }
        });
    });
}

fn bench_batch_report(c: &mut Criterion) {
    let candidates = synthetic_candidates(256);
    let detector = DuplicateDetector::new(Vocabulary::builtin(), DetectorSettings::default());
    c.bench_function("duplicate_report_256", |b| {
        b.iter(|| {
            let report = detector.batch_report(&candidates);
            black_box(report.duplicate_pairs.len());
        });
    });
}

criterion_group!(
    benches,
    bench_batch_curation,
    bench_duplicate_lookup,
    bench_batch_report
);
criterion_main!(benches);
