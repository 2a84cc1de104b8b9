/// Prometheusメトリクス定義。
use prometheus::{
    Histogram, IntCounter, IntCounterVec, IntGauge, Registry, histogram_opts,
    register_histogram_with_registry, register_int_counter_vec_with_registry,
    register_int_counter_with_registry, register_int_gauge_with_registry,
};
use std::{sync::Arc, time::Duration};

/// メトリクスコレクター。
#[derive(Debug, Clone)]
pub struct Metrics {
    // カウンター
    pub decisions: IntCounterVec,
    pub duplicates_flagged: IntCounter,
    pub persist_failures: IntCounter,

    // ヒストグラム
    pub candidate_duration: Histogram,

    // ゲージ
    pub collection_size: IntGauge,
}

impl Metrics {
    /// 新しいメトリクスコレクターを作成し、`registry` に登録する。
    ///
    /// # Errors
    /// 同名のメトリクスが既に登録されている場合はエラーを返す。
    pub fn new(registry: Arc<Registry>) -> Result<Self, prometheus::Error> {
        Ok(Self {
            decisions: register_int_counter_vec_with_registry!(
                "curator_decisions_total",
                "Curation decisions by status",
                &["status"],
                registry
            )?,
            duplicates_flagged: register_int_counter_with_registry!(
                "curator_duplicates_flagged_total",
                "Candidates flagged as possible duplicates",
                registry
            )?,
            persist_failures: register_int_counter_with_registry!(
                "curator_persist_failures_total",
                "Report or snapshot writes that failed",
                registry
            )?,
            candidate_duration: register_histogram_with_registry!(
                histogram_opts!(
                    "curator_candidate_duration_seconds",
                    "Time spent deciding one candidate after the pure phase",
                    vec![0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5]
                ),
                registry
            )?,
            collection_size: register_int_gauge_with_registry!(
                "curator_collection_size",
                "Recipes in the accepted collection",
                registry
            )?,
        })
    }

    /// 1件の判定結果を記録する。
    pub fn record_decision(&self, status: &str, flagged: bool, elapsed: Duration) {
        self.decisions.with_label_values(&[status]).inc();
        if flagged {
            self.duplicates_flagged.inc();
        }
        self.candidate_duration.observe(elapsed.as_secs_f64());
    }

    pub fn record_persist_failure(&self) {
        self.persist_failures.inc();
    }

    pub fn set_collection_size(&self, size: usize) {
        self.collection_size
            .set(i64::try_from(size).unwrap_or(i64::MAX));
    }
}
