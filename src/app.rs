//! Wiring for one curation run: configuration, telemetry, vocabulary,
//! restored state, the batch itself and the files it leaves behind.
use std::{
    path::{Path, PathBuf},
    sync::{Arc, atomic::AtomicBool},
};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::{
    config::Config,
    curation::{BatchOutcome, CurationSummary, Curator},
    diversity::{CollectionTargets, DiversitySnapshot, DiversityTracker},
    model::{Candidate, EnrichedRecipe},
    observability::Telemetry,
    persist::{self, PersistError},
    vocabulary::Vocabulary,
};

pub const DECISIONS_FILE: &str = "decisions.jsonl";
pub const ACCEPTED_FILE: &str = "accepted.jsonl";
pub const SNAPSHOT_FILE: &str = "diversity_snapshot.json";
pub const DIVERSITY_REPORT_FILE: &str = "diversity_report.json";
pub const DUPLICATE_REPORT_FILE: &str = "duplicate_report.json";
pub const SUMMARY_FILE: &str = "summary_report.json";
pub const METRICS_FILE: &str = "metrics.prom";

/// Everything a run needs, built once from [`Config`].
pub struct ComponentRegistry {
    config: Arc<Config>,
    telemetry: Telemetry,
    curator: Curator,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunReport {
    pub summary: CurationSummary,
    pub skipped: usize,
    pub malformed_lines: usize,
    pub persist_failures: usize,
}

impl ComponentRegistry {
    /// 構成情報から語彙・目標値・保存済み状態を読み込み、キュレーターを組み立てる。
    ///
    /// # Errors
    /// Telemetry の初期化、語彙・目標値・スナップショットの読み込みに失敗した場合はエラーを返す。
    pub fn build(config: Config) -> Result<Self> {
        let telemetry = Telemetry::new()?;
        Self::with_telemetry(config, telemetry)
    }

    /// [`ComponentRegistry::build`] without installing the global subscriber.
    ///
    /// # Errors
    /// See [`ComponentRegistry::build`].
    pub fn with_telemetry(config: Config, telemetry: Telemetry) -> Result<Self> {
        let config = Arc::new(config);
        let vocabulary = Vocabulary::load_or_builtin(config.vocabulary_path().map(PathBuf::as_path))
            .context("failed to load vocabulary")?;
        let targets_path = config.targets_path().map(PathBuf::as_path);
        let targets = CollectionTargets::load_or_default(targets_path)
            .context("failed to load collection targets")?;

        let restored = match config.state_path().filter(|path| path.exists()) {
            Some(path) => {
                let snapshot: DiversitySnapshot = persist::read_json(path)
                    .with_context(|| format!("failed to read snapshot {}", path.display()))?;
                let tracker = DiversityTracker::restore(Arc::clone(&vocabulary), snapshot)
                    .context("failed to restore diversity snapshot")?;
                // an explicit targets file wins over the targets stored in the snapshot
                Some(if targets_path.is_some() {
                    tracker.with_targets(targets.clone())
                } else {
                    tracker
                })
            }
            None => None,
        };
        let resuming = restored.is_some();
        let tracker = restored
            .unwrap_or_else(|| DiversityTracker::new(Arc::clone(&vocabulary), targets));

        let mut curator = Curator::with_tracker(vocabulary, config.detector_settings(), tracker)
            .with_metrics(telemetry.metrics());

        let accepted_path = config.output_dir().join(ACCEPTED_FILE);
        if resuming && accepted_path.exists() {
            let accepted = persist::read_json_lines::<EnrichedRecipe>(&accepted_path)
                .context("failed to read previously accepted recipes")?;
            if !accepted.malformed.is_empty() {
                warn!(
                    lines = ?accepted.malformed,
                    "ignored malformed lines in accepted recipes"
                );
            }
            curator.resume(accepted.records);
        }

        Ok(Self {
            config,
            telemetry,
            curator,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    #[must_use]
    pub fn curator(&self) -> &Curator {
        &self.curator
    }

    /// Curates the configured input file and writes every output document.
    ///
    /// Raising `stop` ends the batch between candidates; whatever was decided
    /// up to that point is still written.
    ///
    /// # Errors
    /// Fails when the input cannot be read or the curation task panics.
    /// Output write failures are logged and counted instead.
    pub async fn run(self, stop: Arc<AtomicBool>) -> Result<RunReport> {
        let Self {
            config,
            telemetry,
            mut curator,
        } = self;

        let input = persist::read_json_lines::<Candidate>(config.input_path())
            .context("failed to read candidates")?;
        if !input.malformed.is_empty() {
            warn!(lines = ?input.malformed, "ignored malformed candidate lines");
        }
        info!(
            candidates = input.records.len(),
            input = %config.input_path().display(),
            "starting curation run"
        );

        let candidates = input.records;
        let (curator, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = curator.process_batch(candidates, &stop);
            (curator, outcome)
        })
        .await
        .context("curation task failed")?;
        let outcome = outcome.context("curation aborted")?;

        let persist_failures = write_outputs(&config, &telemetry, &curator, &outcome);
        let summary = curator.summary(config.priority_limit());
        info!(
            accepted = summary.stats.accepted,
            rejected = summary.stats.rejected,
            surplus = summary.stats.surplus,
            flagged = summary.stats.flagged_duplicates,
            collection = summary.accepted_total,
            skipped = outcome.skipped,
            persist_failures,
            "curation run finished"
        );
        Ok(RunReport {
            summary,
            skipped: outcome.skipped,
            malformed_lines: input.malformed.len(),
            persist_failures,
        })
    }
}

fn write_outputs(
    config: &Config,
    telemetry: &Telemetry,
    curator: &Curator,
    outcome: &BatchOutcome,
) -> usize {
    let dir = config.output_dir();
    let snapshot = curator.snapshot();
    let mut results = vec![
        (
            dir.join(DECISIONS_FILE),
            persist::write_json_lines(&dir.join(DECISIONS_FILE), &outcome.decisions),
        ),
        (
            dir.join(ACCEPTED_FILE),
            persist::write_json_lines(&dir.join(ACCEPTED_FILE), curator.collection().iter()),
        ),
        json_output(&dir.join(SNAPSHOT_FILE), &snapshot),
        json_output(&dir.join(DIVERSITY_REPORT_FILE), &curator.tracker().report()),
        json_output(&dir.join(DUPLICATE_REPORT_FILE), &curator.duplicate_report()),
        json_output(
            &dir.join(SUMMARY_FILE),
            &curator.summary(config.priority_limit()),
        ),
    ];
    if let Some(state) = config.state_path() {
        results.push(json_output(state, &snapshot));
    }

    let mut failures = 0;
    for (path, result) in results {
        if let Err(error) = result {
            failures += 1;
            telemetry.metrics().record_persist_failure();
            warn!(path = %path.display(), error = ?error, "failed to write output");
        }
    }
    // after the failure counter moved, so the exposition includes it
    let metrics_path = dir.join(METRICS_FILE);
    if let Err(error) = persist::write_text(&metrics_path, &telemetry.render_prometheus()) {
        failures += 1;
        warn!(path = %metrics_path.display(), error = ?error, "failed to write metrics");
    }
    failures
}

fn json_output<T: Serialize>(path: &Path, value: &T) -> (PathBuf, Result<(), PersistError>) {
    (path.to_path_buf(), persist::write_json(path, value))
}
