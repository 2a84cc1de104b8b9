use recipe_curator::config::{Config, ConfigError};

const VARS: [&str; 12] = [
    "CURATOR_OUTPUT_DIR",
    "CURATOR_STATE_PATH",
    "CURATOR_TARGETS_PATH",
    "CURATOR_VOCABULARY_PATH",
    "CURATOR_DUPLICATE_THRESHOLD",
    "CURATOR_TITLE_PREFILTER",
    "CURATOR_WEIGHT_TITLE",
    "CURATOR_WEIGHT_INGREDIENTS",
    "CURATOR_WEIGHT_NUTRITION",
    "CURATOR_WEIGHT_METHOD",
    "CURATOR_REPORT_FLOOR",
    "CURATOR_WORKER_THREADS",
];

fn with_env<R>(set: &[(&str, &str)], f: impl FnOnce() -> R) -> R {
    let mut vars: Vec<(&str, Option<&str>)> = VARS.iter().map(|name| (*name, None)).collect();
    vars.push(("CURATOR_PRIORITY_LIMIT", None));
    vars.push(("CURATOR_INPUT_PATH", Some("candidates.jsonl")));
    for &(name, value) in set {
        vars.retain(|(existing, _)| *existing != name);
        vars.push((name, Some(value)));
    }
    temp_env::with_vars(vars, f)
}

#[test]
fn detector_settings_follow_the_environment() {
    let config = with_env(
        &[
            ("CURATOR_DUPLICATE_THRESHOLD", "0.8"),
            ("CURATOR_WEIGHT_METHOD", "0"),
            ("CURATOR_REPORT_FLOOR", "0.6"),
        ],
        Config::from_env,
    )
    .expect("config loads");

    let settings = config.detector_settings();
    assert!((settings.threshold - 0.8).abs() < f64::EPSILON);
    assert!((settings.report_floor - 0.6).abs() < f64::EPSILON);
    assert!(settings.weights.method.abs() < f64::EPSILON);
    assert!((settings.weights.ingredients - 0.4).abs() < f64::EPSILON);
}

#[test]
fn zero_worker_threads_are_rejected() {
    let error = with_env(&[("CURATOR_WORKER_THREADS", "0")], Config::from_env)
        .expect_err("zero threads");
    assert!(matches!(
        error,
        ConfigError::Invalid {
            name: "CURATOR_WORKER_THREADS",
            ..
        }
    ));
}

#[test]
fn non_finite_numbers_are_rejected() {
    let error = with_env(&[("CURATOR_TITLE_PREFILTER", "NaN")], Config::from_env)
        .expect_err("NaN prefilter");
    assert!(error.to_string().contains("CURATOR_TITLE_PREFILTER"));
}

#[test]
fn negative_weights_are_rejected() {
    let error = with_env(&[("CURATOR_WEIGHT_TITLE", "-0.1")], Config::from_env)
        .expect_err("negative weight");
    assert!(matches!(
        error,
        ConfigError::Invalid {
            name: "CURATOR_WEIGHT_TITLE",
            ..
        }
    ));
}

#[test]
fn optional_paths_are_carried_through() {
    let config = with_env(
        &[
            ("CURATOR_STATE_PATH", "/tmp/state.json"),
            ("CURATOR_TARGETS_PATH", "targets.yaml"),
        ],
        Config::from_env,
    )
    .expect("config loads");
    assert_eq!(
        config.state_path().map(|p| p.to_string_lossy().into_owned()),
        Some("/tmp/state.json".to_string())
    );
    assert!(config.targets_path().is_some());
    assert!(config.vocabulary_path().is_none());
}
