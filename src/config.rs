use std::{env, num::NonZeroUsize, path::PathBuf};

use thiserror::Error;

use crate::dedup::{
    DEFAULT_DUPLICATE_THRESHOLD, DEFAULT_REPORT_FLOOR, DEFAULT_TITLE_PREFILTER, DetectorSettings,
    SimilarityWeights,
};

#[cfg(test)]
pub(crate) static ENV_MUTEX: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));

const DEFAULT_OUTPUT_DIR: &str = "curation_output";
const DEFAULT_PRIORITY_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    input_path: PathBuf,
    output_dir: PathBuf,
    state_path: Option<PathBuf>,
    targets_path: Option<PathBuf>,
    vocabulary_path: Option<PathBuf>,
    duplicate_threshold: f64,
    title_prefilter: f64,
    weights: SimilarityWeights,
    report_floor: f64,
    worker_threads: NonZeroUsize,
    priority_limit: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {source}")]
    Invalid {
        name: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl Config {
    /// 環境変数からキュレーターの設定値を読み込み、検証する。
    ///
    /// 入力ファイル以外はすべて既定値を持つ。
    ///
    /// # Errors
    /// `CURATOR_INPUT_PATH` が未設定、もしくは各種値のパースや範囲チェックに失敗した場合は
    /// [`ConfigError`] を返す。
    pub fn from_env() -> Result<Self, ConfigError> {
        let input_path = PathBuf::from(env_var("CURATOR_INPUT_PATH")?);
        let output_dir = PathBuf::from(
            env::var("CURATOR_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
        );
        let state_path = optional_path("CURATOR_STATE_PATH");
        let targets_path = optional_path("CURATOR_TARGETS_PATH");
        let vocabulary_path = optional_path("CURATOR_VOCABULARY_PATH");

        // Duplicate detector settings
        let duplicate_threshold =
            parse_unit_interval("CURATOR_DUPLICATE_THRESHOLD", DEFAULT_DUPLICATE_THRESHOLD)?;
        let title_prefilter = parse_f64("CURATOR_TITLE_PREFILTER", DEFAULT_TITLE_PREFILTER)?;
        if !(0.0..=100.0).contains(&title_prefilter) {
            return Err(ConfigError::Invalid {
                name: "CURATOR_TITLE_PREFILTER",
                source: anyhow::anyhow!("value must be between 0 and 100"),
            });
        }
        let report_floor = parse_unit_interval("CURATOR_REPORT_FLOOR", DEFAULT_REPORT_FLOOR)?;

        let defaults = SimilarityWeights::default();
        let weights = SimilarityWeights {
            title: parse_weight("CURATOR_WEIGHT_TITLE", defaults.title)?,
            ingredients: parse_weight("CURATOR_WEIGHT_INGREDIENTS", defaults.ingredients)?,
            nutrition: parse_weight("CURATOR_WEIGHT_NUTRITION", defaults.nutrition)?,
            method: parse_weight("CURATOR_WEIGHT_METHOD", defaults.method)?,
        };
        if weights.total() <= 0.0 {
            return Err(ConfigError::Invalid {
                name: "CURATOR_WEIGHT_*",
                source: anyhow::anyhow!("weights must not all be zero"),
            });
        }

        // Worker pool settings
        let worker_threads = parse_non_zero_usize("CURATOR_WORKER_THREADS", num_cpus::get())?;
        let priority_limit = parse_usize("CURATOR_PRIORITY_LIMIT", DEFAULT_PRIORITY_LIMIT)?;

        Ok(Self {
            input_path,
            output_dir,
            state_path,
            targets_path,
            vocabulary_path,
            duplicate_threshold,
            title_prefilter,
            weights,
            report_floor,
            worker_threads,
            priority_limit,
        })
    }

    #[must_use]
    pub fn input_path(&self) -> &PathBuf {
        &self.input_path
    }

    #[must_use]
    pub fn output_dir(&self) -> &PathBuf {
        &self.output_dir
    }

    #[must_use]
    pub fn state_path(&self) -> Option<&PathBuf> {
        self.state_path.as_ref()
    }

    #[must_use]
    pub fn targets_path(&self) -> Option<&PathBuf> {
        self.targets_path.as_ref()
    }

    #[must_use]
    pub fn vocabulary_path(&self) -> Option<&PathBuf> {
        self.vocabulary_path.as_ref()
    }

    #[must_use]
    pub fn duplicate_threshold(&self) -> f64 {
        self.duplicate_threshold
    }

    #[must_use]
    pub fn title_prefilter(&self) -> f64 {
        self.title_prefilter
    }

    #[must_use]
    pub fn weights(&self) -> SimilarityWeights {
        self.weights
    }

    #[must_use]
    pub fn report_floor(&self) -> f64 {
        self.report_floor
    }

    #[must_use]
    pub fn worker_threads(&self) -> NonZeroUsize {
        self.worker_threads
    }

    #[must_use]
    pub fn priority_limit(&self) -> usize {
        self.priority_limit
    }

    /// 重複検出器に渡す設定値を組み立てる。
    #[must_use]
    pub fn detector_settings(&self) -> DetectorSettings {
        DetectorSettings {
            weights: self.weights,
            threshold: self.duplicate_threshold,
            title_prefilter: self.title_prefilter,
            report_floor: self.report_floor,
        }
    }
}

fn env_var(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn optional_path(name: &'static str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

fn parse_non_zero_usize(name: &'static str, default: usize) -> Result<NonZeroUsize, ConfigError> {
    let parsed = parse_usize(name, default)?;
    NonZeroUsize::new(parsed).ok_or_else(|| ConfigError::Invalid {
        name,
        source: anyhow::anyhow!("must be greater than zero"),
    })
}

fn parse_usize(name: &'static str, default: usize) -> Result<usize, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim().parse::<usize>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })
}

fn parse_f64(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let raw = env::var(name).unwrap_or_else(|_| default.to_string());
    let value = raw.trim().parse::<f64>().map_err(|error| ConfigError::Invalid {
        name,
        source: anyhow::Error::new(error),
    })?;
    if !value.is_finite() {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be finite"),
        });
    }
    Ok(value)
}

fn parse_unit_interval(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = parse_f64(name, default)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("value must be between 0 and 1"),
        });
    }
    Ok(value)
}

fn parse_weight(name: &'static str, default: f64) -> Result<f64, ConfigError> {
    let value = parse_f64(name, default)?;
    if value < 0.0 {
        return Err(ConfigError::Invalid {
            name,
            source: anyhow::anyhow!("weight must not be negative"),
        });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEYS: [&str; 14] = [
        "CURATOR_INPUT_PATH",
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
        "CURATOR_PRIORITY_LIMIT",
    ];

    fn set_env(name: &str, value: &str) {
        // SAFETY: tests hold ENV_MUTEX and assign valid UTF-8 values.
        unsafe {
            env::set_var(name, value);
        }
    }

    fn reset_env() {
        for key in KEYS {
            // SAFETY: tests hold ENV_MUTEX and clean up deterministic keys.
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn from_env_uses_defaults_when_optional_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CURATOR_INPUT_PATH", "candidates.jsonl");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.input_path(), &PathBuf::from("candidates.jsonl"));
        assert_eq!(config.output_dir(), &PathBuf::from("curation_output"));
        assert_eq!(config.state_path(), None);
        assert_eq!(config.duplicate_threshold(), 0.75);
        assert_eq!(config.title_prefilter(), 70.0);
        assert_eq!(config.weights(), SimilarityWeights::default());
        assert_eq!(config.report_floor(), 0.5);
        assert_eq!(config.priority_limit(), 5);
        assert_eq!(config.detector_settings(), DetectorSettings::default());
    }

    #[test]
    fn from_env_overrides_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CURATOR_INPUT_PATH", "in.jsonl");
        set_env("CURATOR_OUTPUT_DIR", "/tmp/out");
        set_env("CURATOR_STATE_PATH", "/tmp/state.json");
        set_env("CURATOR_DUPLICATE_THRESHOLD", "0.8");
        set_env("CURATOR_WEIGHT_METHOD", "0.0");
        set_env("CURATOR_WORKER_THREADS", "3");

        let config = Config::from_env().expect("config should load");

        assert_eq!(config.output_dir(), &PathBuf::from("/tmp/out"));
        assert_eq!(config.state_path(), Some(&PathBuf::from("/tmp/state.json")));
        assert_eq!(config.duplicate_threshold(), 0.8);
        assert_eq!(config.weights().method, 0.0);
        assert_eq!(config.worker_threads().get(), 3);
        assert_eq!(config.detector_settings().threshold, 0.8);
    }

    #[test]
    fn from_env_errors_when_input_missing() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();

        let error = Config::from_env().expect_err("missing input should fail");

        assert!(matches!(error, ConfigError::Missing("CURATOR_INPUT_PATH")));
    }

    #[test]
    fn from_env_rejects_out_of_range_values() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CURATOR_INPUT_PATH", "in.jsonl");

        for (key, value) in [
            ("CURATOR_DUPLICATE_THRESHOLD", "1.5"),
            ("CURATOR_TITLE_PREFILTER", "120"),
            ("CURATOR_WEIGHT_TITLE", "-0.1"),
            ("CURATOR_WORKER_THREADS", "0"),
            ("CURATOR_REPORT_FLOOR", "abc"),
        ] {
            set_env(key, value);
            let error = Config::from_env().expect_err("invalid value should fail");
            assert!(
                matches!(error, ConfigError::Invalid { name, .. } if name == key),
                "{key}={value}"
            );
            // SAFETY: tests hold ENV_MUTEX.
            unsafe {
                env::remove_var(key);
            }
        }
    }

    #[test]
    fn from_env_rejects_all_zero_weights() {
        let _lock = ENV_MUTEX.lock().expect("env mutex");
        reset_env();
        set_env("CURATOR_INPUT_PATH", "in.jsonl");
        for key in [
            "CURATOR_WEIGHT_TITLE",
            "CURATOR_WEIGHT_INGREDIENTS",
            "CURATOR_WEIGHT_NUTRITION",
            "CURATOR_WEIGHT_METHOD",
        ] {
            set_env(key, "0");
        }

        let error = Config::from_env().expect_err("zero weights should fail");

        assert!(matches!(
            error,
            ConfigError::Invalid {
                name: "CURATOR_WEIGHT_*",
                ..
            }
        ));
        reset_env();
    }
}
