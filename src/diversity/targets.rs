use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Cuisine, MealType, Season, TimeCategory};

pub const DEFAULT_MEAL_TARGET: u32 = 90;
pub const DEFAULT_CUISINE_TARGET: u32 = 40;

/// Diet tags counted by the ledger, in report order.
pub const TRACKED_DIETS: [&str; 6] = [
    "vegetarian",
    "vegan",
    "gluten-free",
    "dairy-free",
    "keto-friendly",
    "paleo-friendly",
];

const PREP_TIME_ORDER: [TimeCategory; 4] = [
    TimeCategory::FifteenMinute,
    TimeCategory::ThirtyMinute,
    TimeCategory::Quick,
    TimeCategory::SlowCooking,
];

#[derive(Debug, Error)]
pub enum TargetsError {
    #[error("failed to read collection targets from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse collection targets")]
    Deserialize(#[from] serde_yaml::Error),
}

/// Quotas per ledger dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionTargets {
    pub total: u32,
    pub by_meal_type: BTreeMap<MealType, u32>,
    pub by_cuisine: BTreeMap<String, u32>,
    pub by_season: BTreeMap<Season, u32>,
    pub by_prep_time: BTreeMap<String, u32>,
    pub by_special_diet: BTreeMap<String, u32>,
}

impl Default for CollectionTargets {
    fn default() -> Self {
        let by_meal_type = MealType::ALL
            .into_iter()
            .map(|meal| (meal, DEFAULT_MEAL_TARGET))
            .collect();
        let by_cuisine = [
            (Cuisine::Mediterranean.as_str(), 60),
            (Cuisine::Asian.as_str(), 60),
            (Cuisine::Latin.as_str(), 50),
            (Cuisine::Indian.as_str(), 40),
            (Cuisine::Italian.as_str(), 40),
            (Cuisine::American.as_str(), 40),
            (Cuisine::MiddleEastern.as_str(), 30),
            (Cuisine::OTHER, 40),
        ];
        let by_season = [
            (Season::Spring, 90),
            (Season::Summer, 90),
            (Season::Fall, 90),
            (Season::Winter, 90),
            (Season::YearRound, 180),
        ];
        let by_prep_time = PREP_TIME_ORDER.into_iter().zip([60, 120, 120, 60]);
        let by_special_diet = TRACKED_DIETS.into_iter().zip([80, 40, 60, 60, 20, 20]);

        Self {
            total: 360,
            by_meal_type,
            by_cuisine: owned_keys(by_cuisine),
            by_season: by_season.into_iter().collect(),
            by_prep_time: owned_keys(by_prep_time.map(|(category, n)| (category.as_str(), n))),
            by_special_diet: owned_keys(by_special_diet),
        }
    }
}

/// A targets file as written: only the keys it names replace the defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TargetOverrides {
    total: Option<u32>,
    by_meal_type: BTreeMap<MealType, u32>,
    by_cuisine: BTreeMap<String, u32>,
    by_season: BTreeMap<Season, u32>,
    by_prep_time: BTreeMap<String, u32>,
    by_special_diet: BTreeMap<String, u32>,
}

impl CollectionTargets {
    /// Parses a targets document and merges it key by key over the defaults.
    ///
    /// # Errors
    /// Returns [`TargetsError::Deserialize`] when the document is malformed.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, TargetsError> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let overrides: Option<TargetOverrides> = serde_yaml::from_str(yaml)?;
        Ok(Self::default().merged(overrides.unwrap_or_default()))
    }

    fn merged(mut self, overrides: TargetOverrides) -> Self {
        if let Some(total) = overrides.total {
            self.total = total;
        }
        self.by_meal_type.extend(overrides.by_meal_type);
        self.by_cuisine.extend(overrides.by_cuisine);
        self.by_season.extend(overrides.by_season);
        self.by_prep_time.extend(overrides.by_prep_time);
        self.by_special_diet.extend(overrides.by_special_diet);
        self
    }

    /// # Errors
    /// Returns [`TargetsError`] when the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, TargetsError> {
        let yaml = std::fs::read_to_string(path).map_err(|source| TargetsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Loads `path` when given, otherwise the built-in quotas.
    ///
    /// # Errors
    /// Propagates [`CollectionTargets::load`] failures.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, TargetsError> {
        match path {
            Some(path) => {
                let targets = Self::load(path)?;
                tracing::info!(path = %path.display(), total = targets.total, "loaded collection targets");
                Ok(targets)
            }
            None => Ok(Self::default()),
        }
    }

    #[must_use]
    pub fn meal_target(&self, meal: MealType) -> u32 {
        self.by_meal_type
            .get(&meal)
            .copied()
            .unwrap_or(DEFAULT_MEAL_TARGET)
    }

    #[must_use]
    pub fn cuisine_target(&self, cuisine: &str) -> u32 {
        self.by_cuisine
            .get(cuisine)
            .copied()
            .unwrap_or(DEFAULT_CUISINE_TARGET)
    }

    /// Configured cuisines: known cuisines in declaration order, `other`, then extras.
    #[must_use]
    pub fn cuisine_keys(&self) -> Vec<&str> {
        let preferred: Vec<&str> = Cuisine::ALL
            .iter()
            .map(|cuisine| cuisine.as_str())
            .chain([Cuisine::OTHER])
            .collect();
        ordered_keys(&self.by_cuisine, &preferred)
    }
}

fn owned_keys<'a, I>(entries: I) -> BTreeMap<String, u32>
where
    I: IntoIterator<Item = (&'a str, u32)>,
{
    entries
        .into_iter()
        .map(|(key, target)| (key.to_string(), target))
        .collect()
}

fn ordered_keys<'a>(map: &'a BTreeMap<String, u32>, preferred: &[&str]) -> Vec<&'a str> {
    let mut keys: Vec<&str> = preferred
        .iter()
        .filter_map(|key| map.get_key_value(*key).map(|(owned, _)| owned.as_str()))
        .collect();
    keys.extend(
        map.keys()
            .map(String::as_str)
            .filter(|key| !preferred.contains(key)),
    );
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_targets_file_matches_defaults() {
        let parsed = CollectionTargets::from_yaml_str(include_str!("../../config/targets.yaml"))
            .expect("bundled targets parse");
        assert_eq!(parsed, CollectionTargets::default());
    }

    #[test]
    fn partial_file_keeps_unlisted_defaults() {
        let parsed = CollectionTargets::from_yaml_str("by_cuisine:\n  mediterranean: 2\n")
            .expect("partial targets parse");
        let defaults = CollectionTargets::default();
        assert_eq!(parsed.cuisine_target("mediterranean"), 2);
        assert_eq!(parsed.cuisine_target("asian"), 60);
        assert_eq!(parsed.cuisine_target("middle_eastern"), 30);
        assert_eq!(parsed.meal_target(MealType::Lunch), DEFAULT_MEAL_TARGET);
        assert_eq!(parsed.by_season, defaults.by_season);
        assert_eq!(parsed.by_special_diet, defaults.by_special_diet);
        assert_eq!(parsed.total, 360);
    }

    #[test]
    fn listed_keys_override_and_new_keys_extend() {
        let parsed = CollectionTargets::from_yaml_str(
            "total: 100\nby_meal_type:\n  snacks: 10\nby_cuisine:\n  nordic: 5\n",
        )
        .expect("targets parse");
        assert_eq!(parsed.total, 100);
        assert_eq!(parsed.meal_target(MealType::Snacks), 10);
        assert_eq!(parsed.meal_target(MealType::Dinner), DEFAULT_MEAL_TARGET);
        assert_eq!(parsed.cuisine_target("nordic"), 5);
        assert_eq!(parsed.cuisine_target("latin"), 50);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let parsed = CollectionTargets::from_yaml_str("").expect("empty targets parse");
        assert_eq!(parsed, CollectionTargets::default());
    }

    #[test]
    fn cuisine_keys_follow_declaration_order() {
        let mut targets = CollectionTargets::default();
        targets.by_cuisine.insert("nordic".to_string(), 10);
        assert_eq!(
            targets.cuisine_keys(),
            vec![
                "mediterranean",
                "asian",
                "latin",
                "indian",
                "italian",
                "american",
                "middle_eastern",
                "other",
                "nordic"
            ]
        );
    }

    #[test]
    fn unreadable_file_reports_its_path() {
        let error = CollectionTargets::load(Path::new("/nonexistent/targets.yaml"))
            .expect_err("missing file");
        assert!(error.to_string().contains("/nonexistent/targets.yaml"));
    }
}
