use std::fmt;

use serde::{Deserialize, Serialize};

/// Ledger meal slot. Distinct from the validator's [`GuidelineCategory`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MealType {
    Breakfast,
    Lunch,
    Dinner,
    Snacks,
}

impl MealType {
    pub const ALL: [Self; 4] = [Self::Breakfast, Self::Lunch, Self::Dinner, Self::Snacks];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::Lunch => "lunch",
            Self::Dinner => "dinner",
            Self::Snacks => "snacks",
        }
    }
}

/// Cuisines in declaration order; earlier cuisines win score ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cuisine {
    Mediterranean,
    Asian,
    Latin,
    Indian,
    Italian,
    American,
    MiddleEastern,
}

impl Cuisine {
    pub const ALL: [Self; 7] = [
        Self::Mediterranean,
        Self::Asian,
        Self::Latin,
        Self::Indian,
        Self::Italian,
        Self::American,
        Self::MiddleEastern,
    ];

    /// Ledger key used for recipes without a detected cuisine.
    pub const OTHER: &'static str = "other";

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mediterranean => "mediterranean",
            Self::Asian => "asian",
            Self::Latin => "latin",
            Self::Indian => "indian",
            Self::Italian => "italian",
            Self::American => "american",
            Self::MiddleEastern => "middle_eastern",
        }
    }

    #[must_use]
    pub fn ledger_key(cuisine: Option<Self>) -> &'static str {
        cuisine.map_or(Self::OTHER, Self::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    YearRound,
}

impl Season {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Spring => "spring",
            Self::Summer => "summer",
            Self::Fall => "fall",
            Self::Winter => "winter",
            Self::YearRound => "year-round",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trimester {
    First,
    Second,
    Third,
}

impl Trimester {
    pub const ALL: [Self; 3] = [Self::First, Self::Second, Self::Third];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TimeCategory {
    #[serde(rename = "15-min-meals")]
    FifteenMinute,
    #[serde(rename = "30-min-meals")]
    ThirtyMinute,
    #[serde(rename = "quick-meals")]
    Quick,
    #[serde(rename = "slow-cooking")]
    SlowCooking,
}

impl TimeCategory {
    /// Buckets a total time in minutes; 46..=119 has no category.
    #[must_use]
    pub fn from_minutes(total: u32) -> Option<Self> {
        match total {
            0..=15 => Some(Self::FifteenMinute),
            16..=30 => Some(Self::ThirtyMinute),
            31..=45 => Some(Self::Quick),
            120.. => Some(Self::SlowCooking),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FifteenMinute => "15-min-meals",
            Self::ThirtyMinute => "30-min-meals",
            Self::Quick => "quick-meals",
            Self::SlowCooking => "slow-cooking",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlycemicIndex {
    Low,
    Medium,
    High,
    #[default]
    Unknown,
}

impl fmt::Display for GlycemicIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Allergen {
    Dairy,
    Eggs,
    Nuts,
    Peanuts,
    Soy,
    Wheat,
    Shellfish,
    Fish,
}

/// Shopping-list sections; classification tries them in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShoppingCategory {
    Proteins,
    Produce,
    Grains,
    Dairy,
    Pantry,
    Other,
}

/// Nutrition guideline row applied by the validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuidelineCategory {
    Breakfast,
    Meals,
    Snacks,
}
