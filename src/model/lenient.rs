//! Forgiving deserializers for scraped numeric fields.
//!
//! Absence is data: anything that cannot be read as a number becomes zero
//! instead of failing the whole record.
use serde::{Deserialize, Deserializer, de::IgnoredAny};

use super::{DEFAULT_SERVINGS, Ingredient};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberRepr {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl NumberRepr {
    fn value(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(text) => parse_quantity(text),
            Self::Other(_) => None,
        }
        .filter(|value| value.is_finite())
    }
}

pub(super) fn number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let repr = Option::<NumberRepr>::deserialize(deserializer)?;
    Ok(repr.and_then(|r| r.value()).unwrap_or(0.0))
}

pub(super) fn minutes<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number(deserializer)?;
    Ok(to_u32(value).unwrap_or(0))
}

pub(super) fn servings<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = number(deserializer)?;
    Ok(to_u32(value)
        .filter(|servings| *servings > 0)
        .unwrap_or(DEFAULT_SERVINGS))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_u32(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value <= f64::from(u32::MAX) {
        Some(value.round() as u32)
    } else {
        None
    }
}

/// Reads "2", "0.5", "1/2", "1 1/2" and leading numbers such as "15 min".
pub(crate) fn parse_quantity(raw: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut seen = false;
    for part in raw.split_whitespace() {
        let parsed = if let Some((numerator, denominator)) = part.split_once('/') {
            let numerator: f64 = numerator.parse().ok()?;
            let denominator: f64 = denominator.parse().ok()?;
            if denominator == 0.0 {
                return None;
            }
            Some(numerator / denominator)
        } else {
            leading_number(part)
        };
        match parsed {
            Some(value) => {
                total += value;
                seen = true;
            }
            None if seen => break,
            None => return None,
        }
    }
    seen.then_some(total)
}

fn leading_number(token: &str) -> Option<f64> {
    let end = token
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(token.len(), |(idx, _)| idx);
    token[..end].parse().ok()
}

#[derive(Deserialize)]
#[serde(untagged)]
pub(super) enum IngredientRepr {
    Text(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(default, deserialize_with = "number")]
        amount: f64,
        #[serde(default)]
        unit: Option<String>,
    },
}

impl From<IngredientRepr> for Ingredient {
    fn from(repr: IngredientRepr) -> Self {
        match repr {
            IngredientRepr::Text(name) => Ingredient::new(name, 0.0, ""),
            IngredientRepr::Full { name, amount, unit } => {
                Ingredient::new(name, amount, unit.unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::parse_quantity;
    use rstest::rstest;

    #[rstest]
    #[case("2", Some(2.0))]
    #[case("0.5", Some(0.5))]
    #[case("1/2", Some(0.5))]
    #[case("1 1/2", Some(1.5))]
    #[case("15 min", Some(15.0))]
    #[case("a pinch", None)]
    #[case("1/0", None)]
    #[case("", None)]
    fn parses_quantities(#[case] raw: &str, #[case] expected: Option<f64>) {
        match (parse_quantity(raw), expected) {
            (Some(actual), Some(expected)) => assert!((actual - expected).abs() < 1e-9),
            (actual, expected) => assert_eq!(actual, expected),
        }
    }
}
