//! Pluggable similarity strategies.
//!
//! The detector only depends on these traits; [`Levenshtein`] and [`Cosine`]
//! are the stock implementations.
use std::fmt::Debug;

use ndarray::Array1;

/// Normalized string similarity in `[0, 1]`. Inputs are already case-folded.
pub trait StringSimilarity: Debug + Send + Sync {
    /// Whole-string similarity.
    fn ratio(&self, left: &str, right: &str) -> f64;

    /// Similarity after sorting whitespace-separated tokens, so word order
    /// does not matter.
    fn token_sort_ratio(&self, left: &str, right: &str) -> f64 {
        self.ratio(&sorted_tokens(left), &sorted_tokens(right))
    }

    /// Best similarity of the shorter string against every equally long
    /// window of the longer one.
    fn partial_ratio(&self, left: &str, right: &str) -> f64 {
        let (short, long) = if left.chars().count() <= right.chars().count() {
            (left, right)
        } else {
            (right, left)
        };
        let short_len = short.chars().count();
        if short_len == 0 {
            return if long.is_empty() { 1.0 } else { 0.0 };
        }

        let long_chars: Vec<char> = long.chars().collect();
        let mut best: f64 = 0.0;
        for window in long_chars.windows(short_len) {
            let candidate: String = window.iter().collect();
            best = best.max(self.ratio(short, &candidate));
            if best >= 1.0 {
                break;
            }
        }
        best
    }
}

/// Similarity of two numeric profiles in `[0, 1]`.
pub trait VectorSimilarity: Debug + Send + Sync {
    fn similarity(&self, left: &[f64], right: &[f64]) -> f64;
}

/// `1 - distance / max(len)` over Unicode scalar values.
#[derive(Debug, Clone, Copy, Default)]
pub struct Levenshtein;

impl StringSimilarity for Levenshtein {
    fn ratio(&self, left: &str, right: &str) -> f64 {
        strsim::normalized_levenshtein(left, right)
    }
}

/// Cosine similarity that ignores dimensions where both sides are zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cosine;

impl VectorSimilarity for Cosine {
    fn similarity(&self, left: &[f64], right: &[f64]) -> f64 {
        let (lhs, rhs): (Vec<f64>, Vec<f64>) = left
            .iter()
            .zip(right)
            .filter(|(l, r)| **l != 0.0 || **r != 0.0)
            .map(|(l, r)| (*l, *r))
            .unzip();
        if lhs.is_empty() {
            return 0.0;
        }

        let lhs = Array1::from(lhs);
        let rhs = Array1::from(rhs);
        let norms = lhs.dot(&lhs).sqrt() * rhs.dot(&rhs).sqrt();
        if norms == 0.0 {
            return 0.0;
        }
        (lhs.dot(&rhs) / norms).clamp(0.0, 1.0)
    }
}

fn sorted_tokens(text: &str) -> String {
    let mut tokens: Vec<&str> = text.split_whitespace().collect();
    tokens.sort_unstable();
    tokens.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_sort_ignores_word_order() {
        let strategy = Levenshtein;
        assert!((strategy.token_sort_ratio("quinoa bowl", "bowl quinoa") - 1.0).abs() < 1e-12);
        assert!(strategy.ratio("quinoa bowl", "bowl quinoa") < 1.0);
    }

    #[test]
    fn partial_ratio_finds_substrings() {
        let strategy = Levenshtein;
        assert!((strategy.partial_ratio("chili", "turkey chili bowl") - 1.0).abs() < 1e-12);
        assert!((strategy.partial_ratio("", "") - 1.0).abs() < 1e-12);
        assert!(strategy.partial_ratio("", "abc").abs() < 1e-12);
    }

    #[test]
    fn string_strategies_are_symmetric() {
        let strategy = Levenshtein;
        let pairs = [
            ("quinoa vegetable bowl", "veggie quinoa bowl"),
            ("lentil soup", "red lentil and kale soup"),
            ("", "tacos"),
        ];
        for (a, b) in pairs {
            assert!((strategy.ratio(a, b) - strategy.ratio(b, a)).abs() < 1e-12);
            assert!((strategy.token_sort_ratio(a, b) - strategy.token_sort_ratio(b, a)).abs() < 1e-12);
            assert!((strategy.partial_ratio(a, b) - strategy.partial_ratio(b, a)).abs() < 1e-12);
        }
    }

    #[test]
    fn cosine_skips_shared_zero_dimensions() {
        let cosine = Cosine;
        let score = cosine.similarity(&[320.0, 45.0, 12.0, 0.0], &[310.0, 43.0, 11.0, 0.0]);
        assert!(score > 0.999);
        assert!((cosine.similarity(&[0.0, 0.0], &[0.0, 0.0])).abs() < f64::EPSILON);
    }

    #[test]
    fn cosine_with_one_zero_side_is_zero() {
        let cosine = Cosine;
        assert!(cosine.similarity(&[0.0, 0.0], &[1.0, 2.0]).abs() < f64::EPSILON);
    }
}
