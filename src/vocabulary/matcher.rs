//! Aho-Corasick keyword sets.
//!
//! Matching is plain substring containment over folded text: a keyword hits
//! wherever it occurs, including inside longer words ("nut" in "peanut").
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use rustc_hash::FxHashSet;
use serde::Deserialize;

use super::VocabularyError;
use crate::util::text::fold;

/// A deduplicated list of folded keywords with a compiled automaton.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<String>")]
pub struct KeywordSet {
    keywords: Vec<String>,
    automaton: AhoCorasick,
}

impl KeywordSet {
    /// Builds a set from raw keywords. Blank entries and repeats are dropped.
    ///
    /// # Errors
    /// Returns [`VocabularyError::Automaton`] if the automaton cannot be built.
    pub fn new<I, S>(keywords: I) -> Result<Self, VocabularyError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = FxHashSet::default();
        let mut list = Vec::new();
        for keyword in keywords {
            let folded = fold(keyword.as_ref().trim());
            if folded.is_empty() || !seen.insert(folded.clone()) {
                continue;
            }
            list.push(folded);
        }

        let automaton = AhoCorasickBuilder::new()
            .match_kind(MatchKind::Standard)
            .build(&list)?;

        Ok(Self {
            keywords: list,
            automaton,
        })
    }

    #[must_use]
    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }

    /// True when any keyword occurs in `text`.
    #[must_use]
    pub fn contains_any(&self, text: &str) -> bool {
        !self.keywords.is_empty() && self.automaton.is_match(text)
    }

    /// Number of distinct keywords that occur in `text`.
    #[must_use]
    pub fn count_in(&self, text: &str) -> usize {
        self.hits(text).into_iter().filter(|hit| *hit).count()
    }

    /// Distinct keywords occurring in `text`, in keyword order.
    #[must_use]
    pub fn matches(&self, text: &str) -> Vec<&str> {
        self.hits(text)
            .into_iter()
            .zip(&self.keywords)
            .filter_map(|(hit, keyword)| hit.then_some(keyword.as_str()))
            .collect()
    }

    /// `(keyword index, first byte offset)` for each keyword found, ordered by offset.
    #[must_use]
    pub fn first_occurrences(&self, text: &str) -> Vec<(usize, usize)> {
        let mut first: Vec<Option<usize>> = vec![None; self.keywords.len()];
        if !self.keywords.is_empty() {
            for found in self.automaton.find_overlapping_iter(text) {
                let slot = &mut first[found.pattern().as_usize()];
                if slot.is_none_or(|start| found.start() < start) {
                    *slot = Some(found.start());
                }
            }
        }
        let mut positions: Vec<(usize, usize)> = first
            .into_iter()
            .enumerate()
            .filter_map(|(idx, start)| start.map(|s| (idx, s)))
            .collect();
        positions.sort_by_key(|(idx, start)| (*start, *idx));
        positions
    }

    fn hits(&self, text: &str) -> Vec<bool> {
        let mut hits = vec![false; self.keywords.len()];
        if !self.keywords.is_empty() {
            for found in self.automaton.find_overlapping_iter(text) {
                hits[found.pattern().as_usize()] = true;
            }
        }
        hits
    }
}

impl TryFrom<Vec<String>> for KeywordSet {
    type Error = VocabularyError;

    fn try_from(keywords: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(keywords)
    }
}
