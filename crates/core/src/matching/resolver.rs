//! Greedy resolution of overlapping candidate spans

use crate::dictionary::index::EntityDictionary;
use crate::matching::matcher::CandidateSpan;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Rule for choosing the surviving span of a conflict group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionCriterion {
    /// More covered tokens wins
    LongestSpan,

    /// Higher rule set priority wins
    HighestPriority,

    /// Lexicographically smaller rule set identifier wins
    EarliestRuleSet,
}

impl SelectionCriterion {
    /// `Greater` when `a` is preferred over `b`
    fn compare(self, a: &CandidateSpan, b: &CandidateSpan, dictionary: &EntityDictionary) -> Ordering {
        match self {
            Self::LongestSpan => a.len().cmp(&b.len()),
            Self::HighestPriority => dictionary
                .profile_of(a.entry)
                .priority
                .cmp(&dictionary.profile_of(b.entry).priority),
            Self::EarliestRuleSet => dictionary
                .profile_of(b.entry)
                .identifier
                .cmp(&dictionary.profile_of(a.entry).identifier),
        }
    }
}

/// Reduces overlapping candidates to a non-overlapping selection.
///
/// Candidates are sorted by start and swept left to right. A span conflicts
/// with every following span that starts before the running conflict end
/// (the largest end seen in the group so far), so chains of overlaps form a
/// single group. Exactly one span of a group survives: the best under the
/// criteria applied in order, with ties going to the earliest span in sorted
/// order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictResolver {
    criteria: Vec<SelectionCriterion>,
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self {
            criteria: vec![
                SelectionCriterion::LongestSpan,
                SelectionCriterion::HighestPriority,
                SelectionCriterion::EarliestRuleSet,
            ],
        }
    }
}

impl ConflictResolver {
    /// Create a resolver with the default criteria
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection criteria
    pub fn with_criteria(mut self, criteria: Vec<SelectionCriterion>) -> Self {
        self.criteria = criteria;
        self
    }

    /// Selection criteria in application order
    pub fn criteria(&self) -> &[SelectionCriterion] {
        &self.criteria
    }

    /// Resolve conflicts. The result is sorted by start, pairwise
    /// non-overlapping and a subset of `candidates`.
    pub fn resolve(
        &self,
        mut candidates: Vec<CandidateSpan>,
        dictionary: &EntityDictionary,
    ) -> Vec<CandidateSpan> {
        let total = candidates.len();
        candidates.sort_by_key(|span| span.start);

        let mut groups = 0usize;
        let mut i = 0;
        while i < candidates.len() {
            let mut conflict_end = candidates[i].end;
            let mut j = i + 1;
            while j < candidates.len() && candidates[j].start < conflict_end {
                conflict_end = conflict_end.max(candidates[j].end);
                j += 1;
            }

            if j > i + 1 {
                groups += 1;
                let survivor = self.select(&candidates[i..j], dictionary);
                candidates.splice(i..j, std::iter::once(survivor));
            }
            i += 1;
        }

        tracing::debug!(
            candidates = total,
            conflict_groups = groups,
            resolved = candidates.len(),
            "Resolved overlapping matches"
        );
        candidates
    }

    fn select(&self, group: &[CandidateSpan], dictionary: &EntityDictionary) -> CandidateSpan {
        let mut best = group[0];
        for candidate in &group[1..] {
            if self.preference(candidate, &best, dictionary) == Ordering::Greater {
                best = *candidate;
            }
        }
        best
    }

    fn preference(
        &self,
        a: &CandidateSpan,
        b: &CandidateSpan,
        dictionary: &EntityDictionary,
    ) -> Ordering {
        self.criteria
            .iter()
            .map(|criterion| criterion.compare(a, b, dictionary))
            .find(|ordering| ordering.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}
