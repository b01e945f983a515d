//! Dictionary matching over token sequences

use crate::dictionary::index::{EntityDictionary, EntryId};
use crate::matching::casing::FuzzyThresholds;
use distner_utils::progress::{ProgressReporter, ProgressSink};
use serde::{Deserialize, Serialize};

/// Default number of tokens between two progress updates
pub const DEFAULT_PROGRESS_INTERVAL: usize = 100;

/// Occurrence of a dictionary entry in a token sequence, half-open `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateSpan {
    /// First covered token
    pub start: usize,

    /// One past the last covered token
    pub end: usize,

    /// Matched dictionary entry
    pub entry: EntryId,
}

impl CandidateSpan {
    /// Create a new span
    pub fn new(start: usize, end: usize, entry: EntryId) -> Self {
        Self { start, end, entry }
    }

    /// Number of covered tokens
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the span covers no token
    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Whether two spans share at least one token
    pub fn overlaps(&self, other: &CandidateSpan) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Whether the span covers `position`
    pub fn contains(&self, position: usize) -> bool {
        self.start <= position && position < self.end
    }
}

/// Finds every dictionary occurrence in a token sequence
///
/// Each entry is compared under the casing policy of the rule set it came
/// from. Matching never mutates the dictionary and is deterministic.
pub struct Matcher<'d> {
    dictionary: &'d EntityDictionary,
    thresholds: FuzzyThresholds,
    progress_interval: usize,
}

impl<'d> Matcher<'d> {
    /// Create a matcher with default fuzzy thresholds
    pub fn new(dictionary: &'d EntityDictionary) -> Self {
        Self {
            dictionary,
            thresholds: FuzzyThresholds::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    /// Set fuzzy thresholds
    pub fn with_thresholds(mut self, thresholds: FuzzyThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Set the number of tokens between two progress updates
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Dictionary this matcher reads
    pub fn dictionary(&self) -> &'d EntityDictionary {
        self.dictionary
    }

    /// Find all candidate spans, ordered by start position and then by
    /// dictionary order
    pub fn find_matches(&self, tokens: &[String]) -> Vec<CandidateSpan> {
        let mut progress = ProgressReporter::silent("matching", tokens.len());
        self.scan(tokens, &mut progress)
    }

    /// Like [`Matcher::find_matches`], reporting the share of processed tokens
    /// to `sink`
    pub fn find_matches_with_progress(
        &self,
        tokens: &[String],
        sink: &dyn ProgressSink,
    ) -> Vec<CandidateSpan> {
        let mut progress = ProgressReporter::new("matching", tokens.len(), sink)
            .with_interval(self.progress_interval);
        self.scan(tokens, &mut progress)
    }

    fn scan(&self, tokens: &[String], progress: &mut ProgressReporter<'_>) -> Vec<CandidateSpan> {
        let mut spans = Vec::new();

        for (position, token) in tokens.iter().enumerate() {
            progress.set(position);

            let range = self.dictionary.candidate_range(token);
            for index in range {
                let id = EntryId(index);
                let entry = self.dictionary.entry(id);
                let end = position + entry.token_len();
                if end > tokens.len() {
                    continue;
                }

                let casing = self.dictionary.profile_of(id).match_casing;
                if casing.sequence_matches(&entry.tokens, &tokens[position..end], &self.thresholds)
                {
                    spans.push(CandidateSpan::new(position, end, id));
                }
            }
        }
        progress.finish();

        tracing::debug!(
            tokens = tokens.len(),
            candidates = spans.len(),
            "Matched document against dictionary"
        );
        spans
    }
}
