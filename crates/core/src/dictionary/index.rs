//! First-character index over prepared entity names

use crate::dictionary::entity::EntityId;
use crate::dictionary::ruleset::{RuleSet, RuleSetKey};
use crate::error::{Error, Result};
use crate::matching::casing::{FuzzyThresholds, MatchCasing};
use distner_utils::text::first_char_lowercase;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Range;

/// Position of an entry inside an [`EntityDictionary`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntryId(pub usize);

/// A tokenized entity name ready for matching
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    /// Entity the name refers to
    pub entity: EntityId,

    /// Display name
    pub name: String,

    /// Tokenized name, never empty
    pub tokens: Vec<String>,

    /// Rule set that produced the entry
    pub rule_set: RuleSetKey,

    /// Whether the name is an alias
    pub is_alias: bool,
}

impl DictionaryEntry {
    /// Number of tokens
    pub fn token_len(&self) -> usize {
        self.tokens.len()
    }

    fn bucket_key(&self) -> char {
        self.tokens
            .first()
            .and_then(|t| first_char_lowercase(t))
            .unwrap_or('\0')
    }
}

/// Snapshot of the rule set configuration a matching run reads
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleProfile {
    /// Session key of the rule set
    pub key: RuleSetKey,

    /// Rule set identifier
    pub identifier: String,

    /// Target label
    pub label: String,

    /// Conflict tie-break weight
    pub priority: i32,

    /// Token comparison policy
    pub match_casing: MatchCasing,
}

impl RuleProfile {
    /// Snapshot a rule set
    pub fn from_rule_set(key: RuleSetKey, rule_set: &RuleSet) -> Self {
        Self {
            key,
            identifier: rule_set.identifier().to_string(),
            label: rule_set.label().to_string(),
            priority: rule_set.config().priority,
            match_casing: rule_set.config().match_casing,
        }
    }
}

const ALPHABET_LEN: usize = 26;

/// Entity names sorted by the lower-cased first character of their first
/// token, with a jump table for constant-time bucket lookup.
///
/// Buckets: one per letter `a`-`z`, one for characters below `a`
/// (punctuation, digits) and one for characters above `z` (non-ASCII letters).
#[derive(Clone, Debug)]
pub struct EntityDictionary {
    entries: Vec<DictionaryEntry>,
    profiles: Vec<RuleProfile>,
    entry_profiles: Vec<usize>,
    letter_starts: [usize; ALPHABET_LEN],
    above_z_start: usize,
}

impl EntityDictionary {
    /// Build the index.
    ///
    /// Fails with [`Error::Dictionary`] when there are no entries and with
    /// [`Error::Invariant`] when an entry has no tokens or refers to a rule set
    /// without profile.
    pub fn build(mut entries: Vec<DictionaryEntry>, profiles: Vec<RuleProfile>) -> Result<Self> {
        if entries.is_empty() {
            return Err(Error::Dictionary(
                "there are no entity names on which to build a search index".to_string(),
            ));
        }

        let profile_positions: HashMap<RuleSetKey, usize> = profiles
            .iter()
            .enumerate()
            .map(|(i, p)| (p.key, i))
            .collect();

        for entry in &entries {
            if entry.tokens.is_empty() || entry.tokens.iter().any(|t| t.is_empty()) {
                return Err(Error::Invariant(format!(
                    "entity name '{}' has an empty tokenized form",
                    entry.name
                )));
            }
            if !profile_positions.contains_key(&entry.rule_set) {
                return Err(Error::Invariant(format!(
                    "entity name '{}' refers to unknown rule set {}",
                    entry.name, entry.rule_set
                )));
            }
        }

        // Stable sort keeps the input order within a bucket.
        entries.sort_by_key(DictionaryEntry::bucket_key);

        let mut letter_starts = [0usize; ALPHABET_LEN];
        for (i, start) in letter_starts.iter_mut().enumerate() {
            let letter = (b'a' + i as u8) as char;
            *start = entries.partition_point(|e| e.bucket_key() < letter);
        }
        let above_z_start = entries.partition_point(|e| e.bucket_key() <= 'z');

        let entry_profiles = entries
            .iter()
            .map(|e| profile_positions[&e.rule_set])
            .collect();

        tracing::info!(
            entries = entries.len(),
            rule_sets = profiles.len(),
            below_a = letter_starts[0],
            above_z = entries.len() - above_z_start,
            "Built entity dictionary"
        );

        Ok(Self {
            entries,
            profiles,
            entry_profiles,
            letter_starts,
            above_z_start,
        })
    }

    /// Collect the entries of all given rule sets and build the index.
    ///
    /// Rule sets must already be prepared (tokenized). Entries are collected in
    /// parallel; the result keeps the rule set order.
    pub fn from_rule_sets(
        rule_sets: &[(RuleSetKey, &RuleSet)],
        thresholds: &FuzzyThresholds,
    ) -> Result<Self> {
        let per_rule_set: Vec<Vec<DictionaryEntry>> = rule_sets
            .par_iter()
            .map(|(key, rule_set)| rule_set.entries_for_matching(*key, thresholds))
            .collect::<Result<_>>()?;

        let profiles = rule_sets
            .iter()
            .map(|(key, rule_set)| RuleProfile::from_rule_set(*key, rule_set))
            .collect();

        Self::build(per_rule_set.into_iter().flatten().collect(), profiles)
    }

    /// Index range of the entries that may match a token starting like `token`
    pub fn candidate_range(&self, token: &str) -> Range<usize> {
        let Some(first) = first_char_lowercase(token) else {
            tracing::warn!("Empty token during matching");
            return 0..0;
        };

        if first < 'a' {
            0..self.letter_starts[0]
        } else if first > 'z' {
            self.above_z_start..self.entries.len()
        } else {
            let idx = first as usize - 'a' as usize;
            let end = if idx + 1 < ALPHABET_LEN {
                self.letter_starts[idx + 1]
            } else {
                self.above_z_start
            };
            self.letter_starts[idx]..end
        }
    }

    /// Entries that may match a token starting like `token`.
    ///
    /// Every entry that could match is returned; many returned entries will not.
    /// An empty token yields no candidates.
    pub fn candidates(&self, token: &str) -> &[DictionaryEntry] {
        &self.entries[self.candidate_range(token)]
    }

    /// Entry by id
    pub fn entry(&self, id: EntryId) -> &DictionaryEntry {
        &self.entries[id.0]
    }

    /// Rule set profile of an entry
    pub fn profile_of(&self, id: EntryId) -> &RuleProfile {
        &self.profiles[self.entry_profiles[id.0]]
    }

    /// Profile by rule set key
    pub fn profile(&self, key: RuleSetKey) -> Option<&RuleProfile> {
        self.profiles.iter().find(|p| p.key == key)
    }

    /// Label of an entry's rule set
    pub fn label_of(&self, id: EntryId) -> &str {
        &self.profile_of(id).label
    }

    /// All entries in index order
    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    /// All rule set profiles
    pub fn profiles(&self) -> &[RuleProfile] {
        &self.profiles
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the dictionary is empty (never true for a built dictionary)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
