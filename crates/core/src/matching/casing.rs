//! Per-token comparison policies

use crate::error::{Error, Result};
use crate::matching::fuzzy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How a dictionary token is compared to a document token
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchCasing {
    /// Byte-for-byte equality
    #[default]
    Exact,

    /// First character compared case-insensitively, remainder exact
    IgnoreFirstCharacter,

    /// Full case-insensitive equality
    IgnoreAll,

    /// Similarity above [`FuzzyThresholds`]
    Fuzzy,
}

/// Thresholds for [`MatchCasing::Fuzzy`], on a 0-100 scale
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuzzyThresholds {
    /// Minimum [`fuzzy::partial_ratio`] on the raw tokens
    pub partial: u8,

    /// Minimum [`fuzzy::ratio`] on the lower-cased tokens
    pub full_lowercase: u8,
}

impl Default for FuzzyThresholds {
    fn default() -> Self {
        Self {
            partial: 75,
            full_lowercase: 95,
        }
    }
}

/// Token comparison function
pub type TokenComparator = fn(&str, &str, &FuzzyThresholds) -> bool;

/// Comparison strategy per policy
const STRATEGIES: [(MatchCasing, TokenComparator); 4] = [
    (MatchCasing::Exact, exact),
    (MatchCasing::IgnoreFirstCharacter, ignore_first_character),
    (MatchCasing::IgnoreAll, ignore_all),
    (MatchCasing::Fuzzy, fuzzy_match),
];

fn exact(a: &str, b: &str, _: &FuzzyThresholds) -> bool {
    a == b
}

fn ignore_first_character(a: &str, b: &str, _: &FuzzyThresholds) -> bool {
    let mut a_chars = a.chars();
    let mut b_chars = b.chars();
    match (a_chars.next(), b_chars.next()) {
        (None, None) => true,
        (Some(x), Some(y)) => {
            x.to_lowercase().eq(y.to_lowercase()) && a_chars.as_str() == b_chars.as_str()
        }
        _ => false,
    }
}

fn ignore_all(a: &str, b: &str, _: &FuzzyThresholds) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

fn fuzzy_match(a: &str, b: &str, thresholds: &FuzzyThresholds) -> bool {
    if fuzzy::partial_ratio(a, b) >= thresholds.partial {
        return true;
    }
    fuzzy::ratio(&a.to_lowercase(), &b.to_lowercase()) >= thresholds.full_lowercase
}

impl MatchCasing {
    /// All policies
    pub const ALL: [MatchCasing; 4] = [
        Self::Exact,
        Self::IgnoreFirstCharacter,
        Self::IgnoreAll,
        Self::Fuzzy,
    ];

    /// Comparison function of this policy
    pub fn comparator(self) -> TokenComparator {
        STRATEGIES
            .iter()
            .find(|(casing, _)| *casing == self)
            .map(|(_, comparator)| *comparator)
            .unwrap_or(exact)
    }

    /// Compare two tokens under this policy
    pub fn tokens_equal(self, a: &str, b: &str, thresholds: &FuzzyThresholds) -> bool {
        (self.comparator())(a, b, thresholds)
    }

    /// Whether `entry_tokens` matches `tokens` position by position
    pub fn sequence_matches<S: AsRef<str>>(
        self,
        entry_tokens: &[String],
        tokens: &[S],
        thresholds: &FuzzyThresholds,
    ) -> bool {
        if entry_tokens.len() != tokens.len() {
            return false;
        }
        let compare = self.comparator();
        entry_tokens
            .iter()
            .zip(tokens)
            .all(|(a, b)| compare(a, b.as_ref(), thresholds))
    }

    /// Configuration name of this policy
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::IgnoreFirstCharacter => "ignore_first_character",
            Self::IgnoreAll => "ignore_all",
            Self::Fuzzy => "fuzzy",
        }
    }
}

impl fmt::Display for MatchCasing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchCasing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|casing| casing.as_str() == s)
            .ok_or_else(|| {
                Error::Configuration(format!(
                    "unknown match casing '{s}', expected one of exact, ignore_first_character, ignore_all, fuzzy"
                ))
            })
    }
}
