//! Tag sequence creation from resolved spans

use crate::dictionary::index::EntityDictionary;
use crate::error::{Error, Result};
use crate::matching::matcher::CandidateSpan;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default tag of tokens outside any entity
pub const OUTSIDE_LABEL: &str = "O";

/// Token tagging scheme
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelScheme {
    /// `B-<label>` on the first token, `I-<label>` on the following ones
    #[default]
    #[serde(rename = "BIO-2", alias = "BIO2")]
    Bio2,

    /// `<label>` on every token of an entity
    #[serde(rename = "IO")]
    Io,
}

impl LabelScheme {
    /// Canonical scheme name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bio2 => "BIO-2",
            Self::Io => "IO",
        }
    }
}

impl fmt::Display for LabelScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LabelScheme {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "BIO-2" | "BIO2" => Ok(Self::Bio2),
            "IO" => Ok(Self::Io),
            other => Err(Error::Configuration(format!(
                "annotation type '{other}' not supported, expected BIO-2 or IO"
            ))),
        }
    }
}

/// A labeled, half-open token range
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabeledSpan {
    /// First covered token
    pub start: usize,

    /// One past the last covered token
    pub end: usize,

    /// Entity label
    pub label: String,
}

impl LabeledSpan {
    /// Create a new labeled span
    pub fn new(start: usize, end: usize, label: impl Into<String>) -> Self {
        Self {
            start,
            end,
            label: label.into(),
        }
    }

    /// Label a resolved candidate with its rule set's label
    pub fn from_candidate(span: &CandidateSpan, dictionary: &EntityDictionary) -> Self {
        Self::new(span.start, span.end, dictionary.label_of(span.entry))
    }
}

/// Turns resolved spans into one tag per token
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelEncoder {
    scheme: LabelScheme,
    outside: String,
}

impl Default for LabelEncoder {
    fn default() -> Self {
        Self::new(LabelScheme::default())
    }
}

impl LabelEncoder {
    /// Create an encoder with the default outside tag
    pub fn new(scheme: LabelScheme) -> Self {
        Self {
            scheme,
            outside: OUTSIDE_LABEL.to_string(),
        }
    }

    /// Set the outside tag
    pub fn with_outside_label(mut self, outside: impl Into<String>) -> Self {
        self.outside = outside.into();
        self
    }

    /// Scheme in use
    pub fn scheme(&self) -> LabelScheme {
        self.scheme
    }

    /// Outside tag in use
    pub fn outside_label(&self) -> &str {
        &self.outside
    }

    /// Encode `spans` over `token_count` tokens.
    ///
    /// Spans must be sorted, non-overlapping, non-empty and inside the
    /// sequence; anything else is an [`Error::Invariant`]. A span labeled with
    /// the outside tag or with [`OUTSIDE_LABEL`] produces outside tags.
    pub fn encode(&self, token_count: usize, spans: &[LabeledSpan]) -> Result<Vec<String>> {
        let mut tags = vec![self.outside.clone(); token_count];
        let mut covered_until = 0;

        for span in spans {
            if span.start >= span.end {
                return Err(Error::Invariant(format!(
                    "empty span [{}, {})",
                    span.start, span.end
                )));
            }
            if span.end > token_count {
                return Err(Error::Invariant(format!(
                    "span [{}, {}) exceeds {} tokens",
                    span.start, span.end, token_count
                )));
            }
            if span.start < covered_until {
                return Err(Error::Invariant(format!(
                    "span [{}, {}) overlaps or precedes a previous span ending at {}",
                    span.start, span.end, covered_until
                )));
            }
            covered_until = span.end;

            if self.is_outside(&span.label) {
                continue;
            }
            for (offset, tag) in tags[span.start..span.end].iter_mut().enumerate() {
                *tag = self.tag(&span.label, offset == 0);
            }
        }

        Ok(tags)
    }

    /// Encode resolved candidates, labeled through their rule sets
    pub fn encode_candidates(
        &self,
        token_count: usize,
        spans: &[CandidateSpan],
        dictionary: &EntityDictionary,
    ) -> Result<Vec<String>> {
        let labeled: Vec<LabeledSpan> = spans
            .iter()
            .map(|span| LabeledSpan::from_candidate(span, dictionary))
            .collect();
        self.encode(token_count, &labeled)
    }

    /// Whether spans with this label are left untagged.
    ///
    /// Stopword rule sets always carry [`OUTSIDE_LABEL`], whatever the
    /// configured outside tag.
    pub fn is_outside(&self, label: &str) -> bool {
        label == self.outside || label == OUTSIDE_LABEL
    }

    fn tag(&self, label: &str, first: bool) -> String {
        match (self.scheme, first) {
            (LabelScheme::Bio2, true) => format!("B-{label}"),
            (LabelScheme::Bio2, false) => format!("I-{label}"),
            (LabelScheme::Io, _) => label.to_string(),
        }
    }
}
