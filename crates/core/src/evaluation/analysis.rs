//! Most common token-level labeling errors

use crate::error::{Error, Result};
use crate::labeling::converter::LabelConverter;
use crate::labeling::encoder::OUTSIDE_LABEL;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// An aggregated labeling error
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenError {
    /// Token text
    pub token: String,

    /// Predicted label (IO)
    pub predicted: String,

    /// Gold label (IO)
    pub gold: String,

    /// Number of occurrences
    pub count: usize,
}

impl fmt::Display for TokenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Error({}|Pred:{}|Gold:{}) x{}",
            self.token, self.predicted, self.gold, self.count
        )
    }
}

/// Most common errors of each kind
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorAnalysis {
    /// A label was predicted where gold has the outside label or another label
    pub precision_errors: Vec<TokenError>,

    /// The outside label was predicted where gold has an entity label
    pub recall_errors: Vec<TokenError>,
}

/// Groups token mismatches into precision and recall errors
#[derive(Clone, Debug)]
pub struct ErrorAnalyzer {
    converter: LabelConverter,
}

impl Default for ErrorAnalyzer {
    fn default() -> Self {
        Self::new(OUTSIDE_LABEL)
    }
}

impl ErrorAnalyzer {
    /// Create an analyzer for the given outside tag
    pub fn new(outside: impl Into<String>) -> Self {
        Self {
            converter: LabelConverter::new(outside),
        }
    }

    /// Compare per token after normalizing both sequences to IO. Returns the
    /// `top_n` most frequent errors of each kind, ties in order of first
    /// occurrence.
    pub fn analyze<T, P, G>(
        &self,
        tokens: &[T],
        predicted: &[P],
        gold: &[G],
        top_n: usize,
    ) -> Result<ErrorAnalysis>
    where
        T: AsRef<str>,
        P: AsRef<str>,
        G: AsRef<str>,
    {
        if tokens.len() != predicted.len() || tokens.len() != gold.len() {
            return Err(Error::Validation(format!(
                "{} tokens, {} predicted labels, {} gold labels",
                tokens.len(),
                predicted.len(),
                gold.len()
            )));
        }

        let predicted = self.converter.normalize_to_io(predicted);
        let gold = self.converter.normalize_to_io(gold);
        let outside = self.converter.outside_label();

        let mut precision = ErrorCounter::default();
        let mut recall = ErrorCounter::default();
        for ((token, p), g) in tokens.iter().zip(&predicted).zip(&gold) {
            if p == g {
                continue;
            }
            let counter = if p == outside {
                &mut recall
            } else {
                &mut precision
            };
            counter.add(token.as_ref(), p, g);
        }

        Ok(ErrorAnalysis {
            precision_errors: precision.most_common(top_n),
            recall_errors: recall.most_common(top_n),
        })
    }
}

#[derive(Default)]
struct ErrorCounter {
    errors: Vec<TokenError>,
    positions: HashMap<(String, String, String), usize>,
}

impl ErrorCounter {
    fn add(&mut self, token: &str, predicted: &str, gold: &str) {
        let key = (token.to_string(), predicted.to_string(), gold.to_string());
        match self.positions.get(&key) {
            Some(&i) => self.errors[i].count += 1,
            None => {
                self.positions.insert(key, self.errors.len());
                self.errors.push(TokenError {
                    token: token.to_string(),
                    predicted: predicted.to_string(),
                    gold: gold.to_string(),
                    count: 1,
                });
            }
        }
    }

    fn most_common(mut self, n: usize) -> Vec<TokenError> {
        // Stable sort keeps first-occurrence order among equal counts.
        self.errors.sort_by(|a, b| b.count.cmp(&a.count));
        self.errors.truncate(n);
        self.errors
    }
}
