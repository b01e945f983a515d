//! Span-level precision, recall and F1 (conlleval style)

use crate::error::{Error, Result};
use crate::labeling::encoder::{LabeledSpan, OUTSIDE_LABEL};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

/// Counts and scores for one label, or for all labels together
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    /// Chunks in the gold sequence
    pub gold: usize,

    /// Chunks in the predicted sequence
    pub predicted: usize,

    /// Predicted chunks with matching start, end and type
    pub correct: usize,

    /// `correct / predicted`, 0 without predictions
    pub precision: f64,

    /// `correct / gold`, 0 without gold chunks
    pub recall: f64,

    /// Harmonic mean of precision and recall
    pub f1: f64,
}

impl LabelMetrics {
    fn from_counts(gold: usize, predicted: usize, correct: usize) -> Self {
        let precision = ratio(correct, predicted);
        let recall = ratio(correct, gold);
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };
        Self {
            gold,
            predicted,
            correct,
            precision,
            recall,
            f1,
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

/// Result of comparing a predicted tag sequence with a gold sequence
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    /// Micro-averaged scores over all labels
    pub overall: LabelMetrics,

    /// Scores per label, sorted by label
    pub per_label: BTreeMap<String, LabelMetrics>,

    /// Share of tokens whose tag matches exactly
    pub token_accuracy: f64,
}

/// Extract entity chunks from a BIO-2 or IO tag sequence.
///
/// A chunk starts at a `B-` tag, or at an inside tag whose type differs from
/// the running chunk. Untyped tags (IO) behave like `I-` tags.
pub fn extract_spans<S: AsRef<str>>(tags: &[S], outside: &str) -> Vec<LabeledSpan> {
    let mut spans = Vec::new();
    let mut current: Option<(usize, &str)> = None;

    for (i, tag) in tags.iter().enumerate() {
        let tag = tag.as_ref();
        if tag == outside {
            if let Some((start, label)) = current.take() {
                spans.push(LabeledSpan::new(start, i, label));
            }
            continue;
        }

        let (begins, label) = match tag.strip_prefix("B-") {
            Some(label) => (true, label),
            None => (false, tag.strip_prefix("I-").unwrap_or(tag)),
        };

        match current {
            Some((_, running)) if !begins && running == label => {}
            _ => {
                if let Some((start, running)) = current.take() {
                    spans.push(LabeledSpan::new(start, i, running));
                }
                current = Some((i, label));
            }
        }
    }

    if let Some((start, label)) = current {
        spans.push(LabeledSpan::new(start, tags.len(), label));
    }
    spans
}

/// Scores predicted tags against gold tags
#[derive(Clone, Debug)]
pub struct Evaluator {
    outside: String,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(OUTSIDE_LABEL)
    }
}

impl Evaluator {
    /// Create an evaluator for the given outside tag
    pub fn new(outside: impl Into<String>) -> Self {
        Self {
            outside: outside.into(),
        }
    }

    /// Compare two tag sequences of equal length
    pub fn evaluate<G: AsRef<str>, P: AsRef<str>>(
        &self,
        gold: &[G],
        predicted: &[P],
    ) -> Result<EvaluationReport> {
        if gold.len() != predicted.len() {
            return Err(Error::Validation(format!(
                "gold sequence has {} tags, predicted sequence has {}",
                gold.len(),
                predicted.len()
            )));
        }

        let gold_spans = extract_spans(gold, &self.outside);
        let predicted_spans = extract_spans(predicted, &self.outside);
        let gold_set: HashSet<&LabeledSpan> = gold_spans.iter().collect();

        // (gold, predicted, correct) per label
        let mut counts: BTreeMap<String, (usize, usize, usize)> = BTreeMap::new();
        for span in &gold_spans {
            counts.entry(span.label.clone()).or_default().0 += 1;
        }
        for span in &predicted_spans {
            let entry = counts.entry(span.label.clone()).or_default();
            entry.1 += 1;
            if gold_set.contains(span) {
                entry.2 += 1;
            }
        }

        let (total_gold, total_predicted, total_correct) = counts
            .values()
            .fold((0, 0, 0), |acc, c| (acc.0 + c.0, acc.1 + c.1, acc.2 + c.2));

        let matching_tokens = gold
            .iter()
            .zip(predicted)
            .filter(|(g, p)| g.as_ref() == p.as_ref())
            .count();

        let report = EvaluationReport {
            overall: LabelMetrics::from_counts(total_gold, total_predicted, total_correct),
            per_label: counts
                .into_iter()
                .map(|(label, (g, p, c))| (label, LabelMetrics::from_counts(g, p, c)))
                .collect(),
            token_accuracy: ratio(matching_tokens, gold.len()),
        };

        tracing::debug!(
            gold_chunks = total_gold,
            predicted_chunks = total_predicted,
            correct_chunks = total_correct,
            f1 = report.overall.f1,
            "Evaluated predictions"
        );
        Ok(report)
    }
}
