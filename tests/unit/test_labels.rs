//! Integration tests for tag encoding, conversion, CoNLL I/O and evaluation

#[path = "../common/mod.rs"]
mod common;

use common::tags;
use distner_core::{
    extract_spans, ConllParser, ConllWriter, ErrorAnalyzer, Evaluator, LabelColumns,
    LabelConverter, LabelEncoder, LabelScheme, LabeledSpan, RawFormat,
};
use proptest::prelude::*;

fn arb_io_tags() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop::sample::select(vec!["O", "PER", "LOC", "ORG"]).prop_map(str::to_string),
        0..40,
    )
}

/// Sorted, disjoint spans over `0..len`
fn arb_spans() -> impl Strategy<Value = (usize, Vec<LabeledSpan>)> {
    prop::collection::vec(
        (0usize..3, 1usize..4, prop::sample::select(vec!["PER", "LOC"])),
        0..10,
    )
    .prop_map(|parts| {
        let mut spans = Vec::new();
        let mut position = 0;
        for (gap, len, label) in parts {
            let start = position + gap;
            spans.push(LabeledSpan::new(start, start + len, label));
            position = start + len;
        }
        (position + 1, spans)
    })
}

#[test]
fn test_conll_to_evaluation() {
    let raw = "-DOCSTART- -X- O\n\
               \n\
               John\tB-PER\tB-PER\n\
               lives\tO\tO\n\
               in\tO\tB-LOC\n\
               New\tB-LOC\tI-LOC\n\
               York\tI-LOC\tI-LOC\n";
    let parsed = ConllParser::new(RawFormat::ConllTab)
        .unwrap()
        .with_columns(LabelColumns::GoldAndPredicted)
        .parse(raw)
        .unwrap();
    let gold = parsed.gold.unwrap();
    let predicted = parsed.predicted.unwrap();
    assert_eq!(parsed.tokens.len(), 5);

    let report = Evaluator::default().evaluate(&gold, &predicted).unwrap();
    assert_eq!(report.overall.correct, 1);
    assert_eq!(report.per_label["PER"].f1, 1.0);
    assert_eq!(report.per_label["LOC"].correct, 0);
    assert!((report.token_accuracy - 0.6).abs() < 1e-9);

    let errors = ErrorAnalyzer::default()
        .analyze(&parsed.tokens, &predicted, &gold, 5)
        .unwrap();
    assert_eq!(errors.precision_errors.len(), 1);
    assert_eq!(errors.precision_errors[0].token, "in");
    assert_eq!(errors.precision_errors[0].predicted, "LOC");
    assert!(errors.recall_errors.is_empty());
}

#[test]
fn test_writer_output_parses_back() {
    let tokens = tags(&["Paris", "is", "nice"]);
    let gold = tags(&["B-LOC", "O", "O"]);
    let predicted = tags(&["O", "O", "O"]);
    let text = ConllWriter::new()
        .with_separator(" ")
        .write(&tokens, Some(gold.as_slice()), Some(predicted.as_slice()))
        .unwrap();
    assert_eq!(text, "Paris B-LOC O\nis O O\nnice O O\n");

    let parsed = ConllParser::new(RawFormat::ConllSpace)
        .unwrap()
        .with_columns(LabelColumns::GoldAndPredicted)
        .parse(&text)
        .unwrap();
    assert_eq!(parsed.tokens, tokens);
    assert_eq!(parsed.gold.unwrap(), gold);
    assert_eq!(parsed.predicted.unwrap(), predicted);
}

#[test]
fn test_scheme_names() {
    assert_eq!("BIO-2".parse::<LabelScheme>().unwrap(), LabelScheme::Bio2);
    assert_eq!("IO".parse::<LabelScheme>().unwrap(), LabelScheme::Io);
    assert!("BIOES".parse::<LabelScheme>().is_err());
    assert_eq!(LabelScheme::default(), LabelScheme::Bio2);
}

proptest! {
    #[test]
    fn prop_io_bio2_io_roundtrip(io in arb_io_tags()) {
        let converter = LabelConverter::default();
        let bio2 = converter.sequence_io_to_bio2(&io);
        prop_assert_eq!(converter.sequence_bio2_to_io(&bio2).unwrap(), io);
    }

    #[test]
    fn prop_bio2_encoding_keeps_spans((len, spans) in arb_spans()) {
        let encoded = LabelEncoder::new(LabelScheme::Bio2).encode(len, &spans).unwrap();
        prop_assert_eq!(encoded.len(), len);
        prop_assert_eq!(extract_spans(&encoded, "O"), spans);
    }

    #[test]
    fn prop_perfect_prediction_scores_one((len, spans) in arb_spans()) {
        let encoded = LabelEncoder::new(LabelScheme::Bio2).encode(len, &spans).unwrap();
        let report = Evaluator::default().evaluate(&encoded, &encoded).unwrap();
        prop_assert_eq!(report.overall.correct, spans.len());
        prop_assert_eq!(report.token_accuracy, 1.0);
        if !spans.is_empty() {
            prop_assert_eq!(report.overall.f1, 1.0);
        }
    }
}
