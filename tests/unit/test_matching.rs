//! Integration tests for dictionary lookup and token matching

#[path = "../common/mod.rs"]
mod common;

use common::{city_dictionary, entry, profile, tokens};
use distner_core::{
    CandidateSpan, EntityDictionary, Error, FuzzyThresholds, MatchCasing, Matcher, RuleProfile,
};
use proptest::prelude::*;

fn names(dictionary: &EntityDictionary, spans: &[CandidateSpan]) -> Vec<(usize, usize, String)> {
    spans
        .iter()
        .map(|span| {
            let entry = dictionary.entry(span.entry);
            (span.start, span.end, entry.name.clone())
        })
        .collect()
}

fn with_casing(casing: MatchCasing) -> EntityDictionary {
    EntityDictionary::build(
        vec![entry("New York", "Q60", 0), entry("York", "Q42462", 0)],
        vec![RuleProfile {
            match_casing: casing,
            ..profile(0, "en-LOC-P31-1", "LOC", 0)
        }],
    )
    .unwrap()
}

#[test]
fn test_overlapping_candidates_are_all_reported() {
    let dict = city_dictionary();
    let found = Matcher::new(&dict).find_matches(&tokens("I visited New York City"));
    assert_eq!(found.len(), 3);

    let found = names(&dict, &found);
    assert_eq!(found[0], (2, 4, "New York".to_string()));
    assert!(found[1..].iter().all(|(s, e, name)| (*s, *e, name.as_str()) == (3, 4, "York")));
}

#[test]
fn test_names_longer_than_remaining_tokens_are_skipped() {
    let dict = city_dictionary();
    let found = Matcher::new(&dict).find_matches(&tokens("flights to New"));
    assert!(found.is_empty());
}

#[test]
fn test_casing_policies() {
    let doc = tokens("new york and York");

    let exact = with_casing(MatchCasing::Exact);
    assert_eq!(Matcher::new(&exact).find_matches(&doc).len(), 1);

    let first = with_casing(MatchCasing::IgnoreFirstCharacter);
    let found = names(&first, &Matcher::new(&first).find_matches(&doc));
    assert_eq!(
        found,
        vec![
            (0, 2, "New York".to_string()),
            (1, 2, "York".to_string()),
            (3, 4, "York".to_string()),
        ]
    );

    let all = with_casing(MatchCasing::IgnoreAll);
    assert_eq!(Matcher::new(&all).find_matches(&tokens("NEW YORK")).len(), 2);
}

#[test]
fn test_fuzzy_policy() {
    let dict = with_casing(MatchCasing::Fuzzy);
    let matcher = Matcher::new(&dict);
    assert_eq!(matcher.find_matches(&tokens("Yorck")).len(), 1);
    assert!(matcher.find_matches(&tokens("Yak")).is_empty());

    let strict = FuzzyThresholds {
        partial: 100,
        full_lowercase: 100,
    };
    assert!(matcher
        .with_thresholds(strict)
        .find_matches(&tokens("Yorck"))
        .is_empty());
}

#[test]
fn test_lookup_buckets() {
    let dict = EntityDictionary::build(
        vec![
            entry("1860 München", "Q1", 0),
            entry("apple", "Q2", 0),
            entry("Zoo", "Q3", 0),
            entry("Ærø", "Q4", 0),
        ],
        vec![profile(0, "en-ORG-P31-1", "ORG", 0)],
    )
    .unwrap();

    assert_eq!(dict.candidates("1860").len(), 1);
    assert_eq!(dict.candidates("Apple").len(), 1);
    assert_eq!(dict.candidates("zoo").len(), 1);
    assert_eq!(dict.candidates("Ærø").len(), 1);
    assert!(dict.candidates("").is_empty());
}

#[test]
fn test_empty_dictionary_is_an_error() {
    let result = EntityDictionary::build(Vec::new(), Vec::new());
    assert!(matches!(result, Err(Error::Dictionary(_))));
}

proptest! {
    #[test]
    fn prop_matches_are_exact_occurrences(words in prop::collection::vec(
        prop::sample::select(vec!["I", "visited", "New", "York", "City", "new", "york"]),
        0..30,
    )) {
        let dict = city_dictionary();
        let doc: Vec<String> = words.iter().map(|w| w.to_string()).collect();
        let found = Matcher::new(&dict).find_matches(&doc);

        for span in &found {
            prop_assert!(span.end <= doc.len());
            prop_assert_eq!(&doc[span.start..span.end], dict.entry(span.entry).tokens.as_slice());
        }
        let expected = doc.windows(2).filter(|w| w[0] == "New" && w[1] == "York").count()
            + 2 * doc.iter().filter(|w| *w == "York").count();
        prop_assert_eq!(found.len(), expected);
    }
}
