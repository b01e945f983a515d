//! Integration tests for greedy conflict resolution

#[path = "../common/mod.rs"]
mod common;

use common::{city_dictionary, entry, profile, tokens};
use distner_core::{
    CandidateSpan, ConflictResolver, EntityDictionary, EntryId, LabelEncoder, LabelScheme,
    Matcher, SelectionCriterion,
};
use proptest::prelude::*;

/// Entries of lengths 1 to 3 spread over rule sets of different priority
fn mixed_dictionary() -> EntityDictionary {
    EntityDictionary::build(
        vec![
            entry("a", "Q1", 0),
            entry("b c", "Q2", 0),
            entry("d e f", "Q3", 0),
            entry("g", "Q4", 1),
            entry("h i", "Q5", 1),
            entry("j k l", "Q6", 2),
        ],
        vec![
            profile(0, "en-LOC-P31-1", "LOC", 0),
            profile(1, "en-ORG-P31-1", "ORG", 5),
            profile(2, "en-PER-P31-1", "PER", 1),
        ],
    )
    .unwrap()
}

fn arb_candidates(dictionary_len: usize) -> impl Strategy<Value = Vec<(usize, usize)>> {
    prop::collection::vec((0usize..40, 0..dictionary_len), 0..25)
}

fn spans(dictionary: &EntityDictionary, raw: &[(usize, usize)]) -> Vec<CandidateSpan> {
    raw.iter()
        .map(|&(start, entry)| {
            let id = EntryId(entry);
            CandidateSpan::new(start, start + dictionary.entry(id).token_len(), id)
        })
        .collect()
}

#[test]
fn test_longer_span_beats_priority() {
    let dict = city_dictionary();
    let doc = tokens("I visited New York City");
    let candidates = Matcher::new(&dict).find_matches(&doc);
    let resolved = ConflictResolver::default().resolve(candidates, &dict);

    assert_eq!(resolved.len(), 1);
    assert_eq!((resolved[0].start, resolved[0].end), (2, 4));
    let tags = LabelEncoder::new(LabelScheme::Bio2)
        .encode_candidates(doc.len(), &resolved, &dict)
        .unwrap();
    assert_eq!(tags, vec!["O", "O", "B-LOC", "I-LOC", "O"]);
}

#[test]
fn test_priority_decides_between_equal_lengths() {
    let dict = EntityDictionary::build(
        vec![entry("New York", "Q60", 0), entry("visited New", "Q99", 1)],
        vec![
            profile(0, "en-LOC-P31-1", "LOC", 0),
            profile(1, "en-ORG-P31-1", "ORG", 10),
        ],
    )
    .unwrap();
    let doc = tokens("I visited New York City");
    let candidates = Matcher::new(&dict).find_matches(&doc);
    assert_eq!(candidates.len(), 2);

    let resolved = ConflictResolver::default().resolve(candidates, &dict);
    let tags = LabelEncoder::new(LabelScheme::Bio2)
        .encode_candidates(doc.len(), &resolved, &dict)
        .unwrap();
    assert_eq!(tags, vec!["O", "B-ORG", "I-ORG", "O", "O"]);
}

#[test]
fn test_priority_first_criteria() {
    let dict = city_dictionary();
    let doc = tokens("New York");
    let candidates = Matcher::new(&dict).find_matches(&doc);
    let resolver = ConflictResolver::new().with_criteria(vec![
        SelectionCriterion::HighestPriority,
        SelectionCriterion::LongestSpan,
    ]);

    let resolved = resolver.resolve(candidates, &dict);
    assert_eq!(resolved.len(), 1);
    assert_eq!(dict.label_of(resolved[0].entry), "ORG");
}

proptest! {
    #[test]
    fn prop_resolved_is_sorted_disjoint_subset(raw in arb_candidates(6)) {
        let dict = mixed_dictionary();
        let candidates = spans(&dict, &raw);
        let resolved = ConflictResolver::default().resolve(candidates.clone(), &dict);

        for span in &resolved {
            prop_assert!(candidates.contains(span));
        }
        for pair in resolved.windows(2) {
            prop_assert!(pair[0].start <= pair[1].start);
            prop_assert!(pair[0].end <= pair[1].start);
        }
        prop_assert_eq!(resolved.is_empty(), candidates.is_empty());
    }

    #[test]
    fn prop_one_survivor_per_overlap_component(raw in arb_candidates(6)) {
        let dict = mixed_dictionary();
        let candidates = spans(&dict, &raw);
        let resolved = ConflictResolver::default().resolve(candidates.clone(), &dict);

        let mut component: Vec<usize> = (0..candidates.len()).collect();
        for i in 0..candidates.len() {
            for j in 0..i {
                if candidates[i].overlaps(&candidates[j]) {
                    let (from, to) = (component[i], component[j]);
                    for c in component.iter_mut().filter(|c| **c == from) {
                        *c = to;
                    }
                }
            }
        }
        component.sort_unstable();
        component.dedup();
        prop_assert_eq!(resolved.len(), component.len());
    }

    #[test]
    fn prop_resolution_is_idempotent(raw in arb_candidates(6)) {
        let dict = mixed_dictionary();
        let resolver = ConflictResolver::default();
        let once = resolver.resolve(spans(&dict, &raw), &dict);
        let twice = resolver.resolve(once.clone(), &dict);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_survivor_is_longest_of_its_group(raw in arb_candidates(6)) {
        let dict = mixed_dictionary();
        let candidates = spans(&dict, &raw);
        let resolved = ConflictResolver::default().resolve(candidates.clone(), &dict);

        for survivor in &resolved {
            for candidate in candidates.iter().filter(|c| c.overlaps(survivor)) {
                prop_assert!(candidate.len() <= survivor.len());
            }
        }
    }
}
