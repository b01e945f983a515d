//! Common test utilities

#![allow(dead_code)]

use distner_core::{
    DictionaryEntry, EntityDictionary, EntityId, MatchCasing, RuleProfile, RuleSet, RuleSetKey,
};

/// Split on whitespace
pub fn tokens(text: &str) -> Vec<String> {
    text.split_whitespace().map(str::to_string).collect()
}

/// Owned tags
pub fn tags(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Dictionary entry of rule set `key`, tokenized on whitespace
pub fn entry(name: &str, entity: &str, key: usize) -> DictionaryEntry {
    DictionaryEntry {
        entity: EntityId::new(entity),
        name: name.to_string(),
        tokens: tokens(name),
        rule_set: RuleSetKey(key),
        is_alias: false,
    }
}

/// Profile of rule set `key` with exact matching
pub fn profile(key: usize, identifier: &str, label: &str, priority: i32) -> RuleProfile {
    RuleProfile {
        key: RuleSetKey(key),
        identifier: identifier.to_string(),
        label: label.to_string(),
        priority,
        match_casing: MatchCasing::Exact,
    }
}

/// `New York` and `York` as LOC (priority 0), `York` as ORG (priority 5)
pub fn city_dictionary() -> EntityDictionary {
    EntityDictionary::build(
        vec![
            entry("New York", "Q60", 0),
            entry("York", "Q42462", 0),
            entry("York", "Q1234", 1),
        ],
        vec![
            profile(0, "en-LOC-P31-1", "LOC", 0),
            profile(1, "en-ORG-P31-1", "ORG", 5),
        ],
    )
    .unwrap()
}

/// Knowledge-base style rule set with two cities
pub fn city_rule_set() -> RuleSet {
    let mut rule_set = RuleSet::new("en", "LOC", "P31");
    rule_set.add_entity_name("Q60".into(), "New York", false);
    rule_set.add_entity_name("Q42462".into(), "York", false);
    rule_set.add_entity_name("Q60".into(), "NYC", true);
    rule_set
}
