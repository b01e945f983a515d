//! Rule sets: configurable sources of entity names mapped to one label

use crate::dictionary::entity::{EntityId, EntityNameEntry};
use crate::dictionary::index::DictionaryEntry;
use crate::error::{Error, Result};
use crate::matching::casing::{FuzzyThresholds, MatchCasing};
use crate::traits::tokenizer::Tokenizer;
use chrono::{DateTime, Utc};
use distner_utils::text::{char_len, normalize_whitespace, remove_diacritics};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Source property of manually entered name lists
pub const MANUAL_ENTRY_SOURCE: &str = "manual_entry";

/// Source property of stopword lists
pub const STOPWORDS_SOURCE: &str = "stopwords";

/// Default priority of stopword lists
pub const STOPWORDS_PRIORITY: i32 = 10;

/// Stable handle of a rule set inside a [`crate::Session`]
///
/// Dictionary entries refer back to their rule set through this key; it stays
/// valid when the rule set's identifier is re-derived.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleSetKey(pub usize);

impl fmt::Display for RuleSetKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Matching configuration of a rule set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleSetConfig {
    /// Inactive rule sets contribute no entries
    pub active: bool,

    /// Include aliases in addition to primary names
    pub use_aliases: bool,

    /// Additionally match every token of multi-token names on its own
    pub split_tokens: bool,

    /// Strip diacritics from name tokens
    pub remove_diacritics: bool,

    /// Minimum character length of a name, -1 disables the filter
    pub minimum_length: i32,

    /// Per-token comparison policy
    pub match_casing: MatchCasing,

    /// Tie-break weight for conflicts between equally long matches
    pub priority: i32,

    /// Token sequences that are never matched
    pub filter_list: Vec<Vec<String>>,
}

impl Default for RuleSetConfig {
    fn default() -> Self {
        Self {
            active: true,
            use_aliases: false,
            split_tokens: false,
            remove_diacritics: false,
            minimum_length: -1,
            match_casing: MatchCasing::Exact,
            priority: 0,
            filter_list: Vec::new(),
        }
    }
}

impl RuleSetConfig {
    /// Create default config
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable/disable the rule set
    pub fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Enable/disable aliases
    pub fn with_aliases(mut self, use_aliases: bool) -> Self {
        self.use_aliases = use_aliases;
        self
    }

    /// Enable/disable token splitting
    pub fn with_split_tokens(mut self, split_tokens: bool) -> Self {
        self.split_tokens = split_tokens;
        self
    }

    /// Enable/disable diacritics removal
    pub fn with_remove_diacritics(mut self, remove: bool) -> Self {
        self.remove_diacritics = remove;
        self
    }

    /// Set minimum name length (-1 disables)
    pub fn with_minimum_length(mut self, minimum_length: i32) -> Self {
        self.minimum_length = minimum_length;
        self
    }

    /// Set casing policy
    pub fn with_match_casing(mut self, match_casing: MatchCasing) -> Self {
        self.match_casing = match_casing;
        self
    }

    /// Set priority
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the filter list
    pub fn with_filter_list(mut self, filter_list: Vec<Vec<String>>) -> Self {
        self.filter_list = filter_list;
        self
    }

    fn affects_tokenization(&self, other: &RuleSetConfig) -> bool {
        self.remove_diacritics != other.remove_diacritics
    }
}

/// A named, configurable source of entity names mapped to one label
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    identifier: String,
    #[serde(default)]
    name: String,
    language_code: String,
    label: String,
    source: String,
    #[serde(default)]
    config: RuleSetConfig,
    #[serde(default)]
    names: Vec<EntityNameEntry>,
    #[serde(default)]
    aliases: Vec<EntityNameEntry>,
    #[serde(default)]
    extracted_at: Option<DateTime<Utc>>,
    #[serde(skip, default = "stale")]
    tokenization_stale: bool,
}

fn stale() -> bool {
    true
}

/// Derive a rule set identifier.
///
/// Stopword lists carry no label in their identifier:
/// `{language}-stopwords-{n}`; all others are `{language}-{label}-{source}-{n}`.
pub fn derive_identifier(language_code: &str, label: &str, source: &str, sequence: usize) -> String {
    if source == STOPWORDS_SOURCE {
        format!("{language_code}-{source}-{sequence}")
    } else {
        format!("{language_code}-{label}-{source}-{sequence}")
    }
}

impl RuleSet {
    /// Create an empty, unregistered rule set.
    ///
    /// The identifier is assigned when the rule set is added to a session.
    pub fn new(
        language_code: impl Into<String>,
        label: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            identifier: String::new(),
            name: String::new(),
            language_code: language_code.into(),
            label: label.into(),
            source: source.into(),
            config: RuleSetConfig::default(),
            names: Vec::new(),
            aliases: Vec::new(),
            extracted_at: None,
            tokenization_stale: true,
        }
    }

    /// Rule set built from a manually entered list, one name per line
    pub fn manual_list(
        language_code: impl Into<String>,
        label: impl Into<String>,
        list: &str,
    ) -> Self {
        let mut rule_set = Self::new(language_code, label, MANUAL_ENTRY_SOURCE);
        rule_set.add_lines(EntityId::new("Manual Entry"), list);
        rule_set.extracted_at = Some(Utc::now());
        rule_set
    }

    /// Stopword list: label `O` and a high priority so that stopwords win
    /// conflicts against equally long entity names
    pub fn stopwords(language_code: impl Into<String>, list: &str) -> Self {
        let mut rule_set = Self::new(language_code, "O", STOPWORDS_SOURCE);
        rule_set.config.priority = STOPWORDS_PRIORITY;
        rule_set.add_lines(EntityId::new("Stopwords"), list);
        rule_set.extracted_at = Some(Utc::now());
        rule_set
    }

    fn add_lines(&mut self, entity: EntityId, list: &str) {
        for line in list.lines() {
            let name = normalize_whitespace(line);
            if !name.is_empty() {
                self.add_entity_name(entity.clone(), name, false);
            }
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the configuration
    pub fn with_config(mut self, config: RuleSetConfig) -> Self {
        self.set_config(config);
        self
    }

    /// Identifier, empty until registered in a session
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub(crate) fn set_identifier(&mut self, identifier: String) {
        self.identifier = identifier;
    }

    /// Display name, falling back to the identifier
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.identifier
        } else {
            &self.name
        }
    }

    /// Set the display name
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Language code of the names
    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    /// Target label
    pub fn label(&self) -> &str {
        &self.label
    }

    pub(crate) fn set_label(&mut self, label: String) {
        self.label = label;
    }

    /// Knowledge-base property (or list kind) the names were drawn from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Matching configuration
    pub fn config(&self) -> &RuleSetConfig {
        &self.config
    }

    /// Replace the configuration. Names are re-tokenized on next use when the
    /// change affects tokenization.
    pub fn set_config(&mut self, config: RuleSetConfig) {
        if self.config.affects_tokenization(&config) {
            self.tokenization_stale = true;
        }
        self.config = config;
    }

    /// Modify the configuration in place
    pub fn update_config(&mut self, update: impl FnOnce(&mut RuleSetConfig)) {
        let mut config = self.config.clone();
        update(&mut config);
        self.set_config(config);
    }

    /// Whether the rule set takes part in matching
    pub fn is_active(&self) -> bool {
        self.config.active
    }

    /// Add a name or alias
    pub fn add_entity_name(&mut self, entity: EntityId, name: impl Into<String>, is_alias: bool) {
        let entry = EntityNameEntry::new(entity, name, is_alias);
        if is_alias {
            self.aliases.push(entry);
        } else {
            self.names.push(entry);
        }
        self.tokenization_stale = true;
    }

    /// Primary names
    pub fn names(&self) -> &[EntityNameEntry] {
        &self.names
    }

    /// Aliases
    pub fn aliases(&self) -> &[EntityNameEntry] {
        &self.aliases
    }

    /// Number of extracted entities (primary names only)
    pub fn num_extracts(&self) -> usize {
        self.names.len()
    }

    /// When the knowledge-base extraction completed
    pub fn extracted_at(&self) -> Option<DateTime<Utc>> {
        self.extracted_at
    }

    /// Record a completed knowledge-base extraction
    pub fn mark_extracted(&mut self, at: DateTime<Utc>) {
        self.extracted_at = Some(at);
    }

    /// Drop all names and aliases
    pub(crate) fn clear_entries(&mut self) {
        self.names.clear();
        self.aliases.clear();
        self.tokenization_stale = true;
    }

    pub(crate) fn take_entries(&mut self, other: RuleSet) {
        self.names = other.names;
        self.aliases = other.aliases;
        self.tokenization_stale = true;
    }

    /// Force re-tokenization on next use, e.g. after the tokenizer changed
    pub fn invalidate_tokens(&mut self) {
        self.tokenization_stale = true;
    }

    /// Whether names need to be tokenized before matching
    pub fn needs_tokenization(&self) -> bool {
        self.tokenization_stale
    }

    /// Tokenize all names and aliases if the configuration changed since the
    /// last call
    pub fn prepare(&mut self, tokenizer: &dyn Tokenizer) -> Result<()> {
        if !self.tokenization_stale {
            return Ok(());
        }

        let remove = self.config.remove_diacritics;
        for entry in self.names.iter_mut().chain(self.aliases.iter_mut()) {
            let mut tokens = tokenizer.tokenize(&entry.name)?;
            if remove {
                tokens = tokens.iter().map(|t| remove_diacritics(t)).collect();
            }
            entry.set_tokens(tokens);
        }

        tracing::debug!(
            rule_set = %self.identifier,
            names = self.names.len(),
            aliases = self.aliases.len(),
            tokenizer = tokenizer.name(),
            "Tokenized entity names"
        );
        self.tokenization_stale = false;
        Ok(())
    }

    /// Entries used for matching. Empty for inactive rule sets.
    ///
    /// Fails with [`Error::Invariant`] when names have not been tokenized.
    pub fn entries_for_matching(
        &self,
        key: RuleSetKey,
        thresholds: &FuzzyThresholds,
    ) -> Result<Vec<DictionaryEntry>> {
        if !self.config.active {
            return Ok(Vec::new());
        }
        self.collect_entries(key, thresholds, None)
    }

    /// The first `limit` entries as they would be matched, regardless of
    /// whether the rule set is active
    pub fn preview(
        &mut self,
        key: RuleSetKey,
        tokenizer: &dyn Tokenizer,
        thresholds: &FuzzyThresholds,
        limit: usize,
    ) -> Result<Vec<DictionaryEntry>> {
        self.prepare(tokenizer)?;
        self.collect_entries(key, thresholds, Some(limit))
    }

    fn collect_entries(
        &self,
        key: RuleSetKey,
        thresholds: &FuzzyThresholds,
        limit: Option<usize>,
    ) -> Result<Vec<DictionaryEntry>> {
        if self.tokenization_stale {
            return Err(Error::Invariant(format!(
                "entity names of rule set '{}' have not been tokenized",
                self.identifier
            )));
        }

        let selected: Vec<&EntityNameEntry> = if self.config.use_aliases {
            self.names.iter().chain(self.aliases.iter()).collect()
        } else {
            self.names.iter().collect()
        };
        let selected = match limit {
            Some(limit) => &selected[..limit.min(selected.len())],
            None => &selected[..],
        };

        let mut entries = Vec::with_capacity(selected.len());
        let mut skipped = 0usize;
        for entry in selected {
            let tokens = entry.tokens().ok_or_else(|| {
                Error::Invariant(format!("tokenized name of '{}' is not set", entry.name))
            })?;
            if tokens.is_empty() {
                skipped += 1;
                continue;
            }
            entries.push(DictionaryEntry {
                entity: entry.entity.clone(),
                name: entry.name.clone(),
                tokens: tokens.to_vec(),
                rule_set: key,
                is_alias: entry.is_alias,
            });
        }
        if skipped > 0 {
            tracing::debug!(rule_set = %self.identifier, skipped, "Skipped names without tokens");
        }

        if self.config.split_tokens {
            let split: Vec<DictionaryEntry> = entries
                .iter()
                .filter(|entry| entry.tokens.len() > 1)
                .flat_map(|entry| {
                    entry.tokens.iter().map(move |token| DictionaryEntry {
                        entity: entry.entity.clone(),
                        name: token.clone(),
                        tokens: vec![token.clone()],
                        rule_set: key,
                        is_alias: entry.is_alias,
                    })
                })
                .collect();
            entries.extend(split);
        }

        if self.config.minimum_length >= 0 {
            let minimum = self.config.minimum_length as usize;
            entries.retain(|entry| char_len(&entry.name) >= minimum);
        }

        if !self.config.filter_list.is_empty() {
            let casing = self.config.match_casing;
            entries.retain(|entry| {
                !self
                    .config
                    .filter_list
                    .iter()
                    .any(|filtered| casing.sequence_matches(&entry.tokens, filtered, thresholds))
            });
        }

        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::tokenizer::WhitespaceTokenizer;

    fn city_rule_set() -> RuleSet {
        let mut rs = RuleSet::new("en", "LOC", "Q515");
        rs.add_entity_name("Q60".into(), "New York City", false);
        rs.add_entity_name("Q60".into(), "NYC", true);
        rs.add_entity_name("Q72".into(), "Zürich", false);
        rs.add_entity_name("Q90".into(), "Paris", false);
        rs
    }

    fn names(entries: &[DictionaryEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn test_derive_identifier() {
        assert_eq!(derive_identifier("en", "LOC", "Q515", 1), "en-LOC-Q515-1");
        assert_eq!(derive_identifier("de", "O", STOPWORDS_SOURCE, 2), "de-stopwords-2");
    }

    #[test]
    fn test_default_config() {
        let config = RuleSetConfig::default();
        assert!(config.active);
        assert!(!config.use_aliases);
        assert_eq!(config.minimum_length, -1);
        assert_eq!(config.match_casing, MatchCasing::Exact);
        assert_eq!(config.priority, 0);
    }

    #[test]
    fn test_entries_require_tokenization() {
        let rs = city_rule_set();
        let result = rs.entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default());
        assert!(matches!(result, Err(Error::Invariant(_))));
    }

    #[test]
    fn test_entries_without_aliases() {
        let mut rs = city_rule_set();
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let entries = rs
            .entries_for_matching(RuleSetKey(3), &FuzzyThresholds::default())
            .unwrap();
        assert_eq!(names(&entries), vec!["New York City", "Zürich", "Paris"]);
        assert_eq!(entries[0].tokens, vec!["New", "York", "City"]);
        assert!(entries.iter().all(|e| e.rule_set == RuleSetKey(3)));
    }

    #[test]
    fn test_entries_with_aliases() {
        let mut rs = city_rule_set().with_config(RuleSetConfig::new().with_aliases(true));
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let entries = rs
            .entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default())
            .unwrap();
        assert_eq!(entries.len(), 4);
        assert!(entries[3].is_alias);
    }

    #[test]
    fn test_inactive_rule_set_has_no_entries() {
        let mut rs = city_rule_set().with_config(RuleSetConfig::new().with_active(false));
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let entries = rs
            .entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default())
            .unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn test_preview_ignores_active_flag() {
        let mut rs = city_rule_set().with_config(RuleSetConfig::new().with_active(false));
        let entries = rs
            .preview(RuleSetKey(0), &WhitespaceTokenizer, &FuzzyThresholds::default(), 2)
            .unwrap();
        assert_eq!(names(&entries), vec!["New York City", "Zürich"]);
    }

    #[test]
    fn test_split_tokens() {
        let mut rs = city_rule_set().with_config(RuleSetConfig::new().with_split_tokens(true));
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let entries = rs
            .entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default())
            .unwrap();
        assert_eq!(
            names(&entries),
            vec!["New York City", "Zürich", "Paris", "New", "York", "City"]
        );
        assert_eq!(entries[4].tokens, vec!["York"]);
    }

    #[test]
    fn test_remove_diacritics_retokenizes() {
        let mut rs = city_rule_set();
        rs.prepare(&WhitespaceTokenizer).unwrap();
        assert!(!rs.needs_tokenization());

        rs.update_config(|c| c.remove_diacritics = true);
        assert!(rs.needs_tokenization());
        rs.prepare(&WhitespaceTokenizer).unwrap();

        let entries = rs
            .entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default())
            .unwrap();
        assert_eq!(entries[1].name, "Zürich");
        assert_eq!(entries[1].tokens, vec!["Zurich"]);
    }

    #[test]
    fn test_priority_change_keeps_tokenization() {
        let mut rs = city_rule_set();
        rs.prepare(&WhitespaceTokenizer).unwrap();
        rs.update_config(|c| c.priority = 5);
        assert!(!rs.needs_tokenization());
    }

    #[test]
    fn test_minimum_length() {
        let mut rs = city_rule_set().with_config(RuleSetConfig::new().with_minimum_length(6));
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let entries = rs
            .entries_for_matching(RuleSetKey(0), &FuzzyThresholds::default())
            .unwrap();
        assert_eq!(names(&entries), vec!["New York City", "Zürich"]);
    }

    #[test]
    fn test_filter_list_uses_casing_policy() {
        let filter = vec![vec!["paris".to_string()]];
        let mut rs = city_rule_set().with_config(
            RuleSetConfig::new()
                .with_filter_list(filter.clone())
                .with_match_casing(MatchCasing::Exact),
        );
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let th = FuzzyThresholds::default();
        assert_eq!(rs.entries_for_matching(RuleSetKey(0), &th).unwrap().len(), 3);

        rs.update_config(|c| c.match_casing = MatchCasing::IgnoreAll);
        let entries = rs.entries_for_matching(RuleSetKey(0), &th).unwrap();
        assert_eq!(names(&entries), vec!["New York City", "Zürich"]);
    }

    #[test]
    fn test_manual_list_and_stopwords() {
        let manual = RuleSet::manual_list("en", "ORG", "ACME \t Corp\n\n  Initech  \n");
        assert_eq!(manual.source(), MANUAL_ENTRY_SOURCE);
        assert_eq!(manual.num_extracts(), 2);
        assert_eq!(manual.names()[0].name, "ACME Corp");
        assert_eq!(manual.names()[1].name, "Initech");
        assert!(manual.extracted_at().is_some());

        let stop = RuleSet::stopwords("en", "the\nof");
        assert_eq!(stop.label(), "O");
        assert_eq!(stop.config().priority, STOPWORDS_PRIORITY);
        assert_eq!(stop.names()[0].entity.as_str(), "Stopwords");
    }

    #[test]
    fn test_display_name_falls_back_to_identifier() {
        let mut rs = RuleSet::new("en", "PER", "Q5");
        rs.set_identifier("en-PER-Q5-1".to_string());
        assert_eq!(rs.display_name(), "en-PER-Q5-1");
        rs.set_name("human");
        assert_eq!(rs.display_name(), "human");
    }

    #[test]
    fn test_serde_roundtrip_marks_stale() {
        let mut rs = city_rule_set().with_name("cities");
        rs.prepare(&WhitespaceTokenizer).unwrap();
        let json = serde_json::to_string(&rs).unwrap();
        let restored: RuleSet = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.display_name(), "cities");
        assert_eq!(restored.names().len(), 3);
        assert!(restored.needs_tokenization());
    }
}
