//! Entity records and entity names

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a knowledge-base entity (e.g. "Q42")
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create a new entity identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// One textual name or alias of an entity, as owned by a rule set
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityNameEntry {
    /// Entity this name refers to
    pub entity: EntityId,

    /// Name as extracted from the knowledge base
    pub name: String,

    /// Whether this is an alias rather than the primary name
    #[serde(default)]
    pub is_alias: bool,

    /// Tokenized form, filled in by [`crate::RuleSet::prepare`]
    #[serde(skip)]
    tokens: Option<Vec<String>>,
}

impl EntityNameEntry {
    /// Create a new, not yet tokenized entry
    pub fn new(entity: EntityId, name: impl Into<String>, is_alias: bool) -> Self {
        Self {
            entity,
            name: name.into(),
            is_alias,
            tokens: None,
        }
    }

    /// Tokenized form, if the entry has been prepared
    pub fn tokens(&self) -> Option<&[String]> {
        self.tokens.as_deref()
    }

    /// Number of tokens, 0 when not tokenized
    pub fn token_len(&self) -> usize {
        self.tokens.as_ref().map(Vec::len).unwrap_or(0)
    }

    /// Store the tokenized form. Zero-length tokens (after trimming) are dropped.
    pub fn set_tokens(&mut self, tokens: Vec<String>) {
        self.tokens = Some(
            tokens
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        );
    }

    /// Forget the tokenized form
    pub fn clear_tokens(&mut self) {
        self.tokens = None;
    }
}

impl fmt::Display for EntityNameEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityName({}-{})", self.name, self.entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id() {
        let id = EntityId::new("Q42");
        assert_eq!(id.as_str(), "Q42");
        assert_eq!(id.to_string(), "Q42");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"Q42\"");
    }

    #[test]
    fn test_set_tokens_drops_empty_tokens() {
        let mut entry = EntityNameEntry::new("Q60".into(), "New  York", false);
        assert!(entry.tokens().is_none());
        assert_eq!(entry.token_len(), 0);

        entry.set_tokens(vec!["New".into(), "".into(), " ".into(), "York".into()]);
        assert_eq!(entry.tokens().unwrap(), &["New".to_string(), "York".to_string()]);
        assert_eq!(entry.token_len(), 2);

        entry.clear_tokens();
        assert!(entry.tokens().is_none());
    }

    #[test]
    fn test_tokens_are_not_serialized() {
        let mut entry = EntityNameEntry::new("Q60".into(), "New York", true);
        entry.set_tokens(vec!["New".into(), "York".into()]);

        let json = serde_json::to_string(&entry).unwrap();
        let restored: EntityNameEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.name, "New York");
        assert!(restored.is_alias);
        assert!(restored.tokens().is_none());
    }
}
