//! Session settings

use crate::error::{Error, Result};
use crate::labeling::encoder::{LabelScheme, OUTSIDE_LABEL};
use crate::matching::casing::FuzzyThresholds;
use crate::matching::matcher::DEFAULT_PROGRESS_INTERVAL;
use crate::session::store::StoreFormat;
use crate::traits::tokenizer::{Tokenizer, TokenizerKind, WhitespaceTokenizer};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings shared by all documents and rule sets of a session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tokenizer for documents
    pub tokenizer: TokenizerKind,

    /// Tokenize entity names with the document tokenizer instead of
    /// splitting them on whitespace
    pub tokenize_entity_names: bool,

    /// Replace document tokens by their lemmas
    pub lemmatize: bool,

    /// Strip diacritics from document tokens
    pub remove_diacritics: bool,

    /// Scheme of predicted tags
    pub label_scheme: LabelScheme,

    /// Tag of tokens outside any entity
    pub outside_label: String,

    /// Thresholds for fuzzy matching
    pub fuzzy_thresholds: FuzzyThresholds,

    /// Tokens between two progress updates
    pub progress_interval: usize,

    /// Directory of persisted rule sets
    pub store_dir: PathBuf,

    /// File format of persisted rule sets
    pub store_format: StoreFormat,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tokenizer: TokenizerKind::Whitespace,
            tokenize_entity_names: false,
            lemmatize: false,
            remove_diacritics: false,
            label_scheme: LabelScheme::Bio2,
            outside_label: OUTSIDE_LABEL.to_string(),
            fuzzy_thresholds: FuzzyThresholds::default(),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            store_dir: PathBuf::from("rule_sets"),
            store_format: StoreFormat::Json,
        }
    }
}

impl Settings {
    /// Create default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the document tokenizer
    pub fn with_tokenizer(mut self, tokenizer: TokenizerKind) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    /// Use the document tokenizer for entity names
    pub fn with_entity_name_tokenization(mut self, enabled: bool) -> Self {
        self.tokenize_entity_names = enabled;
        self
    }

    /// Enable/disable lemmatization of documents
    pub fn with_lemmatize(mut self, lemmatize: bool) -> Self {
        self.lemmatize = lemmatize;
        self
    }

    /// Enable/disable diacritics removal on documents
    pub fn with_remove_diacritics(mut self, remove: bool) -> Self {
        self.remove_diacritics = remove;
        self
    }

    /// Set the tag scheme
    pub fn with_label_scheme(mut self, scheme: LabelScheme) -> Self {
        self.label_scheme = scheme;
        self
    }

    /// Set the outside tag
    pub fn with_outside_label(mut self, outside: impl Into<String>) -> Self {
        self.outside_label = outside.into();
        self
    }

    /// Set fuzzy thresholds
    pub fn with_fuzzy_thresholds(mut self, thresholds: FuzzyThresholds) -> Self {
        self.fuzzy_thresholds = thresholds;
        self
    }

    /// Set the progress interval
    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    /// Set the rule set store location
    pub fn with_store(mut self, dir: impl Into<PathBuf>, format: StoreFormat) -> Self {
        self.store_dir = dir.into();
        self.store_format = format;
        self
    }

    /// Tokenizer for documents
    pub fn document_tokenizer(&self) -> Box<dyn Tokenizer> {
        self.tokenizer.build()
    }

    /// Tokenizer for entity names
    pub fn entity_name_tokenizer(&self) -> Box<dyn Tokenizer> {
        if self.tokenize_entity_names {
            self.tokenizer.build()
        } else {
            Box::new(WhitespaceTokenizer)
        }
    }

    /// Check for settings that cannot work together
    pub fn validate(&self) -> Result<()> {
        if self.outside_label.is_empty() {
            return Err(Error::Configuration("outside label must not be empty".to_string()));
        }
        if self.lemmatize && !self.tokenizer.supports_lemmatization() {
            return Err(Error::Configuration(format!(
                "lemmatization is not supported by the '{}' tokenizer",
                self.tokenizer.build().name()
            )));
        }
        for (name, value) in [
            ("partial", self.fuzzy_thresholds.partial),
            ("full_lowercase", self.fuzzy_thresholds.full_lowercase),
        ] {
            if value > 100 {
                return Err(Error::Configuration(format!(
                    "fuzzy threshold {name} must be within 0-100, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Load from a JSON file and validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let settings: Settings = serde_json::from_str(&data)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Save to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), data)?;
        Ok(())
    }
}
