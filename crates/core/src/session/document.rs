//! Documents to label or evaluate

use crate::dictionary::index::EntityDictionary;
use crate::error::{Error, Result};
use crate::labeling::conll::{ConllParser, RawFormat};
use crate::pipeline::{Annotation, MatchView, TokenMatchView};
use crate::traits::tokenizer::Tokenizer;
use distner_utils::text::remove_diacritics;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Role of a document in a session
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Text to label, no gold labels needed
    UnlabeledInput,

    /// Gold-labeled text for tuning rule sets
    Development,

    /// Gold-labeled text for the final evaluation
    Test,
}

impl DocumentKind {
    /// All kinds
    pub const ALL: [DocumentKind; 3] = [Self::UnlabeledInput, Self::Development, Self::Test];

    /// Whether documents of this kind must carry gold labels
    pub fn requires_gold(self) -> bool {
        !matches!(self, Self::UnlabeledInput)
    }

    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UnlabeledInput => "unlabeled_input",
            Self::Development => "development",
            Self::Test => "test",
        }
    }
}

impl fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| Error::Configuration(format!("unknown document kind '{s}'")))
    }
}

/// How raw text is turned into tokens
#[derive(Clone, Copy, Debug, Default)]
pub struct DocumentOptions {
    /// Strip diacritics from every token
    pub remove_diacritics: bool,

    /// Replace tokens by their lemmas
    pub lemmatize: bool,
}

/// An annotation with the dictionary its spans point into
#[derive(Clone, Debug)]
struct Labeled {
    annotation: Annotation,
    dictionary: Arc<EntityDictionary>,
}

/// A tokenized document with optional gold labels and its latest annotation
#[derive(Clone, Debug)]
pub struct Document {
    kind: DocumentKind,
    raw_text: String,
    raw_format: RawFormat,
    tokens: Vec<String>,
    gold: Option<Vec<String>>,
    labeled: Option<Labeled>,
}

impl Document {
    /// Create a document from already tokenized text
    pub fn from_tokens(
        kind: DocumentKind,
        tokens: Vec<String>,
        gold: Option<Vec<String>>,
    ) -> Result<Self> {
        let document = Self {
            kind,
            raw_text: tokens.join(" "),
            raw_format: RawFormat::SimpleText,
            tokens,
            gold,
            labeled: None,
        };
        document.validate()?;
        Ok(document)
    }

    /// Parse raw text. Plain text is tokenized with `tokenizer`; CoNLL input
    /// carries its own tokens and, in the last column, gold labels.
    pub fn parse(
        kind: DocumentKind,
        raw_text: impl Into<String>,
        raw_format: RawFormat,
        tokenizer: &dyn Tokenizer,
        options: DocumentOptions,
    ) -> Result<Self> {
        let raw_text = raw_text.into();
        let (mut tokens, gold) = match raw_format {
            RawFormat::SimpleText => (tokenizer.tokenize(&raw_text)?, None),
            format => {
                let parsed = ConllParser::new(format)?.parse(&raw_text)?;
                (parsed.tokens, parsed.gold)
            }
        };

        if options.lemmatize {
            tokens = tokenizer.lemmatize(&tokens)?;
        }
        if options.remove_diacritics {
            tokens = tokens.iter().map(|t| remove_diacritics(t)).collect();
        }

        let document = Self {
            kind,
            raw_text,
            raw_format,
            tokens,
            gold,
            labeled: None,
        };
        document.validate()?;

        tracing::debug!(
            kind = %kind,
            format = %raw_format,
            tokens = document.tokens.len(),
            gold = document.gold.is_some(),
            "Parsed document"
        );
        Ok(document)
    }

    fn validate(&self) -> Result<()> {
        match &self.gold {
            None if self.kind.requires_gold() => Err(Error::Validation(format!(
                "a {} document needs gold labels",
                self.kind
            ))),
            Some(gold) if gold.len() != self.tokens.len() => Err(Error::Validation(format!(
                "{} gold labels for {} tokens",
                gold.len(),
                self.tokens.len()
            ))),
            _ => Ok(()),
        }
    }

    /// Role of the document
    pub fn kind(&self) -> DocumentKind {
        self.kind
    }

    /// Text as provided
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Format of the raw text
    pub fn raw_format(&self) -> RawFormat {
        self.raw_format
    }

    /// Tokens
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Gold labels, if any
    pub fn gold(&self) -> Option<&[String]> {
        self.gold.as_deref()
    }

    /// Latest annotation, if the document has been labeled
    pub fn annotation(&self) -> Option<&Annotation> {
        self.labeled.as_ref().map(|l| &l.annotation)
    }

    /// Dictionary the latest annotation was produced with
    pub fn dictionary(&self) -> Option<&EntityDictionary> {
        self.labeled.as_ref().map(|l| l.dictionary.as_ref())
    }

    /// Predicted tags of the latest annotation
    pub fn predicted(&self) -> Option<&[String]> {
        self.annotation().map(|a| a.tags.as_slice())
    }

    /// Resolved spans of the latest annotation
    pub fn resolved_views(&self) -> Option<Vec<MatchView>> {
        self.labeled
            .as_ref()
            .map(|l| l.annotation.resolved_views(&l.dictionary))
    }

    /// All candidate spans of the latest annotation
    pub fn candidate_views(&self) -> Option<Vec<MatchView>> {
        self.labeled
            .as_ref()
            .map(|l| l.annotation.candidate_views(&l.dictionary))
    }

    /// Chosen and alternative matches of every token
    pub fn token_matches(&self) -> Option<Vec<TokenMatchView>> {
        self.labeled
            .as_ref()
            .map(|l| l.annotation.token_matches(&self.tokens, &l.dictionary))
    }

    pub(crate) fn set_annotation(
        &mut self,
        annotation: Annotation,
        dictionary: Arc<EntityDictionary>,
    ) {
        self.labeled = Some(Labeled {
            annotation,
            dictionary,
        });
    }

    /// Drop the latest annotation. Returns whether there was one.
    pub fn clear_annotation(&mut self) -> bool {
        self.labeled.take().is_some()
    }

    fn editable_tags(&mut self, index: usize) -> Result<(&[String], &mut Vec<String>)> {
        let kind = self.kind;
        let labeled = self.labeled.as_mut().ok_or_else(|| {
            Error::Validation(format!("the {kind} document has not been annotated yet"))
        })?;
        let tags = &mut labeled.annotation.tags;
        if index >= tags.len() || index >= self.tokens.len() {
            return Err(Error::Validation(format!(
                "token index {index} is out of range for {} tokens",
                self.tokens.len()
            )));
        }
        Ok((&self.tokens, tags))
    }

    /// Manually set the predicted tag of one token
    pub fn set_predicted_label(&mut self, index: usize, label: impl Into<String>) -> Result<()> {
        let (_, tags) = self.editable_tags(index)?;
        tags[index] = label.into();
        Ok(())
    }

    /// Give every token equal to the token at `index` and predicted with the
    /// same tag the new tag. Returns the number of changed tokens.
    pub fn relabel_token_occurrences(
        &mut self,
        index: usize,
        label: impl Into<String>,
    ) -> Result<usize> {
        let label = label.into();
        let (tokens, tags) = self.editable_tags(index)?;
        let token = &tokens[index];
        let current = tags[index].clone();

        let mut changed = 0;
        for (tag, other) in tags.iter_mut().zip(tokens) {
            if other == token && *tag == current {
                *tag = label.clone();
                changed += 1;
            }
        }
        Ok(changed)
    }
}
