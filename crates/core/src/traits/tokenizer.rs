//! Tokenizer trait

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Tokenizer trait
///
/// Tokenizers and lemmatizers are external collaborators. This trait is the
/// seam through which documents and entity names are turned into token
/// sequences.
pub trait Tokenizer: Send + Sync {
    /// Split text into tokens
    fn tokenize(&self, text: &str) -> Result<Vec<String>>;

    /// Lemmatize an already tokenized sequence, one lemma per token
    fn lemmatize(&self, _tokens: &[String]) -> Result<Vec<String>> {
        Err(Error::Tokenization(format!(
            "{} does not support lemmatization",
            self.name()
        )))
    }

    /// Whether [`Tokenizer::lemmatize`] is implemented
    fn supports_lemmatization(&self) -> bool {
        false
    }

    /// Short human-readable tokenizer name
    fn name(&self) -> &str;

    /// Tokenize a batch of texts
    fn tokenize_batch(&self, texts: &[&str]) -> Result<Vec<Vec<String>>> {
        texts.iter().map(|text| self.tokenize(text)).collect()
    }
}

/// Splits on Unicode whitespace
#[derive(Debug, Clone, Copy, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        Ok(text.split_whitespace().map(str::to_string).collect())
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

/// Splits on whitespace and additionally emits every punctuation character
/// as a token of its own ("York." becomes "York", ".")
#[derive(Debug, Clone, Copy, Default)]
pub struct PunctuationTokenizer;

impl Tokenizer for PunctuationTokenizer {
    fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let mut tokens = Vec::new();
        for word in text.split_whitespace() {
            let mut current = String::new();
            for c in word.chars() {
                if c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace()) {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                    tokens.push(c.to_string());
                } else {
                    current.push(c);
                }
            }
            if !current.is_empty() {
                tokens.push(current);
            }
        }
        Ok(tokens)
    }

    fn name(&self) -> &str {
        "punctuation"
    }
}

/// Built-in tokenizer selection, as stored in settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// [`WhitespaceTokenizer`]
    #[default]
    Whitespace,

    /// [`PunctuationTokenizer`]
    Punctuation,
}

impl TokenizerKind {
    /// Instantiate the tokenizer
    pub fn build(self) -> Box<dyn Tokenizer> {
        match self {
            Self::Whitespace => Box::new(WhitespaceTokenizer),
            Self::Punctuation => Box::new(PunctuationTokenizer),
        }
    }

    /// Whether the tokenizer can lemmatize documents
    pub fn supports_lemmatization(self) -> bool {
        self.build().supports_lemmatization()
    }
}

impl FromStr for TokenizerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "whitespace" => Ok(Self::Whitespace),
            "punctuation" => Ok(Self::Punctuation),
            other => Err(Error::Configuration(format!(
                "unknown tokenizer '{other}', expected 'whitespace' or 'punctuation'"
            ))),
        }
    }
}
