//! CoNLL-style interchange: one token per line, label columns after it

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Raw document format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawFormat {
    /// Plain text, tokenized by a [`crate::Tokenizer`]
    #[default]
    SimpleText,

    /// One token per line, columns separated by tabs
    ConllTab,

    /// One token per line, columns separated by spaces
    ConllSpace,
}

impl RawFormat {
    /// Column separator, `None` for plain text
    pub fn separator(self) -> Option<char> {
        match self {
            Self::SimpleText => None,
            Self::ConllTab => Some('\t'),
            Self::ConllSpace => Some(' '),
        }
    }

    /// Configuration name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SimpleText => "simple_text",
            Self::ConllTab => "conll_tab",
            Self::ConllSpace => "conll_space",
        }
    }
}

impl fmt::Display for RawFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RawFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "simple_text" => Ok(Self::SimpleText),
            "conll_tab" => Ok(Self::ConllTab),
            "conll_space" => Ok(Self::ConllSpace),
            other => Err(Error::Configuration(format!(
                "unknown raw format '{other}', expected simple_text, conll_tab or conll_space"
            ))),
        }
    }
}

/// Which label columns a CoNLL file carries
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelColumns {
    /// The last column holds gold labels
    #[default]
    Gold,

    /// The last column holds predicted labels
    Predicted,

    /// The second column holds gold labels, the last column predicted labels
    GoldAndPredicted,
}

/// Tokens and labels read from a CoNLL file
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConllDocument {
    /// One entry per token line
    pub tokens: Vec<String>,

    /// Gold labels, if present
    pub gold: Option<Vec<String>>,

    /// Predicted labels, if present
    pub predicted: Option<Vec<String>>,
}

/// Reads CoNLL-style text.
///
/// Lines starting with `-DOCSTART-`, empty lines and `--` marker lines are
/// skipped. The first column is the token, the last column a label.
#[derive(Clone, Copy, Debug)]
pub struct ConllParser {
    format: RawFormat,
    columns: LabelColumns,
}

impl ConllParser {
    /// Create a parser. Plain text is rejected with [`Error::Configuration`].
    pub fn new(format: RawFormat) -> Result<Self> {
        if format.separator().is_none() {
            return Err(Error::Configuration(format!(
                "raw format {format} not supported for CoNLL parsing"
            )));
        }
        Ok(Self {
            format,
            columns: LabelColumns::default(),
        })
    }

    /// Set the meaning of the label columns
    pub fn with_columns(mut self, columns: LabelColumns) -> Self {
        self.columns = columns;
        self
    }

    /// Parse `raw`.
    ///
    /// When any line carries a label, every line must; a count mismatch is a
    /// [`Error::Format`] error.
    pub fn parse(&self, raw: &str) -> Result<ConllDocument> {
        let separator = self.format.separator().unwrap_or('\t');

        let mut tokens = Vec::new();
        let mut first_labels = Vec::new();
        let mut last_labels = Vec::new();

        for (line_no, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line == "--" || line.starts_with("-DOCSTART-") {
                continue;
            }

            let elements: Vec<&str> = line.split(separator).collect();
            tokens.push(elements[0].to_string());

            match elements.len() {
                1 => {}
                2 if self.columns == LabelColumns::GoldAndPredicted => {
                    return Err(Error::Format(format!(
                        "line {}: expected token, gold and predicted columns",
                        line_no + 1
                    )));
                }
                n => {
                    first_labels.push(elements[1].to_string());
                    last_labels.push(elements[n - 1].to_string());
                }
            }
        }

        let mut document = ConllDocument {
            tokens,
            ..Default::default()
        };

        if last_labels.is_empty() {
            return Ok(document);
        }
        if last_labels.len() != document.tokens.len() {
            return Err(Error::Format(format!(
                "number of tokens ({}) != number of labels ({})",
                document.tokens.len(),
                last_labels.len()
            )));
        }

        match self.columns {
            LabelColumns::Gold => document.gold = Some(last_labels),
            LabelColumns::Predicted => document.predicted = Some(last_labels),
            LabelColumns::GoldAndPredicted => {
                document.gold = Some(first_labels);
                document.predicted = Some(last_labels);
            }
        }
        Ok(document)
    }
}

/// Writes tokens with optional gold and predicted label columns
#[derive(Clone, Debug)]
pub struct ConllWriter {
    separator: String,
    newline: String,
}

impl Default for ConllWriter {
    fn default() -> Self {
        Self {
            separator: "\t".to_string(),
            newline: "\n".to_string(),
        }
    }
}

impl ConllWriter {
    /// Create a tab-separated writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column separator
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the line terminator
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Render one line per token. Label columns must match the token count.
    pub fn write<S: AsRef<str>>(
        &self,
        tokens: &[S],
        gold: Option<&[String]>,
        predicted: Option<&[String]>,
    ) -> Result<String> {
        for (name, labels) in [("gold", gold), ("predicted", predicted)] {
            if let Some(labels) = labels {
                if labels.len() != tokens.len() {
                    return Err(Error::Validation(format!(
                        "{} {name} labels for {} tokens",
                        labels.len(),
                        tokens.len()
                    )));
                }
            }
        }

        let mut output = String::new();
        for (i, token) in tokens.iter().enumerate() {
            output.push_str(token.as_ref());
            for labels in [gold, predicted].into_iter().flatten() {
                output.push_str(&self.separator);
                output.push_str(&labels[i]);
            }
            output.push_str(&self.newline);
        }
        Ok(output)
    }
}
