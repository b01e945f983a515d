//! Conversion between BIO-2 and IO tags

use crate::error::{Error, Result};
use crate::labeling::encoder::OUTSIDE_LABEL;

/// Converts tags between schemes
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelConverter {
    outside: String,
}

impl Default for LabelConverter {
    fn default() -> Self {
        Self::new(OUTSIDE_LABEL)
    }
}

impl LabelConverter {
    /// Create a converter for the given outside tag
    pub fn new(outside: impl Into<String>) -> Self {
        Self {
            outside: outside.into(),
        }
    }

    /// Convert a single BIO-2 tag to IO. Tags that are neither outside nor
    /// `B-`/`I-` prefixed are a [`Error::Format`] error.
    pub fn bio2_to_io<'a>(&self, tag: &'a str) -> Result<&'a str> {
        if tag == self.outside {
            return Ok(tag);
        }
        tag.strip_prefix("B-")
            .or_else(|| tag.strip_prefix("I-"))
            .ok_or_else(|| Error::Format(format!("label '{tag}' is not in BIO-2 format")))
    }

    /// Convert a BIO-2 sequence to IO
    pub fn sequence_bio2_to_io<S: AsRef<str>>(&self, tags: &[S]) -> Result<Vec<String>> {
        tags.iter()
            .map(|tag| self.bio2_to_io(tag.as_ref()).map(str::to_string))
            .collect()
    }

    /// Convert an IO sequence to BIO-2. A new entity starts wherever the label
    /// changes.
    pub fn sequence_io_to_bio2<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        let mut previous: Option<&str> = None;
        tags.iter()
            .map(|tag| {
                let tag = tag.as_ref();
                if tag == self.outside {
                    previous = None;
                    return tag.to_string();
                }
                let converted = if previous == Some(tag) {
                    format!("I-{tag}")
                } else {
                    format!("B-{tag}")
                };
                previous = Some(tag);
                converted
            })
            .collect()
    }

    /// Normalize a sequence to IO, accepting either scheme
    pub fn normalize_to_io<S: AsRef<str>>(&self, tags: &[S]) -> Vec<String> {
        tags.iter()
            .map(|tag| {
                let tag = tag.as_ref();
                self.bio2_to_io(tag).unwrap_or(tag).to_string()
            })
            .collect()
    }

    /// Outside tag in use
    pub fn outside_label(&self) -> &str {
        &self.outside
    }
}
